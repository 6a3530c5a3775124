/// defines named `ID` newtype
#[macro_export]
macro_rules! id_impl {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
        pub struct $name(u32);

        impl $name {
            #[allow(unused)]
            #[inline(always)]
            pub const fn new(index: usize) -> $name {
                $name(index as u32)
            }
            #[allow(unused)]
            #[inline(always)]
            pub const fn dummy() -> $name {
                $name(u32::MAX)
            }
            #[allow(unused)]
            #[inline(always)]
            pub const fn raw(self) -> u32 {
                self.0
            }
            #[allow(unused)]
            #[inline(always)]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

/// generate enum with `AsStr` trait implementation.
#[macro_export]
macro_rules! enum_as_str {
    (
        $(#[$enum_attr:meta])*
        $vis:vis enum $Enum:ident {
            $(
                $(#[$variant_attr:meta])*
                $variant:ident $string:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_attr])*
        $vis enum $Enum {
            $(
                $(#[$variant_attr])*
                $variant,
            )+
        }

        impl $crate::support::AsStr for $Enum {
            const ALL: &[$Enum] = &[
                $($Enum::$variant,)+
            ];
            fn as_str(self) -> &'static str {
                match self {
                    $($Enum::$variant => $string,)+
                }
            }
            fn from_str(string: &str) -> Option<$Enum> {
                match string {
                    $($string => Some($Enum::$variant),)+
                    _ => None,
                }
            }
        }
    }
}
