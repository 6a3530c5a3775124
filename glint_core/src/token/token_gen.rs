//! Defines a small DSL-like macro that automates token definition and conversions.
//!
//! `token_gen` generates `Token` enum itself and various conversions.
//! `token_glue_extend` defines token glueing rules.
//!
//! `T` macro is also generated and allows to reference tokens
//! without directly using `Token` enum: `T![,] T![;] T![vec4]`

#[rustfmt::skip]
macro_rules! token_gen {
    {
    $(
        [$token:tt] | $string:literal | $name:ident |
        $(KW $mark:tt)?
        $(BIN[$bin_op:expr])?
        $(ASSIGN[$assign_op:expr])?
        $(TYPE[$basic:expr, $size:expr, $matrix:expr])?
    )+
    } => {
        macro_rules! T {
            $( [$token] => [$crate::token::Token::$name]; )+
        }
        #[derive(Copy, Clone, PartialEq, Eq, Debug)]
        pub enum Token {
            $( $name, )+
        }
        impl Token {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Token::$name => $string, )+
                }
            }
            pub fn as_keyword(ident: &str) -> Option<Token> {
                match ident {
                    $( $string => self::token_gen::token_gen_arms!(@KW_RES $name $(KW $mark)?), )+
                    _ => None,
                }
            }
            pub const fn as_bin_op(self) -> Option<Op> {
                match self {
                    $( Token::$name => self::token_gen::token_gen_arms!(@BIN_RES $(BIN[$bin_op])?), )+
                }
            }
            pub const fn as_assign_op(self) -> Option<Op> {
                match self {
                    $( Token::$name => self::token_gen::token_gen_arms!(@ASSIGN_RES $(ASSIGN[$assign_op])?), )+
                }
            }
            /// `(basic type, size, matrix)` of a type keyword
            pub const fn as_type(self) -> Option<(BasicType, u8, bool)> {
                match self {
                    $( Token::$name => self::token_gen::token_gen_arms!(@TYPE_RES $(TYPE[$basic, $size, $matrix])?), )+
                }
            }
        }
    };
}

#[rustfmt::skip]
macro_rules! token_gen_arms {
    (@KW_RES $name:ident)                 => { None };
    (@BIN_RES)                            => { None };
    (@ASSIGN_RES)                         => { None };
    (@TYPE_RES)                           => { None };
    (@KW_RES $name:ident KW $mark:tt)     => { Some(Token::$name) };
    (@BIN_RES BIN[$bin_op:expr])          => { Some($bin_op) };
    (@ASSIGN_RES ASSIGN[$assign_op:expr]) => { Some($assign_op) };
    (@TYPE_RES TYPE[$basic:expr, $size:expr, $matrix:expr]) => { Some(($basic, $size, $matrix)) };
}

#[rustfmt::skip]
macro_rules! token_from_char {
    {
    $(
        $ch:literal => $to:expr
    )+
    } => {
        impl Token {
            pub const fn from_char(c: char) -> Option<Token> {
                match c {
                    $(
                        $ch => Some($to),
                    )+
                    _ => None,
                }
            }
        }
    };
}

#[rustfmt::skip]
macro_rules! token_glue_extend {
    {
    $name:ident,
    $(
        $( ($from:pat => $to:expr) )+ if $ch:literal
    )+
    } => {
        impl Token {
            pub const fn $name(c: char, token: Token) -> Option<Token> {
                match c {
                    $(
                        $ch => match token {
                            $( $from => Some($to), )+
                            _ => None,
                        },
                    )+
                    _ => None,
                }
            }
        }
    };
}

pub(super) use token_from_char;
pub(super) use token_gen;
pub(super) use token_gen_arms;
pub(super) use token_glue_extend;
