use crate::error::{DiagnosticId, Diagnostics, Severity};
use crate::extension::{ExtensionBehavior, ExtensionTable, Pragma};
use crate::text::SourceLoc;

/// Directive callbacks invoked by the token source
/// at the point a directive line is recognized.
pub trait Directives {
    fn handle_error(&mut self, loc: SourceLoc, msg: &str);
    fn handle_pragma(&mut self, loc: SourceLoc, name: &str, value: &str, stdgl: bool);
    fn handle_extension(&mut self, loc: SourceLoc, name: &str, behavior: &str);
    fn handle_version(&mut self, loc: SourceLoc, version: i32);
}

/// Directive recognized by the lexer, applied once the parser reaches it.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    Error { msg: String },
    Pragma { name: String, value: String, stdgl: bool },
    Extension { name: String, behavior: String },
    Version { number: i32 },
}

impl Directive {
    pub fn dispatch(&self, loc: SourceLoc, handler: &mut impl Directives) {
        match self {
            Directive::Error { msg } => handler.handle_error(loc, msg),
            Directive::Pragma { name, value, stdgl } => {
                handler.handle_pragma(loc, name, value, *stdgl)
            }
            Directive::Extension { name, behavior } => {
                handler.handle_extension(loc, name, behavior)
            }
            Directive::Version { number } => handler.handle_version(loc, *number),
        }
    }
}

const SUPPORTED_VERSION: i32 = 100;
const EXTENSION_ALL: &str = "all";

/// Bridges directives into the extension table, pragma state and diagnostics.
pub struct DirectiveHandler<'d> {
    extensions: &'d mut ExtensionTable,
    pragma: &'d mut Pragma,
    diagnostics: &'d mut Diagnostics,
}

impl<'d> DirectiveHandler<'d> {
    pub fn new(
        extensions: &'d mut ExtensionTable,
        pragma: &'d mut Pragma,
        diagnostics: &'d mut Diagnostics,
    ) -> DirectiveHandler<'d> {
        DirectiveHandler { extensions, pragma, diagnostics }
    }
}

impl<'d> Directives for DirectiveHandler<'d> {
    fn handle_error(&mut self, loc: SourceLoc, msg: &str) {
        self.diagnostics.write_info(Severity::Error, loc, msg.to_string(), "", "");
    }

    fn handle_pragma(&mut self, loc: SourceLoc, name: &str, value: &str, stdgl: bool) {
        // STDGL namespace is reserved for future revisions
        if stdgl || name == "STDGL" {
            return;
        }
        let flag = match name {
            "optimize" => &mut self.pragma.optimize,
            "debug" => &mut self.pragma.debug,
            _ => {
                self.diagnostics.report(DiagnosticId::UnrecognizedPragma, loc, name);
                return;
            }
        };
        match value {
            "on" => *flag = true,
            "off" => *flag = false,
            _ => self.diagnostics.write_info(
                Severity::Error,
                loc,
                "invalid pragma value",
                value,
                "'on' or 'off' expected",
            ),
        }
    }

    fn handle_extension(&mut self, loc: SourceLoc, name: &str, behavior: &str) {
        let behavior_val = ExtensionBehavior::from_directive(behavior);
        if behavior_val == ExtensionBehavior::Undefined {
            self.diagnostics.write_info(Severity::Error, loc, "behavior", name, "invalid");
            return;
        }

        if name == EXTENSION_ALL {
            match behavior_val {
                ExtensionBehavior::Require => self.diagnostics.write_info(
                    Severity::Error,
                    loc,
                    "extension",
                    name,
                    "cannot have 'require' behavior",
                ),
                ExtensionBehavior::Enable => self.diagnostics.write_info(
                    Severity::Error,
                    loc,
                    "extension",
                    name,
                    "cannot have 'enable' behavior",
                ),
                _ => self.extensions.set_all(behavior_val),
            }
            return;
        }

        if self.extensions.set(name, behavior_val) {
            return;
        }
        let severity = match behavior_val {
            ExtensionBehavior::Require => Severity::Error,
            ExtensionBehavior::Enable | ExtensionBehavior::Warn | ExtensionBehavior::Disable => {
                Severity::Warning
            }
            ExtensionBehavior::Undefined => unreachable!(),
        };
        self.diagnostics.write_info(severity, loc, "extension", name, "is not supported");
    }

    fn handle_version(&mut self, loc: SourceLoc, version: i32) {
        if version != SUPPORTED_VERSION {
            let version = version.to_string();
            self.diagnostics.write_info(
                Severity::Error,
                loc,
                "version number",
                &version,
                "not supported",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{EXT_FRAG_DEPTH, EXT_STANDARD_DERIVATIVES};

    struct Fixture {
        extensions: ExtensionTable,
        pragma: Pragma,
        diagnostics: Diagnostics,
    }

    impl Fixture {
        fn new() -> Fixture {
            let mut extensions = ExtensionTable::new();
            extensions.add(EXT_STANDARD_DERIVATIVES, ExtensionBehavior::Undefined);
            extensions.add(EXT_FRAG_DEPTH, ExtensionBehavior::Enable);
            Fixture { extensions, pragma: Pragma::default(), diagnostics: Diagnostics::new() }
        }
        fn handler(&mut self) -> DirectiveHandler<'_> {
            DirectiveHandler::new(&mut self.extensions, &mut self.pragma, &mut self.diagnostics)
        }
    }

    const LOC: SourceLoc = SourceLoc::new(0, 1);

    #[test]
    fn unknown_extension_require_is_error() {
        let mut fx = Fixture::new();
        fx.handler().handle_extension(LOC, "GL_foo_bar", "require");
        assert_eq!(fx.diagnostics.num_errors(), 1);
        assert_eq!(fx.diagnostics.num_warnings(), 0);
        assert!(!fx.extensions.contains("GL_foo_bar"));
        assert_eq!(fx.extensions.len(), 2);
    }

    #[test]
    fn unknown_extension_warn_is_warning() {
        let mut fx = Fixture::new();
        fx.handler().handle_extension(LOC, "GL_foo_bar", "warn");
        assert_eq!(fx.diagnostics.num_errors(), 0);
        assert_eq!(fx.diagnostics.num_warnings(), 1);
        assert!(!fx.extensions.contains("GL_foo_bar"));
    }

    #[test]
    fn known_extension_is_overwritten_silently() {
        let mut fx = Fixture::new();
        for behavior in ["require", "enable", "warn", "disable"] {
            fx.handler().handle_extension(LOC, EXT_STANDARD_DERIVATIVES, behavior);
            let expected = ExtensionBehavior::from_directive(behavior);
            assert_eq!(fx.extensions.get(EXT_STANDARD_DERIVATIVES), Some(expected));
        }
        assert_eq!(fx.diagnostics.num_errors(), 0);
        assert_eq!(fx.diagnostics.num_warnings(), 0);
    }

    #[test]
    fn extension_all() {
        let mut fx = Fixture::new();
        fx.handler().handle_extension(LOC, "all", "disable");
        assert_eq!(fx.diagnostics.num_errors() + fx.diagnostics.num_warnings(), 0);
        assert!(fx.extensions.entries().iter().all(|(_, b)| *b == ExtensionBehavior::Disable));

        let mut fx = Fixture::new();
        fx.handler().handle_extension(LOC, "all", "require");
        assert_eq!(fx.diagnostics.num_errors(), 1);
        assert_eq!(fx.extensions.get(EXT_STANDARD_DERIVATIVES), Some(ExtensionBehavior::Undefined));
        assert_eq!(fx.extensions.get(EXT_FRAG_DEPTH), Some(ExtensionBehavior::Enable));
    }

    #[test]
    fn invalid_behavior() {
        let mut fx = Fixture::new();
        fx.handler().handle_extension(LOC, EXT_STANDARD_DERIVATIVES, "sometimes");
        assert_eq!(fx.diagnostics.num_errors(), 1);
        assert_eq!(fx.extensions.get(EXT_STANDARD_DERIVATIVES), Some(ExtensionBehavior::Undefined));
    }

    #[test]
    fn pragmas() {
        let mut fx = Fixture::new();
        fx.handler().handle_pragma(LOC, "STDGL", "invariant(all)", false);
        fx.handler().handle_pragma(LOC, "anything", "on", true);
        assert_eq!(fx.pragma, Pragma::default());
        assert_eq!(fx.diagnostics.num_errors() + fx.diagnostics.num_warnings(), 0);

        fx.handler().handle_pragma(LOC, "optimize", "off", false);
        fx.handler().handle_pragma(LOC, "optimize", "on", false);
        fx.handler().handle_pragma(LOC, "debug", "on", false);
        assert!(fx.pragma.optimize && fx.pragma.debug);
        assert_eq!(fx.diagnostics.num_errors(), 0);

        fx.handler().handle_pragma(LOC, "optimize", "maybe", false);
        assert_eq!(fx.diagnostics.num_errors(), 1);
        assert!(fx.pragma.optimize);

        fx.handler().handle_pragma(LOC, "unroll", "on", false);
        assert_eq!(fx.diagnostics.num_warnings(), 1);
    }

    #[test]
    fn versions() {
        let mut fx = Fixture::new();
        fx.handler().handle_version(LOC, 100);
        assert_eq!(fx.diagnostics.num_errors(), 0);
        fx.handler().handle_version(LOC, 300);
        assert_eq!(fx.diagnostics.num_errors(), 1);
        assert_eq!(fx.diagnostics.info_log(), "ERROR: 0(1): '300' : version number not supported\n");
    }

    #[test]
    fn error_directive() {
        let mut fx = Fixture::new();
        let directive = Directive::Error { msg: "#error stop".to_string() };
        directive.dispatch(LOC, &mut fx.handler());
        assert_eq!(fx.diagnostics.num_errors(), 1);
    }
}
