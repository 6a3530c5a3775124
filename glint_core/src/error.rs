use crate::text::SourceLoc;
use std::borrow::Cow;

pub struct Error(Diagnostic);
pub struct Warning(Diagnostic);

pub struct Diagnostic {
    pub msg: Cow<'static, str>,
    pub data: DiagnosticData,
}

pub enum DiagnosticData {
    Message,
    Source { loc: SourceLoc, token: String, extra: String },
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn prefix(self) -> &'static str {
        match self {
            Severity::Error => "ERROR: ",
            Severity::Warning => "WARNING: ",
        }
    }
}

impl Error {
    pub fn message(msg: impl Into<Cow<'static, str>>) -> Error {
        Error(Diagnostic::new(msg, DiagnosticData::Message))
    }
    pub fn new(
        loc: SourceLoc,
        msg: impl Into<Cow<'static, str>>,
        token: impl Into<String>,
        extra: impl Into<String>,
    ) -> Error {
        let data = DiagnosticData::Source { loc, token: token.into(), extra: extra.into() };
        Error(Diagnostic::new(msg, data))
    }
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.0
    }
}

impl Warning {
    pub fn new(
        loc: SourceLoc,
        msg: impl Into<Cow<'static, str>>,
        token: impl Into<String>,
        extra: impl Into<String>,
    ) -> Warning {
        let data = DiagnosticData::Source { loc, token: token.into(), extra: extra.into() };
        Warning(Diagnostic::new(msg, data))
    }
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.0
    }
}

impl Diagnostic {
    fn new(msg: impl Into<Cow<'static, str>>, data: DiagnosticData) -> Diagnostic {
        Diagnostic { msg: msg.into(), data }
    }

    pub fn loc(&self) -> Option<SourceLoc> {
        match self.data {
            DiagnosticData::Message => None,
            DiagnosticData::Source { loc, .. } => Some(loc),
        }
    }

    /// renders `<prefix><file>(<line>): '<token>' : <reason> <extra>`
    pub fn render(&self, severity: Severity) -> String {
        match &self.data {
            DiagnosticData::Message => format!("{}{}", severity.prefix(), self.msg),
            DiagnosticData::Source { loc, token, extra } => {
                let mut line = format!("{}{}: '{}' : {}", severity.prefix(), loc, token, self.msg);
                if !extra.is_empty() {
                    line.push(' ');
                    line.push_str(extra);
                }
                line
            }
        }
    }
}

/// Diagnostic ids reported by the token source, each with a fixed severity.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DiagnosticId {
    InternalError,
    InvalidCharacter,
    InvalidNumber,
    IntegerOverflow,
    FloatOverflow,
    EofInComment,
    UnexpectedToken,
    DirectiveInvalidName,
    UnsupportedDirective,
    InvalidExtensionName,
    InvalidExtensionDirective,
    InvalidVersionNumber,
    InvalidVersionDirective,
    VersionNotFirstStatement,
    InvalidPragmaDirective,
    EofInDirective,
    UnrecognizedPragma,
}

impl DiagnosticId {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticId::EofInDirective | DiagnosticId::UnrecognizedPragma => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DiagnosticId::InternalError => "internal error",
            DiagnosticId::InvalidCharacter => "invalid character",
            DiagnosticId::InvalidNumber => "invalid number",
            DiagnosticId::IntegerOverflow => "integer overflow",
            DiagnosticId::FloatOverflow => "float overflow",
            DiagnosticId::EofInComment => "unexpected end of file found in comment",
            DiagnosticId::UnexpectedToken => "unexpected token",
            DiagnosticId::DirectiveInvalidName => "invalid directive name",
            DiagnosticId::UnsupportedDirective => "unsupported preprocessor directive",
            DiagnosticId::InvalidExtensionName => "invalid extension name",
            DiagnosticId::InvalidExtensionDirective => "invalid extension directive",
            DiagnosticId::InvalidVersionNumber => "invalid version number",
            DiagnosticId::InvalidVersionDirective => "invalid version directive",
            DiagnosticId::VersionNotFirstStatement => {
                "#version directive must occur before anything else, except for comments and white space"
            }
            DiagnosticId::InvalidPragmaDirective => "invalid pragma directive",
            DiagnosticId::EofInDirective => "unexpected end of file found in directive",
            DiagnosticId::UnrecognizedPragma => "unrecognized pragma",
        }
    }
}

#[derive(Default)]
pub struct ErrorBuffer {
    pub errors: Vec<Error>,
}

#[derive(Default)]
pub struct ErrorWarningBuffer {
    pub errors: Vec<Error>,
    pub warnings: Vec<Warning>,
}

impl ErrorBuffer {
    pub fn collect(self) -> Vec<Error> {
        self.errors
    }
    pub fn result<T>(self, value: T) -> Result<T, ErrorBuffer> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl ErrorWarningBuffer {
    pub fn collect(self) -> (Vec<Error>, Vec<Warning>) {
        (self.errors, self.warnings)
    }
}

pub trait ErrorSink {
    fn error(&mut self, error: Error);
    fn error_count(&self) -> usize;

    fn did_error(&self, prev: usize) -> bool {
        prev < self.error_count()
    }
}
pub trait WarningSink {
    fn warning(&mut self, warning: Warning);
    fn warning_count(&self) -> usize;
}

impl ErrorSink for ErrorBuffer {
    fn error(&mut self, error: Error) {
        self.errors.push(error);
    }
    fn error_count(&self) -> usize {
        self.errors.len()
    }
}
impl ErrorSink for ErrorWarningBuffer {
    fn error(&mut self, error: Error) {
        self.errors.push(error);
    }
    fn error_count(&self) -> usize {
        self.errors.len()
    }
}
impl WarningSink for ErrorWarningBuffer {
    fn warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// Receives every rendered diagnostic line in report order.
pub trait InfoSink {
    fn info(&mut self, severity: Severity, line: &str);
}

impl InfoSink for String {
    fn info(&mut self, _: Severity, line: &str) {
        self.push_str(line);
        self.push('\n');
    }
}

/// Per translation unit diagnostics.
/// Counters only grow, a compile is successful when `num_errors() == 0`.
pub struct Diagnostics {
    buffer: ErrorWarningBuffer,
    info_log: String,
    sink: Option<Box<dyn InfoSink>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics { buffer: ErrorWarningBuffer::default(), info_log: String::new(), sink: None }
    }
    pub fn with_sink(sink: Box<dyn InfoSink>) -> Diagnostics {
        Diagnostics {
            buffer: ErrorWarningBuffer::default(),
            info_log: String::new(),
            sink: Some(sink),
        }
    }

    pub fn write_info(
        &mut self,
        severity: Severity,
        loc: SourceLoc,
        reason: impl Into<Cow<'static, str>>,
        token: &str,
        extra: &str,
    ) {
        match severity {
            Severity::Error => self.error(Error::new(loc, reason, token, extra)),
            Severity::Warning => self.warning(Warning::new(loc, reason, token, extra)),
        }
    }

    pub fn report(&mut self, id: DiagnosticId, loc: SourceLoc, text: &str) {
        self.write_info(id.severity(), loc, id.message(), text, "");
    }

    pub fn num_errors(&self) -> usize {
        self.buffer.errors.len()
    }
    pub fn num_warnings(&self) -> usize {
        self.buffer.warnings.len()
    }
    pub fn info_log(&self) -> &str {
        &self.info_log
    }
    pub fn errors(&self) -> &[Error] {
        &self.buffer.errors
    }
    pub fn warnings(&self) -> &[Warning] {
        &self.buffer.warnings
    }

    pub fn collect(self) -> (ErrorWarningBuffer, String) {
        (self.buffer, self.info_log)
    }

    fn forward(&mut self, severity: Severity, diagnostic: &Diagnostic) {
        let line = diagnostic.render(severity);
        self.info_log.info(severity, &line);
        if let Some(sink) = self.sink.as_mut() {
            sink.info(severity, &line);
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Diagnostics {
        Diagnostics::new()
    }
}

impl ErrorSink for Diagnostics {
    fn error(&mut self, error: Error) {
        self.forward(Severity::Error, error.diagnostic());
        self.buffer.error(error);
    }
    fn error_count(&self) -> usize {
        self.buffer.error_count()
    }
}
impl WarningSink for Diagnostics {
    fn warning(&mut self, warning: Warning) {
        self.forward(Severity::Warning, warning.diagnostic());
        self.buffer.warning(warning);
    }
    fn warning_count(&self) -> usize {
        self.buffer.warning_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedSink(Rc<RefCell<Vec<(Severity, String)>>>);

    impl InfoSink for SharedSink {
        fn info(&mut self, severity: Severity, line: &str) {
            self.0.borrow_mut().push((severity, line.to_string()));
        }
    }

    #[test]
    fn write_info_counts_and_formats() {
        let mut diagnostics = Diagnostics::new();
        let loc = SourceLoc::new(0, 7);
        diagnostics.write_info(Severity::Error, loc, "undeclared identifier", "x", "");
        diagnostics.write_info(Severity::Warning, loc, "extension", "GL_foo", "is not supported");

        assert_eq!(diagnostics.num_errors(), 1);
        assert_eq!(diagnostics.num_warnings(), 1);
        assert_eq!(
            diagnostics.info_log(),
            "ERROR: 0(7): 'x' : undeclared identifier\n\
             WARNING: 0(7): 'GL_foo' : extension is not supported\n"
        );
    }

    #[test]
    fn report_uses_id_severity() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticId::UnrecognizedPragma, SourceLoc::new(0, 1), "foo");
        diagnostics.report(DiagnosticId::InvalidCharacter, SourceLoc::new(0, 2), "$");
        assert_eq!(diagnostics.num_warnings(), 1);
        assert_eq!(diagnostics.num_errors(), 1);
        assert_eq!(diagnostics.warnings()[0].diagnostic().msg, "unrecognized pragma");
    }

    #[test]
    fn injected_sink_sees_every_line() {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let mut diagnostics = Diagnostics::with_sink(Box::new(SharedSink(lines.clone())));
        diagnostics.write_info(Severity::Error, SourceLoc::new(1, 3), "syntax error", ";", "");

        let lines = lines.borrow();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Severity::Error);
        assert_eq!(lines[0].1, "ERROR: 1(3): ';' : syntax error");
    }
}
