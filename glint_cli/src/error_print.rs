use crate::ansi::AnsiStyle;
use glint_core::error::{Error, ErrorBuffer, Severity};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Driver errors, command line and file system.
pub fn print_errors(err: ErrorBuffer) {
    let errors = err.collect();
    print_messages(&errors);
}

pub fn print_error(error: Error) {
    print_messages(&[error]);
}

fn print_messages(errors: &[Error]) {
    let style = AnsiStyle::new();
    let rb = style.err.red_bold;
    let wb = style.err.white_bold;
    let r = style.err.reset;
    let mut handle = BufWriter::new(std::io::stderr());

    for error in errors {
        let _ = writeln!(handle, "{rb}error:{r} {wb}{}{r}\n", error.diagnostic().msg);
    }
    let _ = handle.flush();
}

/// Prints the info log of a compiled file in report order.
/// Lines keep their `ERROR: 0(3): ...` layout, only the
/// severity prefix is colored.
pub fn print_info_log(path: &Path, info_log: &str) {
    let style = AnsiStyle::new();
    let c = style.err.cyan;
    let r = style.err.reset;
    let mut handle = BufWriter::new(std::io::stderr());

    if !info_log.is_empty() {
        let _ = writeln!(handle, "{c}{}{r}", path.to_string_lossy());
    }
    for line in info_log.lines() {
        let (severity, rest) = if let Some(rest) = line.strip_prefix(Severity::Error.prefix()) {
            (Severity::Error, rest)
        } else if let Some(rest) = line.strip_prefix(Severity::Warning.prefix()) {
            (Severity::Warning, rest)
        } else {
            let _ = writeln!(handle, "{line}");
            continue;
        };
        let color = severity_color(&style, severity);
        let _ = writeln!(handle, "{color}{}{r}{rest}", severity.prefix());
    }
    let _ = handle.flush();
}

const fn severity_color(style: &AnsiStyle, severity: Severity) -> &'static str {
    match severity {
        Severity::Error => style.err.red_bold,
        Severity::Warning => style.err.yellow_bold,
    }
}
