use crate::error::{Error, ErrorSink};
use std::path::Path;

//==================== COMMAND ====================

pub fn cmd_name_missing(emit: &mut impl ErrorSink) {
    let msg = "command name is missing, use `glint help` to learn the usage";
    emit.error(Error::message(msg));
}

pub fn cmd_unknown(emit: &mut impl ErrorSink, cmd: &str) {
    let msg = format!("command `{cmd}` is unknown, use `glint help` to learn the usage");
    emit.error(Error::message(msg));
}

pub fn cmd_expect_no_args(emit: &mut impl ErrorSink, cmd: &str) {
    let msg = format!("command `{cmd}` does not accept any arguments");
    emit.error(Error::message(msg));
}

pub fn cmd_expect_single_arg(emit: &mut impl ErrorSink, cmd: &str, name: &str) {
    let msg = format!("command `{cmd}` accepts a single `{name}` argument");
    emit.error(Error::message(msg));
}

pub fn cmd_option_conflict(emit: &mut impl ErrorSink, opt: &str, other: &str) {
    let msg = format!("options `--{opt}` and `--{other}` cannot be used together");
    emit.error(Error::message(msg));
}

pub fn cmd_option_unknown(emit: &mut impl ErrorSink, opt: &str) {
    let msg = format!("option `--{opt}` is unknown, use `glint help` to learn the usage");
    emit.error(Error::message(msg));
}

pub fn cmd_option_duplicate(emit: &mut impl ErrorSink, opt: &str) {
    let msg = format!("option `--{opt}` cannot be used multiple times");
    emit.error(Error::message(msg));
}

//==================== CHECK ====================

pub fn check_shader_type_unknown(path: &Path) -> Error {
    let path = path.to_string_lossy();
    let msg = format!(
        "cannot infer shader type of `{path}`
use a `.vert` / `.frag` extension, pass `--vertex` / `--fragment` or set `shader` in `Glint.toml`"
    );
    Error::message(msg)
}

//==================== OS ====================

pub fn os_dir_get_current_working(io_error: String) -> Error {
    let msg = format!("failed to get working directory\nreason: {io_error}");
    Error::message(msg)
}

pub fn os_dir_read(io_error: String, path: &Path) -> Error {
    let path = path.to_string_lossy();
    let msg = format!("failed to read directory: `{path}`\nreason: {io_error}");
    Error::message(msg)
}

pub fn os_dir_entry_read(io_error: String, path: &Path) -> Error {
    let path = path.to_string_lossy();
    let msg = format!("failed to read directory entry in: `{path}`\nreason: {io_error}");
    Error::message(msg)
}

pub fn os_file_read(io_error: String, path: &Path) -> Error {
    let path = path.to_string_lossy();
    let msg = format!("failed to read file: `{path}`\nreason: {io_error}");
    Error::message(msg)
}
