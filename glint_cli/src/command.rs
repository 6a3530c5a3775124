use glint_core::config::{ShaderSpec, ShaderType};
use glint_core::error::ErrorBuffer;
use glint_core::errors as err;
use glint_core::support::AsStr;
use std::collections::HashSet;
use std::path::PathBuf;

pub enum Command {
    Check(CommandCheck),
    Help,
    Version,
}

pub struct CommandCheck {
    pub path: PathBuf,
    pub shader: Option<ShaderType>,
    pub spec: Option<ShaderSpec>,
    pub tree: bool,
    pub stats: bool,
}

//==================== PARSE COMMAND ====================

pub fn parse() -> Result<Command, ErrorBuffer> {
    parse_from(std::env::args().skip(1).collect())
}

fn parse_from(args: Vec<String>) -> Result<Command, ErrorBuffer> {
    let format = format(args)?;
    let mut p = CommandParser { err: ErrorBuffer::default(), format };

    let command = match p.format.cmd.as_str() {
        "c" | "check" => command_check(&mut p),
        "h" | "help" => command_help(&mut p),
        "v" | "version" => command_version(&mut p),
        _ => {
            err::cmd_unknown(&mut p.err, &p.format.cmd);
            return Err(p.err);
        }
    };

    for opt in p.format.options {
        err::cmd_option_unknown(&mut p.err, &opt);
    }
    for opt in p.format.duplicates {
        err::cmd_option_duplicate(&mut p.err, &opt);
    }
    p.err.result(command)
}

fn command_check(p: &mut CommandParser) -> Command {
    let path = PathBuf::from(parse_args_single(p, "file"));
    let shader = parse_option_enum(p);
    let spec = parse_option_enum(p);
    let tree = parse_option_flag(p, false, "tree");
    let stats = parse_option_flag(p, false, "stats");

    let data = CommandCheck { path, shader, spec, tree, stats };
    Command::Check(data)
}

fn command_help(p: &mut CommandParser) -> Command {
    parse_args_none(p);
    Command::Help
}

fn command_version(p: &mut CommandParser) -> Command {
    parse_args_none(p);
    Command::Version
}

struct CommandFormat {
    cmd: String,
    args: Vec<String>,
    options: HashSet<String>,
    duplicates: HashSet<String>,
}

//==================== PARSE ARGS ====================

struct FormatParser {
    args: Vec<String>,
}

fn format(args: Vec<String>) -> Result<CommandFormat, ErrorBuffer> {
    let mut p = FormatParser { args: args.into_iter().rev().collect() };

    let cmd = match format_eat_arg(&mut p) {
        Some(cmd) => cmd,
        None => {
            let mut err = ErrorBuffer::default();
            err::cmd_name_missing(&mut err);
            return Err(err);
        }
    };
    let mut args = format_args(&mut p);
    let (options, duplicates) = format_options(&mut p, &mut args);
    Ok(CommandFormat { cmd, args, options, duplicates })
}

fn format_args(p: &mut FormatParser) -> Vec<String> {
    let mut args = Vec::new();

    while let Some(arg) = format_eat_arg(p) {
        args.push(arg);
    }
    args
}

/// options take no values, arguments following an option
/// are positional arguments of the command
fn format_options(p: &mut FormatParser, args: &mut Vec<String>) -> (HashSet<String>, HashSet<String>) {
    let mut options = HashSet::new();
    let mut duplicates = HashSet::new();

    while let Some(opt) = format_eat_option(p) {
        args.extend(format_args(p));

        if options.contains(&opt) {
            duplicates.insert(opt);
        } else {
            options.insert(opt);
        }
    }
    (options, duplicates)
}

fn format_eat_arg(p: &mut FormatParser) -> Option<String> {
    let next = p.args.last()?;
    if next.starts_with('-') {
        None
    } else {
        p.args.pop()
    }
}

fn format_eat_option(p: &mut FormatParser) -> Option<String> {
    let next = p.args.pop()?;
    Some(next.trim_start_matches('-').to_string())
}

//==================== PARSE FORMAT ====================

struct CommandParser {
    err: ErrorBuffer,
    format: CommandFormat,
}

fn parse_args_none(p: &mut CommandParser) {
    if !p.format.args.is_empty() {
        err::cmd_expect_no_args(&mut p.err, &p.format.cmd);
    }
}

fn parse_args_single(p: &mut CommandParser, name: &str) -> String {
    if let Some(arg) = p.format.args.first() {
        if p.format.args.len() > 1 {
            err::cmd_expect_single_arg(&mut p.err, &p.format.cmd, name);
        }
        arg.to_string()
    } else {
        err::cmd_expect_single_arg(&mut p.err, &p.format.cmd, name);
        "error".to_string()
    }
}

fn parse_option(p: &mut CommandParser, opt: &'static str) -> bool {
    p.format.options.remove(opt)
}

fn parse_option_flag(p: &mut CommandParser, default: bool, name: &'static str) -> bool {
    if parse_option(p, name) {
        true
    } else {
        default
    }
}

/// every variant of `T` is an option of its own, `--vertex` or `--fragment`
fn parse_option_enum<T: Copy + AsStr>(p: &mut CommandParser) -> Option<T> {
    let mut selected = None;
    let mut variants = T::ALL.iter().copied();

    for value in variants.by_ref() {
        if parse_option(p, value.as_str()) {
            selected = Some(value);
            break;
        }
    }

    if let Some(selected) = selected {
        for other in variants {
            if parse_option(p, other.as_str()) {
                let opt = selected.as_str();
                let other = other.as_str();
                err::cmd_option_conflict(&mut p.err, opt, other);
            }
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn error_messages(result: Result<Command, ErrorBuffer>) -> Vec<String> {
        match result {
            Ok(_) => panic!("expected errors"),
            Err(err) => err.collect().iter().map(|e| e.diagnostic().msg.to_string()).collect(),
        }
    }

    #[test]
    fn check_with_options() {
        let command = parse_from(args(&["check", "--fragment", "--webgl", "--tree", "a.glsl"]));
        let Ok(Command::Check(data)) = command else {
            panic!("expected check command");
        };
        assert_eq!(data.path, PathBuf::from("a.glsl"));
        assert_eq!(data.shader, Some(ShaderType::Fragment));
        assert_eq!(data.spec, Some(ShaderSpec::WebGL));
        assert!(data.tree);
        assert!(!data.stats);
    }

    #[test]
    fn check_defaults() {
        let Ok(Command::Check(data)) = parse_from(args(&["c", "shader.vert"])) else {
            panic!("expected check command");
        };
        assert_eq!(data.shader, None);
        assert_eq!(data.spec, None);
        assert!(!data.tree);
    }

    #[test]
    fn conflicting_shader_types() {
        let messages = error_messages(parse_from(args(&["check", "a.glsl", "--vertex", "--fragment"])));
        assert_eq!(messages, vec!["options `--vertex` and `--fragment` cannot be used together"]);
    }

    #[test]
    fn unknown_and_duplicate_options() {
        let messages = error_messages(parse_from(args(&["check", "a.vert", "--fast", "--tree", "--tree"])));
        assert!(messages.contains(&"option `--fast` is unknown, use `glint help` to learn the usage".to_string()));
        assert!(messages.contains(&"option `--tree` cannot be used multiple times".to_string()));
    }

    #[test]
    fn missing_and_unknown_commands() {
        let messages = error_messages(parse_from(Vec::new()));
        assert_eq!(messages, vec!["command name is missing, use `glint help` to learn the usage"]);
        let messages = error_messages(parse_from(args(&["build"])));
        assert_eq!(messages, vec!["command `build` is unknown, use `glint help` to learn the usage"]);
        let messages = error_messages(parse_from(args(&["check"])));
        assert_eq!(messages, vec!["command `check` accepts a single `file` argument"]);
    }
}
