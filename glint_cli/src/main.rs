#![forbid(unsafe_code)]

mod ansi;
mod command;
mod error_print;
mod execute;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let command = match command::parse() {
        Ok(command) => command,
        Err(err) => {
            error_print::print_errors(err);
            std::process::exit(2);
        }
    };
    match execute::command(command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            error_print::print_error(error);
            std::process::exit(2);
        }
    }
}
