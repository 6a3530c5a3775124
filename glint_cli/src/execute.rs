use crate::ansi::AnsiStyle;
use crate::command::{Command, CommandCheck};
use crate::error_print;
use glint_core::compiler::{self, CompileOutput, CompileStats};
use glint_core::config::{self, CompileOptions, ConfigFile, ShaderSpec, ShaderType};
use glint_core::error::Error;
use glint_core::errors as err;
use glint_core::ir_print;
use glint_core::support::{os, AsStr, Timer};

const CONFIG_FILE: &str = "Glint.toml";

/// Runs the command, `Ok(false)` when the compiled shader had errors.
pub fn command(command: Command) -> Result<bool, Error> {
    match command {
        Command::Check(data) => check(data),
        Command::Help => {
            help();
            Ok(true)
        }
        Command::Version => {
            version();
            Ok(true)
        }
    }
}

fn check(data: CommandCheck) -> Result<bool, Error> {
    let timer = Timer::start();
    let config = load_config()?;
    let source = os::file_read(&data.path)?;

    let shader_type = data
        .shader
        .or_else(|| ShaderType::from_path(&data.path))
        .or(config.shader)
        .ok_or_else(|| err::check_shader_type_unknown(&data.path))?;

    let mut options = CompileOptions::from_config(&config, shader_type);
    if let Some(spec) = data.spec {
        options.spec = spec;
        options.validate_loop_indexing =
            config.validate_loop_indexing.unwrap_or(spec == ShaderSpec::WebGL);
    }
    log::debug!(
        "checking `{}` as {} shader ({})",
        data.path.to_string_lossy(),
        shader_type.as_str(),
        options.spec.as_str()
    );

    let output = compiler::compile(&source, &options);
    error_print::print_info_log(&data.path, &output.info_log);

    if data.tree {
        if let Some(root) = output.root.as_ref() {
            print!("{}", ir_print::tree_display(root));
        }
    }
    let style = AnsiStyle::new();
    if data.stats {
        print_stats(&style, &output.stats);
    }
    print_check_finished(&style, &output, timer.measure_ms());
    Ok(output.success())
}

fn load_config() -> Result<ConfigFile, Error> {
    let path = os::dir_get_current_working()?.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let text = os::file_read(&path)?;
    config::deserialize(&text, &path)
}

fn print_stats(style: &AnsiStyle, stats: &CompileStats) {
    let g = style.out.green_bold;
    let r = style.out.reset;

    println!("   {g}tokens:{r} {}\n", stats.token_count);
    println!("      {g}lex:{r} {:.2} ms", stats.lex_ms);
    println!("    {g}parse:{r} {:.2} ms", stats.parse_ms);
    println!(" {g}validate:{r} {:.2} ms\n", stats.validate_ms);
}

fn print_check_finished(style: &AnsiStyle, output: &CompileOutput, total_ms: f64) {
    let g = style.out.green_bold;
    let rb = style.out.red_bold;
    let r = style.out.reset;
    let errors = output.errors.len();
    let warnings = output.warnings.len();

    if output.success() {
        println!("  {g}Finished{r} `check` with {} warning(s) in {:.2} ms", warnings, total_ms);
    } else {
        println!("    {rb}Failed{r} `check` with {} error(s), {} warning(s)", errors, warnings);
    }
}

fn help() {
    let style = AnsiStyle::new();
    let g = style.out.green_bold;
    let c = style.out.cyan;
    let r = style.out.reset;

    #[rustfmt::skip]
    println!(
r#"
{g}Usage:
  {c}glint <command> [options]

{g}Commands:
  {c}c, check <file>  {r}Compile a GLSL ES 1.00 shader and report diagnostics
  {c}h, help          {r}Print help information
  {c}v, version       {r}Print compiler version

{g}Options:
  {c}check
    {c}--vertex       {r}Compile as a vertex shader
    {c}--fragment     {r}Compile as a fragment shader
    {c}--gles2        {r}Use the OpenGL ES 2.0 rules
    {c}--webgl        {r}Use the WebGL rules, enables loop and index validation
    {c}--tree         {r}Print the intermediate tree
    {c}--stats        {r}Print phase timings

  Shader type defaults to the file extension (.vert / .frag),
  then to `shader` in {CONFIG_FILE}.
  Set RUST_LOG=glint_core=trace for compiler logs.
"#);
}

fn version() {
    let style = AnsiStyle::new();
    let g = style.out.green_bold;
    let r = style.out.reset;
    println!("  {g}Glint version:{r} {}", glint_core::VERSION);
}
