use glint_core::compiler;
use glint_core::config::{CompileOptions, ShaderSpec, ShaderType};
use glint_core::error::Error;
use glint_core::support::{os, AsStr, Timer};
use std::path::{Path, PathBuf};

const R: &str = "\x1B[0m";
const RB: &str = "\x1B[1;31m";
const GB: &str = "\x1B[1;32m";
const CB: &str = "\x1B[1;36m";

fn main() {
    let test_dir = if Path::new("./test").exists() {
        PathBuf::from("./test")
    } else {
        PathBuf::from("../test")
    };

    let result = collect_test_files(&test_dir).and_then(|paths| {
        paths.iter().map(|path| parse_test_file(path)).collect::<Result<Vec<_>, Error>>()
    });
    match result {
        Ok(tests) => {
            let passed = run_tests(&tests);
            if !passed {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("{RB}error:{R} {}", error.diagnostic().msg);
            std::process::exit(2);
        }
    }
}

/// One `.glsl` file:
/// ```text
/// //#shader fragment
/// //#spec webgl
/// //#expect
/// //ERROR: 0(7): 'i' : Loop index cannot be statically assigned to within the body of the loop
/// //#!
/// <shader source>
/// ```
/// The whole file is compiled so reported lines match the file.
#[derive(Debug)]
struct GlintTest {
    name: String,
    shader: ShaderType,
    spec: ShaderSpec,
    expect: String,
    source: String,
}

fn collect_test_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut paths = Vec::new();
    collect_test_files_impl(dir, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn collect_test_files_impl(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), Error> {
    for entry in os::dir_read(dir)? {
        let entry = os::dir_entry_read(dir, entry)?;
        let path = entry.path();
        if path.is_dir() {
            collect_test_files_impl(&path, paths)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("glsl") {
            paths.push(path);
        }
    }
    Ok(())
}

fn parse_test_file(path: &Path) -> Result<GlintTest, Error> {
    let source = os::file_read(path)?;
    let name = path.to_string_lossy().trim_start_matches("./").trim_start_matches("../").to_string();
    let mut shader = ShaderType::from_path(path).unwrap_or(ShaderType::Fragment);
    let mut spec = ShaderSpec::Gles2;
    let mut expect = String::new();
    let mut lines = source.lines();

    while let Some(line) = lines.next() {
        if let Some(value) = line.strip_prefix("//#shader ") {
            shader = ShaderType::from_str(value.trim())
                .ok_or_else(|| header_error(&name, format!("unknown shader type `{}`", value.trim())))?;
        } else if let Some(value) = line.strip_prefix("//#spec ") {
            spec = ShaderSpec::from_str(value.trim())
                .ok_or_else(|| header_error(&name, format!("unknown shader spec `{}`", value.trim())))?;
        } else if line == "//#expect" {
            let mut closed = false;
            for line in lines.by_ref() {
                if line.starts_with("//#!") {
                    closed = true;
                    break;
                }
                let Some(expected) = line.strip_prefix("//") else {
                    return Err(header_error(&name, "`//#expect` lines must start with `//`".to_string()));
                };
                expect.push_str(expected);
                expect.push('\n');
            }
            if !closed {
                return Err(header_error(&name, "`//#expect` block is missing `//#!`".to_string()));
            }
        } else {
            break;
        }
    }
    Ok(GlintTest { name, shader, spec, expect, source })
}

fn header_error(name: &str, msg: String) -> Error {
    Error::message(format!("test file `{name}`: {msg}"))
}

fn run_tests(tests: &[GlintTest]) -> bool {
    let timer = Timer::start();
    let mut passed_count = 0;

    for test in tests {
        let options = CompileOptions::new(test.shader, test.spec);
        let output = compiler::compile(&test.source, &options);

        let label = format!("{} ({}, {})", test.name, test.shader.as_str(), test.spec.as_str());
        if output.info_log == test.expect {
            passed_count += 1;
            println!("{:.<64} [{GB}OK{R}]", label);
        } else {
            println!("{:.<64} [{RB}ERROR{R}]", label);
            println!("\n{RB}expected output:{R}\n{}{CB}[end]{R}", test.expect);
            println!("{RB}received output:{R}\n{}{CB}[end]{R}\n", output.info_log);
        }
    }

    let total_count = tests.len();
    let result_color = if passed_count == total_count { GB } else { RB };
    println!(
        "\n{result_color}tests passed:{R} [{}/{}] in {:.2} ms\n",
        passed_count,
        total_count,
        timer.measure_ms()
    );
    passed_count == total_count
}
