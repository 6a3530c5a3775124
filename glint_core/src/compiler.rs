use crate::config::CompileOptions;
use crate::error::{Diagnostics, Error, InfoSink, Warning};
use crate::extension::{ExtensionTable, Pragma};
use crate::ir::Node;
use crate::lexer;
use crate::parse::{self, ParseContext};
use crate::support::{AsStr, Timer};
use crate::validate;

/// Result of compiling one translation unit.
pub struct CompileOutput {
    /// root `Sequence`, `None` for an empty unit.
    /// Partially recovered when `errors` is not empty.
    pub root: Option<Node>,
    pub errors: Vec<Error>,
    pub warnings: Vec<Warning>,
    /// rendered diagnostics, one per line
    pub info_log: String,
    /// extension behaviors after every `#extension` directive
    pub extensions: ExtensionTable,
    pub pragma: Pragma,
    pub stats: CompileStats,
}

#[derive(Default)]
pub struct CompileStats {
    pub token_count: usize,
    pub lex_ms: f64,
    pub parse_ms: f64,
    pub validate_ms: f64,
}

impl CompileOutput {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

impl CompileStats {
    pub fn total_ms(&self) -> f64 {
        self.lex_ms + self.parse_ms + self.validate_ms
    }
}

pub fn compile(source: &str, options: &CompileOptions) -> CompileOutput {
    compile_with(source, options, Diagnostics::new())
}

/// Same as `compile`, also forwarding every rendered diagnostic to `sink`.
pub fn compile_with_sink(source: &str, options: &CompileOptions, sink: Box<dyn InfoSink>) -> CompileOutput {
    compile_with(source, options, Diagnostics::with_sink(sink))
}

fn compile_with(source: &str, options: &CompileOptions, mut diagnostics: Diagnostics) -> CompileOutput {
    let mut stats = CompileStats::default();

    let timer = Timer::start();
    let tokens = lexer::lex(source, 0, &mut diagnostics);
    stats.lex_ms = timer.measure_ms();
    stats.token_count = tokens.len();

    let timer = Timer::start();
    let mut ctx = ParseContext::new(options, diagnostics);
    let mut root = parse::parse(&tokens, source, &mut ctx);
    stats.parse_ms = timer.measure_ms();

    if ctx.num_errors() == 0 && options.validate_loop_indexing {
        if let Some(root) = root.as_mut() {
            let timer = Timer::start();
            validate::validate_limitations(
                root,
                &ctx.symbol_table,
                ctx.shader_type,
                options.unroll_sampler_loops,
                &mut ctx.diagnostics,
            );
            stats.validate_ms = timer.measure_ms();
        }
    }
    // global, then built-in level
    while !ctx.symbol_table.is_empty() {
        ctx.symbol_table.pop();
    }

    log::debug!(
        "compiled {} shader: {} tokens, lex {:.2} ms, parse {:.2} ms, validate {:.2} ms",
        options.shader_type.as_str(),
        stats.token_count,
        stats.lex_ms,
        stats.parse_ms,
        stats.validate_ms,
    );

    let ParseContext { diagnostics, extensions, pragma, .. } = ctx;
    let (buffer, info_log) = diagnostics.collect();
    let (errors, warnings) = buffer.collect();
    CompileOutput { root, errors, warnings, info_log, extensions, pragma, stats }
}
