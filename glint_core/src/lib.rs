#![deny(unsafe_code)]

mod builtins;
pub mod compiler;
pub mod config;
pub mod const_tree;
pub mod directive;
pub mod error;
pub mod errors;
pub mod extension;
pub mod intermediate;
pub mod ir;
pub mod ir_print;
mod lexer;
mod macros;
pub mod parse;
pub mod support;
pub mod symbol_table;
pub mod text;
mod token;
pub mod types;
pub mod validate;

/// compiler version reported by `glint_cli` and the test runner
pub const VERSION: &str = "0.1.0";
