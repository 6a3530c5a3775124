//! Recursive descent parser for GLSL ES 1.00 translation units.
//! Grammar functions return `Err` with a description of what was expected,
//! which is reported as a syntax error at the statement or declaration level.
//! Semantic checks run in `ParseContext` and always hand back a node.

mod context;
mod decl;
mod expr;
mod grammar;
mod stmt;

pub use context::ParseContext;

use crate::directive::DirectiveHandler;
use crate::error::Severity;
use crate::ir::Node;
use crate::text::SourceLoc;
use crate::token::{Token, TokenList, T};

/// Parses the whole token list, returns the root `Sequence`
/// or `None` for an empty translation unit.
pub(crate) fn parse(tokens: &TokenList, source: &str, ctx: &mut ParseContext) -> Option<Node> {
    let mut p = Parser::new(tokens, source, ctx);
    let root = grammar::translation_unit(&mut p);
    p.finish();
    root
}

pub(crate) struct Parser<'p> {
    cursor: usize,
    /// next directive to dispatch
    directive: usize,
    tokens: &'p TokenList,
    source: &'p str,
    pub ctx: &'p mut ParseContext,
}

/// Scope and nesting state to restore after a syntax error.
#[derive(Copy, Clone)]
struct Mark {
    level: usize,
    loop_nesting: u32,
    struct_nesting: u32,
}

impl<'p> Parser<'p> {
    fn new(tokens: &'p TokenList, source: &'p str, ctx: &'p mut ParseContext) -> Parser<'p> {
        let mut p = Parser { cursor: 0, directive: 0, tokens, source, ctx };
        p.apply_directives();
        p
    }

    fn at(&self, t: Token) -> bool {
        self.peek() == t
    }

    fn at_next(&self, t: Token) -> bool {
        self.peek_next() == t
    }

    fn peek(&self) -> Token {
        self.tokens.token(self.cursor)
    }

    fn peek_next(&self) -> Token {
        self.tokens.token(self.cursor + 1)
    }

    fn eat(&mut self, t: Token) -> bool {
        if self.at(t) {
            self.bump();
            return true;
        }
        false
    }

    fn bump(&mut self) {
        if self.cursor + 1 < self.tokens.len() {
            self.cursor += 1;
        }
        self.apply_directives();
    }

    fn expect(&mut self, t: Token) -> Result<(), String> {
        if self.eat(t) {
            return Ok(());
        }
        Err(format!("expected `{}`", t.as_str()))
    }

    fn loc(&self) -> SourceLoc {
        self.tokens.loc(self.cursor)
    }

    fn prev_loc(&self) -> SourceLoc {
        self.tokens.loc(self.cursor.saturating_sub(1))
    }

    fn text(&self, idx: usize) -> &'p str {
        let source: &'p str = self.source;
        source.get(self.tokens.span(idx)).unwrap_or("")
    }

    /// consumes an identifier, returning its text and location
    fn ident(&mut self) -> Result<(String, SourceLoc), String> {
        if !self.at(T![ident]) {
            return Err("expected identifier".into());
        }
        let name = self.text(self.cursor).to_string();
        let loc = self.loc();
        self.bump();
        Ok((name, loc))
    }

    fn literal(&self) -> Option<crate::ir::ConstValue> {
        self.tokens.literal(self.cursor)
    }

    /// directives become visible once the parser reaches the token they precede
    fn apply_directives(&mut self) {
        let directives = self.tokens.directives();
        while let Some((idx, loc, directive)) = directives.get(self.directive) {
            if *idx > self.cursor {
                break;
            }
            let ctx = &mut *self.ctx;
            let mut handler =
                DirectiveHandler::new(&mut ctx.extensions, &mut ctx.pragma, &mut ctx.diagnostics);
            directive.dispatch(*loc, &mut handler);
            self.directive += 1;
        }
    }

    /// dispatches directives trailing the last token
    fn finish(&mut self) {
        let directives = self.tokens.directives();
        while let Some((_, loc, directive)) = directives.get(self.directive) {
            let ctx = &mut *self.ctx;
            let mut handler =
                DirectiveHandler::new(&mut ctx.extensions, &mut ctx.pragma, &mut ctx.diagnostics);
            directive.dispatch(*loc, &mut handler);
            self.directive += 1;
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            level: self.ctx.symbol_table.current_level(),
            loop_nesting: self.ctx.loop_nesting,
            struct_nesting: self.ctx.struct_nesting,
        }
    }

    /// reports the token at the cursor as unexpected
    fn syntax_error(&mut self, expected: &str) {
        let token = if self.at(T![eof]) { "" } else { self.text(self.cursor) };
        log::trace!("syntax error at {}: {}", self.loc(), expected);
        self.ctx.diagnostics.write_info(Severity::Error, self.loc(), "syntax error", token, "");
    }

    /// Skips to the end of the broken statement and restores `mark`.
    /// A `;` at depth zero is consumed, a `}` at depth zero only when
    /// `consume_close` is set, so an enclosing block can still close itself.
    fn recover(&mut self, mark: Mark, consume_close: bool) {
        let start = self.cursor;
        let mut depth = 0u32;
        loop {
            match self.peek() {
                T![eof] => break,
                T![;] if depth == 0 => {
                    self.bump();
                    break;
                }
                T!['{'] => depth += 1,
                T!['}'] if depth == 0 => {
                    if consume_close {
                        self.bump();
                    }
                    break;
                }
                T!['}'] => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        break;
                    }
                }
                _ => {}
            }
            self.bump();
        }
        log::trace!("recovered from token {} to {}", start, self.cursor);

        while self.ctx.symbol_table.current_level() > mark.level {
            self.ctx.symbol_table.pop();
        }
        self.ctx.loop_nesting = mark.loop_nesting;
        self.ctx.struct_nesting = mark.struct_nesting;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::ParseContext;
    use crate::config::{CompileOptions, ShaderSpec, ShaderType};
    use crate::error::Diagnostics;
    use crate::ir::{Node, Op};

    pub(crate) fn parse_with(options: &CompileOptions, source: &str) -> (ParseContext, Option<Node>) {
        let mut diagnostics = Diagnostics::new();
        let tokens = crate::lexer::lex(source, 0, &mut diagnostics);
        let mut ctx = ParseContext::new(options, diagnostics);
        let root = super::parse(&tokens, source, &mut ctx);
        (ctx, root)
    }

    pub(crate) fn parse_source(shader_type: ShaderType, source: &str) -> (ParseContext, Option<Node>) {
        parse_with(&CompileOptions::new(shader_type, ShaderSpec::Gles2), source)
    }

    /// body `Sequence` of the `main` definition
    pub(crate) fn main_body(root: &Node) -> Node {
        let children = &root.as_aggregate().expect("root aggregate").children;
        let main = children
            .iter()
            .filter_map(|child| child.as_aggregate())
            .find(|aggregate| aggregate.op == Op::Function && aggregate.name == "main(")
            .expect("main definition");
        main.children[1].clone()
    }
}
