//! Statements: blocks, selection, iteration and jumps.

use super::context::ParseContext;
use super::{decl, expr, Parser};
use crate::config::ShaderType;
use crate::intermediate::{add_branch, add_if, add_loop, grow_aggregate, set_aggregate_operator};
use crate::ir::{BranchKind, LoopKind, Node, Op};
use crate::text::SourceLoc;
use crate::token::T;
use crate::types::Type;

/// `{ statements }` without opening a scope, used for function bodies
/// and loop bodies whose scope was pushed by the caller.
pub(super) fn compound_statement_no_new_scope(p: &mut Parser) -> Result<Option<Node>, String> {
    let loc = p.loc();
    p.expect(T!['{'])?;
    let list = statement_list(p)?;
    p.expect(T!['}'])?;
    Ok(list.map(|list| set_aggregate_operator(Some(list), Op::Sequence, loc)))
}

fn compound_statement(p: &mut Parser) -> Result<Option<Node>, String> {
    p.ctx.symbol_table.push();
    let block = compound_statement_no_new_scope(p)?;
    p.ctx.symbol_table.pop();
    Ok(block)
}

/// Statements up to the closing `}`, a broken statement is reported
/// and skipped so the rest of the block is still checked.
fn statement_list(p: &mut Parser) -> Result<Option<Node>, String> {
    let mut list = None;
    while !p.at(T!['}']) && !p.at(T![eof]) {
        let mark = p.mark();
        let loc = p.loc();
        match statement(p) {
            Ok(node) => list = grow_aggregate(list, node, loc),
            Err(expected) => {
                p.syntax_error(&expected);
                p.recover(mark, false);
            }
        }
    }
    Ok(list)
}

fn statement(p: &mut Parser) -> Result<Option<Node>, String> {
    match p.peek() {
        T!['{'] => compound_statement(p),
        _ => simple_statement(p),
    }
}

/// Branch of an `if` or `do` body, a single statement gets its own scope too.
fn statement_with_scope(p: &mut Parser) -> Result<Option<Node>, String> {
    p.ctx.symbol_table.push();
    let node = statement_no_new_scope(p)?;
    p.ctx.symbol_table.pop();
    Ok(node)
}

fn statement_no_new_scope(p: &mut Parser) -> Result<Option<Node>, String> {
    if p.at(T!['{']) {
        return compound_statement_no_new_scope(p);
    }
    simple_statement(p)
}

fn simple_statement(p: &mut Parser) -> Result<Option<Node>, String> {
    let loc = p.loc();
    match p.peek() {
        T![if] => if_statement(p).map(Some),
        T![for] => for_statement(p).map(Some),
        T![while] => while_statement(p).map(Some),
        T![do] => do_statement(p).map(Some),
        T![break] | T![continue] => {
            let kind = match p.peek() {
                T![break] => BranchKind::Break,
                _ => BranchKind::Continue,
            };
            p.bump();
            p.expect(T![;])?;
            Ok(Some(p.ctx.add_loop_jump(kind, loc)))
        }
        T![return] => {
            p.bump();
            let value = match p.at(T![;]) {
                true => None,
                false => Some(expr::expression(p)?),
            };
            p.expect(T![;])?;
            Ok(Some(p.ctx.add_return(loc, value)))
        }
        T![discard] => {
            p.bump();
            p.expect(T![;])?;
            Ok(Some(p.ctx.add_discard(loc)))
        }
        _ if at_declaration(p) => decl::declaration(p, false),
        _ => expression_statement(p),
    }
}

/// `;` or `expression ;`
fn expression_statement(p: &mut Parser) -> Result<Option<Node>, String> {
    if p.eat(T![;]) {
        return Ok(None);
    }
    let node = expr::expression(p)?;
    p.expect(T![;])?;
    Ok(Some(node))
}

/// true when the cursor starts a declaration rather than an expression,
/// a type followed by `(` is a constructor call
fn at_declaration(p: &Parser) -> bool {
    match p.peek() {
        T![precision] | T![invariant] | T![const] | T![attribute] | T![uniform] | T![varying] | T![struct] => {
            true
        }
        token if token.is_precision_keyword() => true,
        token if token.is_type_keyword() => !p.at_next(T!['(']),
        T![ident] => decl::struct_type(p).is_some() && !p.at_next(T!['(']),
        _ => false,
    }
}

fn if_statement(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    p.expect(T![if])?;
    p.expect(T!['('])?;
    let cond = expr::expression(p)?;
    let _ = p.ctx.bool_check(cond.loc, &cond.ty);
    p.expect(T![')'])?;

    let then_branch = statement_with_scope(p)?;
    let else_branch = match p.eat(T![else]) {
        true => statement_with_scope(p)?,
        false => None,
    };
    Ok(add_if(cond, then_branch, else_branch, loc))
}

/// Loop condition, either a boolean expression or
/// a declaration like `bool done = check()`.
fn condition(p: &mut Parser) -> Result<Node, String> {
    if !at_declaration(p) {
        let cond = expr::expression(p)?;
        let _ = p.ctx.bool_check(cond.loc, &cond.ty);
        return Ok(cond);
    }
    let (ty, _) = decl::fully_specified_type(p)?;
    let (name, loc) = p.ident()?;
    p.expect(T![=])?;
    let init = expr::assignment_expression(p)?;
    Ok(p.ctx.condition_declaration(loc, &name, &ty, init))
}

fn for_statement(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    p.expect(T![for])?;
    p.expect(T!['('])?;
    p.ctx.symbol_table.push();
    p.ctx.loop_nesting += 1;

    let init = match at_declaration(p) {
        true => decl::declaration(p, false)?,
        false => expression_statement(p)?,
    };
    let cond = match p.at(T![;]) {
        true => None,
        false => Some(condition(p)?),
    };
    p.expect(T![;])?;
    let expr = match p.at(T![')']) {
        true => None,
        false => Some(expr::expression(p)?),
    };
    p.expect(T![')'])?;
    let body = statement_no_new_scope(p)?;

    p.ctx.symbol_table.pop();
    p.ctx.loop_nesting -= 1;
    Ok(add_loop(LoopKind::For, init, cond, expr, body, loc))
}

fn while_statement(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    p.expect(T![while])?;
    p.expect(T!['('])?;
    p.ctx.symbol_table.push();
    p.ctx.loop_nesting += 1;

    let cond = condition(p)?;
    p.expect(T![')'])?;
    let body = statement_no_new_scope(p)?;

    p.ctx.symbol_table.pop();
    p.ctx.loop_nesting -= 1;
    Ok(add_loop(LoopKind::While, None, Some(cond), None, body, loc))
}

fn do_statement(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    p.expect(T![do])?;
    p.ctx.loop_nesting += 1;
    let body = statement_with_scope(p)?;
    p.expect(T![while])?;
    p.expect(T!['('])?;
    let cond = expr::expression(p)?;
    let _ = p.ctx.bool_check(cond.loc, &cond.ty);
    p.expect(T![')'])?;
    p.expect(T![;])?;
    p.ctx.loop_nesting -= 1;
    Ok(add_loop(LoopKind::DoWhile, None, Some(cond), None, body, loc))
}

impl ParseContext {
    pub(crate) fn add_loop_jump(&mut self, kind: BranchKind, loc: SourceLoc) -> Node {
        if self.loop_nesting == 0 {
            match kind {
                BranchKind::Break => self.error(loc, "break statement only allowed in loops", "", ""),
                _ => self.error(loc, "continue statement only allowed in loops", "", ""),
            }
        }
        add_branch(kind, None, loc)
    }

    /// `return` must agree with the return type of the enclosing function.
    pub(crate) fn add_return(&mut self, loc: SourceLoc, value: Option<Node>) -> Node {
        let expected = self.current_function_type.clone().unwrap_or_else(Type::void);
        match &value {
            None if expected.basic != crate::types::BasicType::Void => {
                self.error(loc, "non-void function must return a value", "return", "");
            }
            None => {}
            Some(value) => {
                self.function_returns_value = true;
                if expected.basic == crate::types::BasicType::Void {
                    self.error(loc, "void function cannot return a value", "return", "");
                } else if expected != value.ty {
                    self.error(loc, "function return is not matching type:", "return", "");
                }
            }
        }
        add_branch(BranchKind::Return, value, loc)
    }

    pub(crate) fn add_discard(&mut self, loc: SourceLoc) -> Node {
        if self.shader_type != ShaderType::Fragment {
            self.error(loc, " supported in fragment shaders only ", "discard", "");
        }
        add_branch(BranchKind::Discard, None, loc)
    }

    /// Declares the variable of a condition declaration and returns its initialization.
    pub(crate) fn condition_declaration(&mut self, loc: SourceLoc, name: &str, ty: &Type, init: Node) -> Node {
        let _ = self.bool_check(loc, ty);
        match self.execute_initializer(loc, name, ty, init) {
            Ok(Some(node)) => node,
            Ok(None) => self.add_identifier(loc, name),
            Err(()) => Node::const_bool(false, loc),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ShaderType;
    use crate::ir::{BranchKind, LoopKind, NodeKind, Op};
    use crate::parse::tests::{main_body, parse_source};
    use crate::token::T;

    fn log_of(shader: ShaderType, source: &str) -> String {
        let (ctx, _) = parse_source(shader, source);
        ctx.diagnostics.info_log().to_string()
    }

    #[test]
    fn token_macro_resolves_without_token_import() {
        assert_eq!(T![for].as_str(), "for");
        assert_eq!(T!['{'].as_str(), "{");
    }

    #[test]
    fn loops_build_loop_nodes() {
        let source = "void main() {\nfor (int i = 0; i < 4; i++) { }\nwhile (false) { }\ndo { } while (true);\n}";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let body = main_body(root.as_ref().unwrap());
        let kinds: Vec<_> = body
            .as_aggregate()
            .unwrap()
            .children
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Loop(l) => l.kind,
                _ => panic!("expected loop"),
            })
            .collect();
        assert_eq!(kinds, [LoopKind::For, LoopKind::While, LoopKind::DoWhile]);
        // for-init variable is scoped to the loop
        assert!(ctx.symbol_table.find("i").is_none());
    }

    #[test]
    fn jumps_outside_loops() {
        let source = "void main() {\nbreak;\ncontinue;\nfor (int i = 0; i < 2; i++) { if (i == 1) break; else continue; }\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert_eq!(log.matches("statement only allowed in loops").count(), 2, "{}", log);
        assert!(log.contains("'' : break statement only allowed in loops"), "{}", log);
        assert!(log.contains("'' : continue statement only allowed in loops"), "{}", log);
    }

    #[test]
    fn return_checks() {
        let source = "void f() { return 1.0; }\nfloat g() { return; }\nfloat h() { return 1; }\nfloat k() { return 2.0; }\nvoid main() { return; }";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'return' : void function cannot return a value"), "{}", log);
        assert!(log.contains("'return' : non-void function must return a value"), "{}", log);
        assert!(log.contains("'return' : function return is not matching type:"), "{}", log);
        assert_eq!(log.lines().count(), 4, "{}", log);
        assert!(log.contains("function does not return a value:"), "{}", log);
    }

    #[test]
    fn discard_is_fragment_only() {
        let source = "void main() { discard; }";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'discard' :  supported in fragment shaders only"), "{}", log);

        let source = "precision mediump float;\nvoid main() { if (gl_FrontFacing) discard; }";
        let (ctx, root) = parse_source(ShaderType::Fragment, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let body = main_body(root.as_ref().unwrap());
        let NodeKind::Selection(selection) = &body.as_aggregate().unwrap().children[0].kind else {
            panic!("expected selection");
        };
        let then_branch = selection.then_branch.as_ref().unwrap();
        assert!(matches!(then_branch.kind, NodeKind::Branch { kind: BranchKind::Discard, .. }));
    }

    #[test]
    fn conditions_must_be_bool() {
        let source = "void main() {\nif (1.0) { }\nwhile (1) { }\nfor (;2.0;) { }\ndo { } while (vec2(1.0));\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert_eq!(log.matches("boolean expression expected").count(), 4, "{}", log);
    }

    #[test]
    fn condition_declaration() {
        let source = "bool f() { return false; }\nvoid main() { while (bool done = f()) { done = false; } }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let body = main_body(root.as_ref().unwrap());
        let NodeKind::Loop(l) = &body.as_aggregate().unwrap().children[0].kind else {
            panic!("expected loop");
        };
        assert_eq!(l.cond.as_ref().unwrap().as_binary().unwrap().0, Op::Initialize);
    }

    #[test]
    fn block_scopes() {
        let source = "void main() {\nfloat a = 1.0;\n{ int a = 2; a = 3; }\na = 2.0;\nif (true) float b = 1.0;\nb = 1.0;\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert_eq!(log.lines().count(), 1, "{}", log);
        assert!(log.contains("'b' : undeclared identifier"), "{}", log);
    }

    #[test]
    fn syntax_errors_recover_per_statement() {
        let source = "void main() {\nfloat a = ;\nfloat b = 1.0 +;\na = 1.0;\n{ float c = (1.0; }\nb = 2.0;\n}\nvoid f() { }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert_eq!(log.matches("syntax error").count(), 3, "{}", log);
        assert!(log.contains("0(2): ';' : syntax error"), "{}", log);
        assert_eq!(ctx.symbol_table.current_level(), crate::symbol_table::GLOBAL_LEVEL);
        let root = root.unwrap();
        assert_eq!(root.as_aggregate().unwrap().children.len(), 2);
    }

    #[test]
    fn constructor_statements_are_expressions() {
        let source = "struct S { float x; };\nvoid main() { vec4(1.0); S(1.0); }";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
    }
}
