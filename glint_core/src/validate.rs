//! Limitations validator.
//! Checks the finished tree against the restricted loop and indexing
//! forms that make array bounds statically provable.

use crate::config::ShaderType;
use crate::error::{Diagnostics, Severity};
use crate::ir::{Aggregate, Loop, LoopKind, Node, NodeKind, Op};
use crate::symbol_table::{SymbolID, SymbolTable};
use crate::text::SourceLoc;
use crate::types::{BasicType, Qualifier};

/// Walks `root`, reporting every violation into `diagnostics`.
/// With `unroll_sampler_loops` set, loops whose index selects an element
/// of a sampler array get their `unroll` flag set.
/// Returns the number of errors reported.
pub fn validate_limitations(
    root: &mut Node,
    symbol_table: &SymbolTable,
    shader_type: ShaderType,
    unroll_sampler_loops: bool,
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut validator = Validator {
        symbol_table,
        diagnostics,
        shader_type,
        unroll_sampler_loops,
        loops: Vec::new(),
        errors: 0,
    };
    validator.node(root);
    validator.errors
}

struct LoopInfo {
    index: SymbolID,
    index_basic: BasicType,
    unroll: bool,
}

struct Validator<'v> {
    symbol_table: &'v SymbolTable,
    diagnostics: &'v mut Diagnostics,
    shader_type: ShaderType,
    unroll_sampler_loops: bool,
    /// enclosing `for` loops, innermost last
    loops: Vec<LoopInfo>,
    errors: usize,
}

impl<'v> Validator<'v> {
    fn error(&mut self, loc: SourceLoc, reason: &'static str, token: &str) {
        self.errors += 1;
        self.diagnostics.write_info(Severity::Error, loc, reason, token, "");
    }

    fn is_loop_index(&self, id: SymbolID) -> bool {
        self.loops.iter().any(|info| info.index == id)
    }

    fn node(&mut self, node: &mut Node) {
        let loc = node.loc;
        match &mut node.kind {
            NodeKind::Symbol { .. } | NodeKind::Constant(_) => {}
            NodeKind::Unary { op, operand } => {
                self.state_modification(*op, &**operand, loc);
                self.node(operand);
            }
            NodeKind::Binary { op, left, right } => {
                self.state_modification(*op, &**left, loc);
                if matches!(*op, Op::IndexDirect | Op::IndexIndirect) {
                    self.indexing(&**left, &**right);
                }
                self.node(left);
                self.node(right);
            }
            NodeKind::Aggregate(aggregate) => {
                if aggregate.op == Op::FunctionCall {
                    self.function_call(aggregate);
                }
                for child in &mut aggregate.children {
                    self.node(child);
                }
            }
            NodeKind::Selection(selection) => {
                self.node(&mut selection.cond);
                if let Some(then_branch) = &mut selection.then_branch {
                    self.node(then_branch);
                }
                if let Some(else_branch) = &mut selection.else_branch {
                    self.node(else_branch);
                }
            }
            NodeKind::Loop(node) => self.loop_statement(node, loc),
            NodeKind::Branch { value, .. } => {
                if let Some(value) = value {
                    self.node(value);
                }
            }
        }
    }

    /// Only `for` loops with a well formed header are allowed,
    /// their body is walked with the index on the loop stack.
    fn loop_statement(&mut self, node: &mut Loop, loc: SourceLoc) {
        match node.kind {
            LoopKind::For => {}
            LoopKind::While => return self.error(loc, "This type of loop is not allowed", "while"),
            LoopKind::DoWhile => return self.error(loc, "This type of loop is not allowed", "do"),
        }
        let Some((index, index_basic)) = self.for_loop_header(node, loc) else {
            return;
        };

        self.loops.push(LoopInfo { index, index_basic, unroll: false });
        if let Some(body) = &mut node.body {
            self.node(body);
        }
        if let Some(info) = self.loops.pop() {
            node.unroll |= info.unroll;
        }
    }

    fn for_loop_header(&mut self, node: &Loop, loc: SourceLoc) -> Option<(SymbolID, BasicType)> {
        let (index, basic) = self.for_loop_init(node, loc)?;
        self.for_loop_cond(node, loc, index)?;
        self.for_loop_expr(node, loc, index)?;
        Some((index, basic))
    }

    /// `int|float index = constant`
    fn for_loop_init(&mut self, node: &Loop, loc: SourceLoc) -> Option<(SymbolID, BasicType)> {
        let Some(init) = node.init.as_deref() else {
            self.error(loc, "Missing init declaration", "for");
            return None;
        };
        let declaration = init.as_aggregate().filter(|aggregate| aggregate.op == Op::Declaration);
        let initialize = match declaration.map(|aggregate| aggregate.children.as_slice()) {
            Some([child]) => child.as_binary().filter(|(op, ..)| *op == Op::Initialize),
            _ => None,
        };
        let Some((_, left, right)) = initialize else {
            self.error(init.loc, "Invalid init declaration", "for");
            return None;
        };
        let Some((index, name)) = left.as_symbol() else {
            self.error(init.loc, "Invalid init declaration", "for");
            return None;
        };

        let basic = left.ty.basic;
        if !matches!(basic, BasicType::Int | BasicType::Float) {
            self.error(left.loc, "Invalid type for loop index", basic.as_str());
            return None;
        }
        if !right.is_constant() {
            self.error(init.loc, "Loop index cannot be initialized with non-constant expression", name);
            return None;
        }
        Some((index, basic))
    }

    /// `index relop constant`
    fn for_loop_cond(&mut self, node: &Loop, loc: SourceLoc, index: SymbolID) -> Option<()> {
        let Some(cond) = node.cond.as_deref() else {
            self.error(loc, "Missing condition", "for");
            return None;
        };
        let Some((op, left, right)) = cond.as_binary() else {
            self.error(cond.loc, "Invalid condition", "for");
            return None;
        };
        let Some((id, name)) = left.as_symbol() else {
            self.error(cond.loc, "Invalid condition", "for");
            return None;
        };
        if id != index {
            self.error(left.loc, "Expected loop index", name);
            return None;
        }
        let relational = matches!(
            op,
            Op::Equal | Op::NotEqual | Op::LessThan | Op::GreaterThan | Op::LessThanEqual | Op::GreaterThanEqual
        );
        if !relational {
            self.error(cond.loc, "Invalid relational operator", op.as_str());
            return None;
        }
        if !right.is_constant() {
            self.error(cond.loc, "Loop index cannot be compared with non-constant expression", name);
            return None;
        }
        Some(())
    }

    /// `index++`, `index--`, `++index`, `--index`, `index += constant` or `index -= constant`
    fn for_loop_expr(&mut self, node: &Loop, loc: SourceLoc, index: SymbolID) -> Option<()> {
        let Some(expr) = node.expr.as_deref() else {
            self.error(loc, "Missing expression", "for");
            return None;
        };
        let (op, operand, right) = match &expr.kind {
            NodeKind::Unary { op, operand } => (*op, &**operand, None),
            NodeKind::Binary { op, left, right } => (*op, &**left, Some(&**right)),
            _ => {
                self.error(expr.loc, "Invalid expression", "for");
                return None;
            }
        };
        let Some((id, name)) = operand.as_symbol() else {
            self.error(expr.loc, "Invalid expression", "for");
            return None;
        };
        if id != index {
            self.error(operand.loc, "Expected loop index", name);
            return None;
        }

        let valid = match op {
            Op::PostIncrement | Op::PostDecrement | Op::PreIncrement | Op::PreDecrement => right.is_none(),
            Op::AddAssign | Op::SubAssign => right.is_some(),
            _ => false,
        };
        if !valid {
            self.error(expr.loc, "Invalid operator", op.as_str());
            return None;
        }
        if right.is_some_and(|right| !right.is_constant()) {
            self.error(expr.loc, "Loop index cannot be modified by non-constant expression", name);
            return None;
        }
        Some(())
    }

    fn state_modification(&mut self, op: Op, operand: &Node, loc: SourceLoc) {
        if self.loops.is_empty() || !op.modifies_state() {
            return;
        }
        if let Some((id, name)) = operand.as_symbol() {
            if self.is_loop_index(id) {
                self.error(loc, "Loop index cannot be statically assigned to within the body of the loop", name);
            }
        }
    }

    /// Index must be an integer constant-index-expression,
    /// uniforms in vertex shaders may be indexed by any integer.
    fn indexing(&mut self, base: &Node, index: &Node) {
        if !index.ty.is_scalar() || index.ty.basic != BasicType::Int {
            let ty = index.ty.complete_string();
            self.error(index.loc, "Index expression must have integral type", &ty);
        }

        let skip = self.shader_type == ShaderType::Vertex && base.ty.qualifier == Qualifier::Uniform;
        if !skip && !self.const_index_expr(index) {
            self.error(index.loc, "Index expression must be constant", "[]");
        }

        if self.unroll_sampler_loops && base.ty.is_array() && base.ty.is_sampler() {
            self.mark_sampler_loops(index);
        }
    }

    /// constants, `const` symbols and loop indices combined by any operators
    fn const_index_expr(&self, node: &Node) -> bool {
        match &node.kind {
            NodeKind::Constant(_) => true,
            NodeKind::Symbol { id, .. } => node.ty.qualifier == Qualifier::Const || self.is_loop_index(*id),
            NodeKind::Unary { operand, .. } => self.const_index_expr(operand),
            NodeKind::Binary { left, right, .. } => self.const_index_expr(left) && self.const_index_expr(right),
            NodeKind::Aggregate(aggregate) if aggregate.op == Op::FunctionCall && aggregate.user_defined => false,
            NodeKind::Aggregate(aggregate) => aggregate.children.iter().all(|child| self.const_index_expr(child)),
            NodeKind::Selection(selection) => {
                self.const_index_expr(&selection.cond)
                    && selection.then_branch.as_deref().map_or(true, |node| self.const_index_expr(node))
                    && selection.else_branch.as_deref().map_or(true, |node| self.const_index_expr(node))
            }
            NodeKind::Loop(_) | NodeKind::Branch { .. } => false,
        }
    }

    /// Flags every loop whose index is used in `index` for unrolling,
    /// float indices cannot select a sampler at all.
    fn mark_sampler_loops(&mut self, index: &Node) {
        let mut used = Vec::new();
        collect_symbols(index, &mut used);
        for (id, name, loc) in used {
            let Some(info) = self.loops.iter_mut().rev().find(|info| info.index == id) else {
                continue;
            };
            info.unroll = true;
            if info.index_basic == BasicType::Float {
                self.error(loc, "Loop index of type float cannot be used to index a sampler array", &name);
            }
        }
    }

    /// Loop indices passed to `out` or `inout` parameters could be modified by the callee.
    fn function_call(&mut self, call: &Aggregate) {
        if self.loops.is_empty() {
            return;
        }
        let loop_args: Vec<usize> = call
            .children
            .iter()
            .enumerate()
            .filter(|(_, arg)| arg.as_symbol().is_some_and(|(id, _)| self.is_loop_index(id)))
            .map(|(idx, _)| idx)
            .collect();
        if loop_args.is_empty() {
            return;
        }

        let Some(function) = self.symbol_table.find_mangled(&call.name).and_then(|id| self.symbol_table.function(id))
        else {
            log::debug!("called function `{}` not found during validation", call.name);
            return;
        };
        let name = function.name.clone();
        let out_args: Vec<SourceLoc> = loop_args
            .into_iter()
            .filter(|&idx| {
                function.params.get(idx).is_some_and(|param| {
                    matches!(param.ty.qualifier, Qualifier::Out | Qualifier::InOut)
                })
            })
            .map(|idx| call.children[idx].loc)
            .collect();
        for loc in out_args {
            self.error(loc, "Loop index cannot be used as argument to a function out or inout parameter", &name);
        }
    }
}

fn collect_symbols(node: &Node, out: &mut Vec<(SymbolID, String, SourceLoc)>) {
    match &node.kind {
        NodeKind::Symbol { id, name } => out.push((*id, name.clone(), node.loc)),
        NodeKind::Unary { operand, .. } => collect_symbols(operand, out),
        NodeKind::Binary { left, right, .. } => {
            collect_symbols(left, out);
            collect_symbols(right, out);
        }
        NodeKind::Aggregate(aggregate) => {
            for child in &aggregate.children {
                collect_symbols(child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::validate_limitations;
    use crate::config::ShaderType;
    use crate::ir::{Node, NodeKind};
    use crate::parse::tests::{main_body, parse_source};

    fn validate_with(shader: ShaderType, source: &str, unroll: bool) -> (usize, String, Node) {
        let (mut ctx, root) = parse_source(shader, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let mut root = root.unwrap();
        let errors =
            validate_limitations(&mut root, &ctx.symbol_table, shader, unroll, &mut ctx.diagnostics);
        assert_eq!(errors, ctx.num_errors());
        (errors, ctx.diagnostics.info_log().to_string(), root)
    }

    fn validate(shader: ShaderType, source: &str) -> (usize, String) {
        let (errors, log, _) = validate_with(shader, source, false);
        (errors, log)
    }

    fn main_with(body: &str) -> String {
        format!("uniform float u[4];\nvoid main() {{\nfloat a[4];\nint n = 4;\nint j = 1;\n{}\n}}", body)
    }

    #[test]
    fn canonical_for_loop_passes() {
        let (errors, log) = validate(ShaderType::Vertex, &main_with("for (int i = 0; i < 4; i++) { a[i] = 1.0; }"));
        assert_eq!(errors, 0, "{}", log);
    }

    #[test]
    fn while_loops_are_rejected() {
        let source = main_with("int i = 0;\nwhile (i < 4) { a[i] = 1.0; i++; }");
        let (errors, log) = validate(ShaderType::Vertex, &source);
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'while' : This type of loop is not allowed"), "{}", log);

        let (errors, log) = validate(ShaderType::Vertex, &main_with("do { } while (false);"));
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'do' : This type of loop is not allowed"), "{}", log);
    }

    #[test]
    fn loop_index_assignment() {
        let (errors, log) = validate(ShaderType::Vertex, &main_with("for (int i = 0; i < 4; i++) { i = 2; }"));
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'i' : Loop index cannot be statically assigned to within the body of the loop"));
    }

    #[test]
    fn non_constant_condition() {
        let (errors, log) = validate(ShaderType::Vertex, &main_with("for (int i = 0; i < n; i++) { a[i] = 1.0; }"));
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("Loop index cannot be compared with non-constant expression"), "{}", log);
    }

    #[test]
    fn user_call_is_not_a_constant_index() {
        let source = "int pick() { return 1; }\nvoid main() {\nfloat a[4];\na[pick()] = 1.0;\na[int(abs(-1.0))] = 2.0;\n}";
        let (errors, log) = validate(ShaderType::Vertex, source);
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("ERROR: 0(4): '[]' : Index expression must be constant"), "{}", log);
    }

    #[test]
    fn non_constant_index() {
        let (errors, log) = validate(ShaderType::Vertex, &main_with("for (int i = 0; i < 4; i++) { a[j] = 1.0; }"));
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'[]' : Index expression must be constant"), "{}", log);

        let (errors, log) = validate(ShaderType::Vertex, &main_with("float x = u[j];"));
        assert_eq!(errors, 0, "{}", log);

        let source = format!("precision mediump float;\n{}", main_with("float x = u[j];"));
        let (errors, log) = validate(ShaderType::Fragment, &source);
        assert_eq!(errors, 1, "{}", log);
    }

    #[test]
    fn header_shapes() {
        let cases = [
            ("int i = 0;\nfor (; i < 4; i++) { }", "'for' : Missing init declaration"),
            ("for (int i = 0, k = 0; i < 4; i++) { }", "'for' : Invalid init declaration"),
            ("for (bool b = true; b == true; ) { }", "'bool' : Invalid type for loop index"),
            ("for (int i = n; i < 4; i++) { }", "'i' : Loop index cannot be initialized with non-constant expression"),
            ("for (int i = 0; 4 > i; i++) { }", "'for' : Invalid condition"),
            ("for (int i = 0; j < 4; i++) { }", "'j' : Expected loop index"),
            ("for (int i = 0; i < 4; ) { }", "'for' : Missing expression"),
            ("for (int i = 0; i < 4; i *= 2) { }", "Invalid operator"),
            ("for (int i = 0; i < 4; i += j) { }", "'i' : Loop index cannot be modified by non-constant expression"),
        ];
        for (body, expected) in cases {
            let (errors, log) = validate(ShaderType::Vertex, &main_with(body));
            assert_eq!(errors, 1, "{}: {}", body, log);
            assert!(log.contains(expected), "{}: {}", body, log);
        }
    }

    #[test]
    fn second_pass_reports_the_same() {
        let source = main_with("for (int i = 0; i < n; i++) { a[j] = 1.0; }\nwhile (false) { }");
        let (mut ctx, root) = parse_source(ShaderType::Vertex, &source);
        let mut root = root.unwrap();
        let first = validate_limitations(&mut root, &ctx.symbol_table, ShaderType::Vertex, true, &mut ctx.diagnostics);
        let second = validate_limitations(&mut root, &ctx.symbol_table, ShaderType::Vertex, true, &mut ctx.diagnostics);
        assert_eq!(first, 2, "{}", ctx.diagnostics.info_log());
        assert_eq!(first, second);
        assert_eq!(ctx.num_errors(), 4);
    }

    #[test]
    fn float_loop_index() {
        let (errors, log) = validate(ShaderType::Vertex, &main_with("for (float f = 0.0; f < 1.0; f += 0.25) { }"));
        assert_eq!(errors, 0, "{}", log);
    }

    #[test]
    fn loop_index_as_out_argument() {
        let source = "void f(out int x) { x = 1; }\nvoid g(int x) { }\nvoid main() {\nfor (int i = 0; i < 4; i++) { f(i); g(i); }\n}";
        let (errors, log) = validate(ShaderType::Vertex, source);
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'f' : Loop index cannot be used as argument to a function out or inout parameter"), "{}", log);
    }

    fn loop_node(root: &Node) -> bool {
        let body = main_body(root);
        body.as_aggregate()
            .unwrap()
            .children
            .iter()
            .find_map(|node| match &node.kind {
                NodeKind::Loop(l) => Some(l.unroll),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn sampler_array_loops_unroll() {
        let source = "precision mediump float;\nuniform sampler2D s[2];\nvoid main() {\nvec4 c = vec4(0.0);\nfor (int i = 0; i < 2; i++) { c += texture2D(s[i], vec2(0.0)); }\ngl_FragColor = c;\n}";
        let (errors, log, root) = validate_with(ShaderType::Fragment, source, true);
        assert_eq!(errors, 0, "{}", log);
        assert!(loop_node(&root));

        let (_, _, root) = validate_with(ShaderType::Fragment, source, false);
        assert!(!loop_node(&root));
    }

    #[test]
    fn sampler_array_float_index() {
        let source = "precision mediump float;\nuniform sampler2D s[2];\nvoid main() {\nvec4 c = vec4(0.0);\nfor (float f = 0.0; f < 2.0; f++) { c += texture2D(s[int(f)], vec2(0.0)); }\ngl_FragColor = c;\n}";
        let (errors, log, root) = validate_with(ShaderType::Fragment, source, true);
        assert_eq!(errors, 1, "{}", log);
        assert!(log.contains("'f' : Loop index of type float cannot be used to index a sampler array"), "{}", log);
        assert!(loop_node(&root));
    }
}
