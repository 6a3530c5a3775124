use crate::ir::{BranchKind, LoopKind, Node, NodeKind, Op};
use std::fmt::Write;

/// Indented dump of the tree, one node per line prefixed by its source line.
pub fn tree_display(root: &Node) -> String {
    let mut buf = String::with_capacity(1024);
    node_display(&mut buf, root, 0);
    buf
}

fn node_display(buf: &mut String, node: &Node, depth: u32) {
    line_prefix(buf, node, depth);
    let ty = node.ty.complete_string();

    match &node.kind {
        NodeKind::Symbol { name, .. } => {
            let _ = writeln!(buf, "'{}' ({})", name, ty);
        }
        NodeKind::Constant(values) => {
            let _ = writeln!(buf, "Constant union ({})", ty);
            for value in values.iter() {
                line_prefix(buf, node, depth + 1);
                let _ = writeln!(buf, "{} ({})", value, node.ty.basic_string());
            }
        }
        NodeKind::Unary { op, operand } => {
            let _ = writeln!(buf, "{} ({})", op_label(*op), ty);
            node_display(buf, operand, depth + 1);
        }
        NodeKind::Binary { op, left, right } => {
            let _ = writeln!(buf, "{} ({})", op_label(*op), ty);
            node_display(buf, left, depth + 1);
            node_display(buf, right, depth + 1);
        }
        NodeKind::Aggregate(aggregate) => {
            match aggregate.op {
                Op::Function | Op::FunctionCall | Op::Prototype => {
                    let _ = writeln!(buf, "{}: {} ({})", aggregate.op.as_str(), aggregate.name, ty);
                }
                Op::Sequence | Op::Parameters | Op::Declaration | Op::InvariantDeclaration | Op::Null => {
                    let _ = writeln!(buf, "{}", op_label(aggregate.op));
                }
                op => {
                    let _ = writeln!(buf, "{} ({})", op_label(op), ty);
                }
            }
            for child in &aggregate.children {
                node_display(buf, child, depth + 1);
            }
        }
        NodeKind::Selection(selection) => {
            let _ = writeln!(buf, "Test condition and select ({})", ty);
            section(buf, node, depth + 1, "Condition", Some(&selection.cond));
            section(buf, node, depth + 1, "true case", selection.then_branch.as_deref());
            if selection.else_branch.is_some() {
                section(buf, node, depth + 1, "false case", selection.else_branch.as_deref());
            }
        }
        NodeKind::Loop(l) => {
            let tested = match l.kind {
                LoopKind::For | LoopKind::While => "first",
                LoopKind::DoWhile => "last",
            };
            let unroll = if l.unroll { " (unroll)" } else { "" };
            let _ = writeln!(buf, "Loop with condition tested {}{}", tested, unroll);
            if l.init.is_some() {
                section(buf, node, depth + 1, "Loop Init", l.init.as_deref());
            }
            section(buf, node, depth + 1, "Loop Condition", l.cond.as_deref());
            section(buf, node, depth + 1, "Loop Body", l.body.as_deref());
            if l.expr.is_some() {
                section(buf, node, depth + 1, "Loop Terminal Expression", l.expr.as_deref());
            }
        }
        NodeKind::Branch { kind, value } => {
            let kind = match kind {
                BranchKind::Discard => "Kill",
                BranchKind::Return => "Return",
                BranchKind::Break => "Break",
                BranchKind::Continue => "Continue",
            };
            match value {
                Some(value) => {
                    let _ = writeln!(buf, "Branch: {} with expression", kind);
                    node_display(buf, value, depth + 1);
                }
                None => {
                    let _ = writeln!(buf, "Branch: {}", kind);
                }
            }
        }
    }
}

fn section(buf: &mut String, parent: &Node, depth: u32, label: &str, child: Option<&Node>) {
    line_prefix(buf, parent, depth);
    match child {
        Some(child) => {
            let _ = writeln!(buf, "{}", label);
            node_display(buf, child, depth + 1);
        }
        None => {
            let _ = writeln!(buf, "{}: No node", label);
        }
    }
}

fn line_prefix(buf: &mut String, node: &Node, depth: u32) {
    let _ = write!(buf, "{}: ", node.loc);
    for _ in 0..depth {
        buf.push_str("  ");
    }
}

fn op_label(op: Op) -> &'static str {
    match op {
        Op::Negative => "Negate value",
        Op::Initialize => "initialize first child with second child",
        Op::Assign => "move second child to first child",
        Op::IndexDirect => "direct index",
        Op::IndexIndirect => "indirect index",
        Op::IndexDirectStruct => "direct index for structure",
        Op::VectorSwizzle => "vector swizzle",
        Op::Comma => "comma",
        _ => op.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::tree_display;
    use crate::config::ShaderType;
    use crate::parse::tests::parse_source;

    #[test]
    fn dumps_functions_and_statements() {
        let source = "\
void main() {
    float x = 1.0;
    if (x > 0.5) {
        gl_Position = vec4(x);
    }
}";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let dump = tree_display(&root.unwrap());
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines[0], "0(1): Sequence");
        assert_eq!(lines[1], "0(1):   Function Definition: main( (void)");
        assert!(dump.contains("Test condition and select (void)"), "{}", dump);
        assert!(dump.contains("'gl_Position' ("), "{}", dump);
        assert!(dump.contains("initialize first child with second child"), "{}", dump);
    }

    #[test]
    fn dumps_loops_and_branches() {
        let source = "void main() { for (int i = 0; i < 2; i++) { if (i == 1) break; } }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let dump = tree_display(&root.unwrap());
        assert!(dump.contains("Loop with condition tested first"), "{}", dump);
        assert!(dump.contains("Loop Init"), "{}", dump);
        assert!(dump.contains("Loop Terminal Expression"), "{}", dump);
        assert!(dump.contains("Branch: Break"), "{}", dump);
        assert!(!dump.contains("false case"), "{}", dump);
    }

    #[test]
    fn constants_list_every_component() {
        let (_, root) = parse_source(ShaderType::Vertex, "const vec2 v = vec2(1.0, 2.0);\nvoid main() { gl_Position = vec4(v, 0.0, 1.0); }");
        let dump = tree_display(&root.unwrap());
        assert!(dump.contains("Constant union (const "), "{}", dump);
        assert!(dump.contains("4-component vector of float)"), "{}", dump);
        assert!(dump.contains("1.0 (float)"), "{}", dump);
        assert!(dump.contains("2.0 (float)"), "{}", dump);
        assert!(dump.contains("0.0 (float)"), "{}", dump);
    }
}
