//! Flattens constant constructor trees into component arrays.

use crate::error::{Error, ErrorSink};
use crate::ir::{ConstValue, Node, NodeKind, Op};
use crate::types::{BasicType, Type};
use std::rc::Rc;

/// Evaluates `root`, a constructor aggregate whose operands are constants,
/// into the components of `target`.
/// `single_param` selects splat semantics for a lone scalar operand,
/// the diagonal of a matrix for matrix constructors.
pub fn parse_const_tree(
    root: &Node,
    target: &Type,
    constructor: Op,
    single_param: bool,
    errors: &mut impl ErrorSink,
) -> Result<Rc<[ConstValue]>, ()> {
    let size = target.object_size();
    let mut walk = ConstWalk {
        values: vec![ConstValue::zero(target.basic); size],
        index: 0,
        target,
        splat: None,
    };
    if single_param {
        walk.splat = Some(Splat::new(constructor, target));
    }
    walk.node(root, errors)?;
    Ok(walk.values.into())
}

struct ConstWalk<'t> {
    values: Vec<ConstValue>,
    index: usize,
    target: &'t Type,
    splat: Option<Splat>,
}

/// fill state for a constructor with a single operand
#[derive(Copy, Clone)]
struct Splat {
    size: usize,
    matrix: Option<usize>,
}

impl Splat {
    fn new(constructor: Op, ty: &Type) -> Splat {
        let matrix = constructor.is_matrix_constructor().then(|| ty.nominal_size());
        Splat { size: ty.object_size(), matrix }
    }
}

impl<'t> ConstWalk<'t> {
    fn node(&mut self, node: &Node, errors: &mut impl ErrorSink) -> Result<(), ()> {
        match &node.kind {
            NodeKind::Constant(values) => {
                self.constant(values, &node.ty);
                Ok(())
            }
            NodeKind::Aggregate(aggregate) => {
                if !aggregate.op.is_constructor() && aggregate.op != Op::Comma {
                    return Err(self.non_constant(node, errors));
                }
                if aggregate.children.is_empty() {
                    return Err(());
                }

                let outer = self.splat;
                let single = aggregate.children.len() == 1 && aggregate.children[0].is_constant();
                if single {
                    self.splat = Some(Splat::new(aggregate.op, &node.ty));
                }
                for child in &aggregate.children {
                    if aggregate.op == Op::Comma {
                        self.index = 0;
                    }
                    self.node(child, errors)?;
                }
                self.splat = if single { None } else { outer };
                Ok(())
            }
            NodeKind::Unary { .. } | NodeKind::Binary { .. } | NodeKind::Symbol { .. } => {
                Err(self.non_constant(node, errors))
            }
            NodeKind::Selection(_) | NodeKind::Loop(_) | NodeKind::Branch { .. } => {
                unreachable!("statement node in constant initializer at {}", node.loc)
            }
        }
    }

    fn non_constant(&self, node: &Node, errors: &mut impl ErrorSink) {
        let msg = format!("assigning non-constant to {}", self.target.complete_string());
        errors.error(Error::new(node.loc, msg, "constructor", ""));
    }

    fn constant(&mut self, source: &[ConstValue], source_ty: &Type) {
        let capacity = self.values.len();
        let basic = self.target.basic;

        match self.splat {
            Some(splat) if source.len() == 1 => {
                let end = (self.index + splat.size).min(capacity);
                let start = self.index;
                for i in start..end {
                    self.values[i] = match splat.matrix {
                        // only the diagonal takes the value, the rest is zero
                        Some(n) if (i - start) % (n + 1) != 0 => ConstValue::zero(BasicType::Float),
                        _ => cast(source[0], basic),
                    };
                }
                self.index = end;
            }
            Some(Splat { matrix: Some(n), .. }) if source_ty.is_matrix() => {
                // matrix from matrix: copy the overlap, identity elsewhere
                let m = source_ty.nominal_size();
                for col in 0..n {
                    for row in 0..n {
                        let value = if col < m && row < m {
                            cast(source[col * m + row], basic)
                        } else if col == row {
                            ConstValue::Float(1.0)
                        } else {
                            ConstValue::Float(0.0)
                        };
                        if let Some(slot) = self.values.get_mut(self.index + col * n + row) {
                            *slot = value;
                        }
                    }
                }
                self.index = (self.index + n * n).min(capacity);
            }
            _ => {
                for value in source {
                    if self.index >= capacity {
                        return;
                    }
                    self.values[self.index] = cast(*value, basic);
                    self.index += 1;
                }
            }
        }
    }
}

/// struct targets keep each operand's own representation
fn cast(value: ConstValue, basic: BasicType) -> ConstValue {
    match basic {
        BasicType::Struct => value,
        _ => value.cast(basic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorBuffer;
    use crate::ir::Aggregate;
    use crate::text::SourceLoc;
    use crate::types::{Precision, Qualifier};

    fn loc() -> SourceLoc {
        SourceLoc::new(0, 1)
    }

    fn constructor(op: Op, ty: &Type, children: Vec<Node>) -> Node {
        let mut aggregate = Aggregate::new(op);
        aggregate.children = children;
        Node::aggregate(aggregate, ty.clone(), loc())
    }

    fn mat(size: u8) -> Type {
        Type::new(BasicType::Float, Precision::Undefined, Qualifier::Temporary, size, true)
    }

    fn evaluate(op: Op, ty: &Type, children: Vec<Node>) -> Vec<f32> {
        let single = children.len() == 1;
        let root = constructor(op, ty, children);
        let mut errors = ErrorBuffer::default();
        let values = parse_const_tree(&root, ty, op, single, &mut errors).ok().unwrap();
        values.iter().map(|v| v.as_float()).collect()
    }

    #[test]
    fn scalar_splats_into_vector() {
        let vec4 = Type::vector(BasicType::Float, 4);
        let values = evaluate(Op::ConstructVec4, &vec4, vec![Node::const_float(1.0, loc())]);
        assert_eq!(values, vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn scalar_fills_matrix_diagonal() {
        let values = evaluate(Op::ConstructMat2, &mat(2), vec![Node::const_float(1.0, loc())]);
        assert_eq!(values, vec![1.0, 0.0, 0.0, 1.0]);
        let values = evaluate(Op::ConstructMat3, &mat(3), vec![Node::const_float(2.0, loc())]);
        assert_eq!(values, vec![2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn matrix_from_smaller_matrix() {
        let inner = Node::constant(
            [1.0, 2.0, 3.0, 4.0].map(ConstValue::Float).into(),
            mat(2).with_qualifier(Qualifier::Const),
            loc(),
        );
        let values = evaluate(Op::ConstructMat3, &mat(3), vec![inner]);
        assert_eq!(values, vec![1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn operands_concatenate_and_convert() {
        let vec3 = Type::vector(BasicType::Float, 3);
        let root = constructor(
            Op::ConstructVec3,
            &vec3,
            vec![Node::const_int(1, loc()), Node::const_float(2.5, loc()), Node::const_bool(true, loc())],
        );
        let mut errors = ErrorBuffer::default();
        let values = parse_const_tree(&root, &vec3, Op::ConstructVec3, false, &mut errors).ok().unwrap();
        assert_eq!(&values[..], &[ConstValue::Float(1.0), ConstValue::Float(2.5), ConstValue::Float(1.0)]);
    }

    #[test]
    fn extra_components_are_dropped() {
        let vec2 = Type::vector(BasicType::Float, 2);
        let big = Node::constant(
            [1.0, 2.0, 3.0].map(ConstValue::Float).into(),
            Type::vector(BasicType::Float, 3).with_qualifier(Qualifier::Const),
            loc(),
        );
        let values = evaluate(Op::ConstructVec2, &vec2, vec![big]);
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn non_constant_operand_fails() {
        let float = Type::scalar(BasicType::Float, Qualifier::Temporary);
        let symbol = Node::symbol(crate::symbol_table::SymbolID::dummy(), "x", float.clone(), loc());
        let root = constructor(Op::ConstructFloat, &float, vec![symbol]);
        let mut errors = ErrorBuffer::default();
        assert!(parse_const_tree(&root, &float, Op::ConstructFloat, true, &mut errors).is_err());
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    #[should_panic(expected = "statement node in constant initializer")]
    fn statement_node_is_internal_failure() {
        let float = Type::scalar(BasicType::Float, Qualifier::Const);
        let branch = crate::intermediate::add_branch(crate::ir::BranchKind::Break, None, loc());
        let root = constructor(Op::ConstructFloat, &float, vec![branch]);
        let mut errors = ErrorBuffer::default();
        let _ = parse_const_tree(&root, &float, Op::ConstructFloat, true, &mut errors);
    }
}
