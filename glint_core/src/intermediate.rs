//! Tree building helpers used by the parse context.
//! Each `add_*` function type checks its operands, folds constants where
//! possible and hands the operands back on failure so callers can recover.

use crate::error::{Diagnostics, Severity};
use crate::ir::{Aggregate, BranchKind, ConstValue, Loop, LoopKind, Node, NodeKind, Op, Selection};
use crate::text::SourceLoc;
use crate::types::{BasicType, Precision, Qualifier, Type};
use std::cmp::Ordering;
use std::rc::Rc;

pub fn add_binary_math(
    op: Op,
    left: Node,
    right: Node,
    loc: SourceLoc,
    diagnostics: &mut Diagnostics,
) -> Result<Node, (Node, Node)> {
    let lty = &left.ty;
    let rejected = match op {
        Op::Equal | Op::NotEqual => lty.is_array(),
        Op::LessThan | Op::GreaterThan | Op::LessThanEqual | Op::GreaterThanEqual => {
            lty.is_matrix() || lty.is_array() || lty.is_vector() || lty.basic == BasicType::Struct
        }
        Op::LogicalOr | Op::LogicalXor | Op::LogicalAnd => {
            lty.basic != BasicType::Bool || lty.is_matrix() || lty.is_array() || lty.is_vector()
        }
        Op::Add | Op::Sub | Op::Div | Op::Mul => {
            lty.basic == BasicType::Struct || lty.basic == BasicType::Bool
        }
        _ => false,
    };
    if rejected || left.basic() != right.basic() {
        return Err((left, right));
    }

    let Some((op, ty)) = promote_binary(op, &left.ty, &right.ty) else {
        return Err((left, right));
    };

    if let (Some(lv), Some(rv)) = (left.as_constant(), right.as_constant()) {
        if let Some(folded) = fold_binary(op, lv, &left.ty, rv, &ty, loc, diagnostics) {
            return Ok(folded);
        }
    }

    let kind = NodeKind::Binary { op, left: Box::new(left), right: Box::new(right) };
    Ok(Node::new(kind, ty, loc))
}

pub fn add_assign(op: Op, left: Node, right: Node, loc: SourceLoc) -> Result<Node, (Node, Node)> {
    if (left.ty.structure.is_some() || right.ty.structure.is_some()) && left.ty != right.ty {
        return Err((left, right));
    }
    let Some((op, ty)) = promote_binary(op, &left.ty, &right.ty) else {
        return Err((left, right));
    };
    let kind = NodeKind::Binary { op, left: Box::new(left), right: Box::new(right) };
    Ok(Node::new(kind, ty, loc))
}

/// index node, the caller assigns the element type
pub fn add_index(op: Op, base: Node, index: Node, loc: SourceLoc) -> Node {
    let ty = base.ty.clone();
    let kind = NodeKind::Binary { op, left: Box::new(base), right: Box::new(index) };
    Node::new(kind, ty, loc)
}

pub fn add_unary_math(op: Op, child: Node, loc: SourceLoc) -> Result<Node, Node> {
    let cty = &child.ty;
    let rejected = match op {
        Op::LogicalNot => {
            cty.basic != BasicType::Bool || cty.is_matrix() || cty.is_array() || cty.is_vector()
        }
        Op::PostIncrement
        | Op::PreIncrement
        | Op::PostDecrement
        | Op::PreDecrement
        | Op::Negative => cty.basic == BasicType::Struct || cty.is_array(),
        _ => false,
    };
    if rejected {
        return Err(child);
    }

    let accepted = match op {
        Op::LogicalNot => cty.basic == BasicType::Bool,
        Op::Negative | Op::PostIncrement | Op::PostDecrement | Op::PreIncrement | Op::PreDecrement => {
            cty.basic != BasicType::Bool
        }
        // built-ins already matched their prototype
        Op::Any | Op::All | Op::VectorLogicalNot => true,
        _ => cty.basic == BasicType::Float,
    };
    if !accepted {
        return Err(child);
    }

    if let Some(values) = child.as_constant() {
        if let Some(folded) = fold_unary(op, values) {
            return Ok(Node::constant(folded, child.ty.clone(), loc));
        }
    }

    let ty = child.ty.clone().with_qualifier(Qualifier::Temporary);
    Ok(Node::new(NodeKind::Unary { op, operand: Box::new(child) }, ty, loc))
}

/// comma operator, two constants reduce to the right one
pub fn add_comma(left: Node, right: Node, loc: SourceLoc) -> Node {
    if left.ty.is_const() && right.ty.is_const() {
        return right;
    }
    let ty = right.ty.clone().with_qualifier(Qualifier::Temporary);
    let mut aggregate = Aggregate::new(Op::Comma);
    aggregate.children.push(left);
    aggregate.children.push(right);
    Node::aggregate(aggregate, ty, loc)
}

/// `?:` expression, operand types are checked by the caller
pub fn add_selection(cond: Node, true_node: Node, false_node: Node, loc: SourceLoc) -> Node {
    if let (Some(value), true, true) =
        (cond.const_value(), true_node.is_constant(), false_node.is_constant())
    {
        return if value.as_bool() { true_node } else { false_node };
    }
    let ty = true_node.ty.clone().with_qualifier(Qualifier::Temporary);
    let selection = Selection {
        cond: Box::new(cond),
        then_branch: Some(Box::new(true_node)),
        else_branch: Some(Box::new(false_node)),
    };
    Node::new(NodeKind::Selection(selection), ty, loc)
}

/// right operand of a swizzle, the selected component offsets
pub fn add_swizzle(offsets: &[usize], loc: SourceLoc) -> Node {
    let mut aggregate = Aggregate::new(Op::Sequence);
    for &offset in offsets {
        aggregate.children.push(Node::const_int(offset as i32, loc));
    }
    Node::aggregate(aggregate, Type::void(), loc)
}

/// appends `right` to `left` when `left` is an operator-less aggregate,
/// otherwise starts a new aggregate holding both
pub fn grow_aggregate(left: Option<Node>, right: Option<Node>, loc: SourceLoc) -> Option<Node> {
    if left.is_none() && right.is_none() {
        return None;
    }
    let mut node = match left {
        Some(left) if left.as_aggregate().is_some_and(|a| a.op == Op::Null) => left,
        Some(left) => {
            let mut aggregate = Aggregate::new(Op::Null);
            let loc = left.loc;
            aggregate.children.push(left);
            Node::aggregate(aggregate, Type::void(), loc)
        }
        None => Node::aggregate(Aggregate::new(Op::Null), Type::void(), loc),
    };
    if let (Some(right), Some(aggregate)) = (right, node.as_aggregate_mut()) {
        aggregate.children.push(right);
    }
    Some(node)
}

pub fn make_aggregate(node: Option<Node>, loc: SourceLoc) -> Option<Node> {
    let node = node?;
    let mut aggregate = Aggregate::new(Op::Null);
    aggregate.children.push(node);
    Some(Node::aggregate(aggregate, Type::void(), loc))
}

/// gives `node` the operator `op`, wrapping it when it is not an open aggregate
pub fn set_aggregate_operator(node: Option<Node>, op: Op, loc: SourceLoc) -> Node {
    let mut node = match node {
        Some(node) if node.as_aggregate().is_some_and(|a| a.op == Op::Null) => node,
        Some(node) => {
            let mut aggregate = Aggregate::new(Op::Null);
            aggregate.children.push(node);
            Node::aggregate(aggregate, Type::void(), loc)
        }
        None => Node::aggregate(Aggregate::new(Op::Null), Type::void(), loc),
    };
    if let Some(aggregate) = node.as_aggregate_mut() {
        aggregate.op = op;
    }
    node.loc = loc;
    node
}

pub fn add_if(cond: Node, then_branch: Option<Node>, else_branch: Option<Node>, loc: SourceLoc) -> Node {
    let selection = Selection {
        cond: Box::new(cond),
        then_branch: then_branch.map(Box::new),
        else_branch: else_branch.map(Box::new),
    };
    Node::new(NodeKind::Selection(selection), Type::void(), loc)
}

pub fn add_loop(
    kind: LoopKind,
    init: Option<Node>,
    cond: Option<Node>,
    expr: Option<Node>,
    body: Option<Node>,
    loc: SourceLoc,
) -> Node {
    let node = Loop {
        kind,
        init: init.map(Box::new),
        cond: cond.map(Box::new),
        expr: expr.map(Box::new),
        body: body.map(Box::new),
        unroll: false,
    };
    Node::new(NodeKind::Loop(node), Type::void(), loc)
}

pub fn add_branch(kind: BranchKind, value: Option<Node>, loc: SourceLoc) -> Node {
    let kind = NodeKind::Branch { kind, value: value.map(Box::new) };
    Node::new(kind, Type::void(), loc)
}

/// result operator and type of a binary operation,
/// `None` when the operand shapes cannot be combined
fn promote_binary(op: Op, left: &Type, right: &Type) -> Option<(Op, Type)> {
    if left.is_array() || right.is_array() || left.basic != right.basic {
        return None;
    }

    let precision = left.precision.higher(right.precision);
    let mut ty = left.clone().with_precision(precision);
    if !(left.is_const() && right.is_const()) {
        ty.qualifier = Qualifier::Temporary;
    }
    let bool_ty = Type::scalar(BasicType::Bool, Qualifier::Temporary);
    let size = left.size.max(right.size);

    if size == 1 {
        return match op {
            Op::Equal
            | Op::NotEqual
            | Op::LessThan
            | Op::GreaterThan
            | Op::LessThanEqual
            | Op::GreaterThanEqual => Some((op, bool_ty)),
            Op::LogicalAnd | Op::LogicalOr | Op::LogicalXor => {
                if left.basic != BasicType::Bool {
                    return None;
                }
                Some((op, bool_ty))
            }
            _ => Some((op, ty)),
        };
    }

    if left.size != right.size {
        if left.size != 1 && right.size != 1 {
            return None;
        }
        if op == Op::Assign || op == Op::Initialize {
            return None;
        }
    }

    let basic = left.basic;
    let temp = |matrix: bool| Type::new(basic, precision, Qualifier::Temporary, size, matrix);
    let (lmat, rmat) = (left.is_matrix(), right.is_matrix());
    let mismatched = (lmat && right.is_vector()) || (left.is_vector() && rmat);

    match op {
        Op::Mul => Some(match (lmat, rmat) {
            (false, true) if left.is_vector() => (Op::VectorTimesMatrix, ty),
            (false, true) => (Op::MatrixTimesScalar, temp(true)),
            (true, false) if right.is_vector() => (Op::MatrixTimesVector, temp(false)),
            (true, false) => (Op::MatrixTimesScalar, ty),
            (true, true) => (Op::MatrixTimesMatrix, ty),
            (false, false) if left.is_vector() && right.is_vector() => (Op::Mul, ty),
            (false, false) => (Op::VectorTimesScalar, temp(false)),
        }),
        Op::MulAssign => match (lmat, rmat) {
            (false, true) if left.is_vector() => Some((Op::VectorTimesMatrixAssign, ty)),
            (false, true) => None,
            (true, false) if right.is_vector() => None,
            (true, false) => Some((Op::MatrixTimesScalarAssign, ty)),
            (true, true) => Some((Op::MatrixTimesMatrixAssign, ty)),
            (false, false) if left.is_vector() && right.is_vector() => Some((Op::MulAssign, ty)),
            (false, false) if !left.is_vector() => None,
            (false, false) => Some((Op::VectorTimesScalarAssign, temp(false))),
        },
        Op::Assign
        | Op::Initialize
        | Op::Add
        | Op::Sub
        | Op::Div
        | Op::AddAssign
        | Op::SubAssign
        | Op::DivAssign => {
            if mismatched {
                return None;
            }
            Some((op, temp(lmat || rmat)))
        }
        Op::Equal
        | Op::NotEqual
        | Op::LessThan
        | Op::GreaterThan
        | Op::LessThanEqual
        | Op::GreaterThanEqual => {
            if mismatched {
                return None;
            }
            Some((op, bool_ty))
        }
        _ => None,
    }
}

fn fold_unary(op: Op, values: &[ConstValue]) -> Option<Rc<[ConstValue]>> {
    let mut folded = Vec::with_capacity(values.len());
    for value in values {
        folded.push(match (op, *value) {
            (Op::Negative, ConstValue::Float(v)) => ConstValue::Float(-v),
            (Op::Negative, ConstValue::Int(v)) => ConstValue::Int(v.wrapping_neg()),
            (Op::LogicalNot, ConstValue::Bool(v)) => ConstValue::Bool(!v),
            _ => return None,
        });
    }
    Some(folded.into())
}

fn fold_binary(
    op: Op,
    left: &[ConstValue],
    left_ty: &Type,
    right: &[ConstValue],
    result_ty: &Type,
    loc: SourceLoc,
    diagnostics: &mut Diagnostics,
) -> Option<Node> {
    // a scalar operand is applied to every component of the other
    let (left, right): (Vec<ConstValue>, Vec<ConstValue>) = match (left.len(), right.len()) {
        (l, 1) if l > 1 => (left.to_vec(), vec![right[0]; l]),
        (1, r) if r > 1 => (vec![left[0]; r], right.to_vec()),
        _ => (left.to_vec(), right.to_vec()),
    };
    let n = left_ty.nominal_size();
    let bool_node = |value: bool| Node::const_bool(value, loc);

    let values: Vec<ConstValue> = match op {
        Op::Add | Op::Sub | Op::Mul | Op::VectorTimesScalar | Op::MatrixTimesScalar => {
            left.iter().zip(&right).map(|(&l, &r)| arithmetic(op, l, r)).collect()
        }
        Op::Div => left
            .iter()
            .zip(&right)
            .map(|(&l, &r)| divide(l, r, loc, diagnostics))
            .collect(),
        Op::MatrixTimesMatrix => {
            let mut values = vec![ConstValue::Float(0.0); n * n];
            for row in 0..n {
                for col in 0..n {
                    let sum = (0..n).map(|i| left[i * n + row].as_float() * right[col * n + i].as_float()).sum();
                    values[n * col + row] = ConstValue::Float(sum);
                }
            }
            values
        }
        Op::MatrixTimesVector => (0..n)
            .map(|i| ConstValue::Float((0..n).map(|j| left[j * n + i].as_float() * right[j].as_float()).sum()))
            .collect(),
        Op::VectorTimesMatrix => (0..n)
            .map(|i| ConstValue::Float((0..n).map(|j| left[j].as_float() * right[i * n + j].as_float()).sum()))
            .collect(),
        Op::LogicalAnd => return Some(bool_node(left[0].as_bool() && right[0].as_bool())),
        Op::LogicalOr => return Some(bool_node(left[0].as_bool() || right[0].as_bool())),
        Op::LogicalXor => return Some(bool_node(left[0].as_bool() != right[0].as_bool())),
        Op::LessThan => return Some(bool_node(compare(left[0], right[0]) == Ordering::Less)),
        Op::GreaterThan => return Some(bool_node(compare(left[0], right[0]) == Ordering::Greater)),
        Op::LessThanEqual => return Some(bool_node(compare(left[0], right[0]) != Ordering::Greater)),
        Op::GreaterThanEqual => return Some(bool_node(compare(left[0], right[0]) != Ordering::Less)),
        Op::Equal => return Some(bool_node(left == right)),
        Op::NotEqual => return Some(bool_node(left != right)),
        _ => return None,
    };

    let ty = result_ty.clone().with_qualifier(Qualifier::Const);
    Some(Node::constant(values.into(), ty, loc))
}

fn arithmetic(op: Op, left: ConstValue, right: ConstValue) -> ConstValue {
    match (left, right) {
        (ConstValue::Float(l), ConstValue::Float(r)) => ConstValue::Float(match op {
            Op::Add => l + r,
            Op::Sub => l - r,
            _ => l * r,
        }),
        (ConstValue::Int(l), ConstValue::Int(r)) => ConstValue::Int(match op {
            Op::Add => l.wrapping_add(r),
            Op::Sub => l.wrapping_sub(r),
            _ => l.wrapping_mul(r),
        }),
        _ => left,
    }
}

fn divide(left: ConstValue, right: ConstValue, loc: SourceLoc, diagnostics: &mut Diagnostics) -> ConstValue {
    const DIVIDE_BY_ZERO: &str = "Divide by zero error during constant folding";
    match (left, right) {
        (ConstValue::Float(l), ConstValue::Float(r)) => {
            if r == 0.0 {
                diagnostics.write_info(Severity::Warning, loc, DIVIDE_BY_ZERO, "/", "");
                ConstValue::Float(if l < 0.0 { -f32::MAX } else { f32::MAX })
            } else {
                ConstValue::Float(l / r)
            }
        }
        (ConstValue::Int(l), ConstValue::Int(r)) => {
            if r == 0 {
                diagnostics.write_info(Severity::Error, loc, DIVIDE_BY_ZERO, "/", "");
                ConstValue::Int(i32::MAX)
            } else {
                ConstValue::Int(l.wrapping_div(r))
            }
        }
        _ => left,
    }
}

fn compare(left: ConstValue, right: ConstValue) -> Ordering {
    match (left, right) {
        (ConstValue::Float(l), ConstValue::Float(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        (ConstValue::Int(l), ConstValue::Int(r)) => l.cmp(&r),
        (ConstValue::Bool(l), ConstValue::Bool(r)) => l.cmp(&r),
        _ => Ordering::Equal,
    }
}

/// const node of `ty` holding `values`
pub fn add_constant(values: Rc<[ConstValue]>, ty: Type, loc: SourceLoc) -> Node {
    Node::constant(values, ty.with_qualifier(Qualifier::Const), loc)
}

/// type of a literal constant, precision is left for the context to resolve
pub fn literal_type(basic: BasicType) -> Type {
    Type::new(basic, Precision::Undefined, Qualifier::Const, 1, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLoc {
        SourceLoc::new(0, 1)
    }

    fn vec_const(values: &[f32]) -> Node {
        let ty = Type::vector(BasicType::Float, values.len() as u8).with_qualifier(Qualifier::Const);
        let values: Vec<ConstValue> = values.iter().map(|v| ConstValue::Float(*v)).collect();
        Node::constant(values.into(), ty, loc())
    }

    fn mat2_const(values: [f32; 4]) -> Node {
        let ty = Type::new(BasicType::Float, Precision::Undefined, Qualifier::Const, 2, true);
        let values: Vec<ConstValue> = values.iter().map(|v| ConstValue::Float(*v)).collect();
        Node::constant(values.into(), ty, loc())
    }

    fn floats(node: &Node) -> Vec<f32> {
        node.as_constant().unwrap().iter().map(|v| v.as_float()).collect()
    }

    fn temp(basic: BasicType, size: u8, matrix: bool) -> Node {
        let ty = Type::new(basic, Precision::Undefined, Qualifier::Temporary, size, matrix);
        Node::symbol(crate::symbol_table::SymbolID::dummy(), "t", ty, loc())
    }

    #[test]
    fn folds_scalar_vector_arithmetic() {
        let mut diagnostics = Diagnostics::new();
        let node = add_binary_math(Op::Mul, vec_const(&[1.0, 2.0]), Node::const_float(3.0, loc()), loc(), &mut diagnostics)
            .ok()
            .unwrap();
        assert_eq!(floats(&node), vec![3.0, 6.0]);
        assert!(node.ty.is_const());
        assert_eq!(node.ty.size, 2);

        let node = add_binary_math(Op::Sub, Node::const_float(1.0, loc()), vec_const(&[1.0, 2.0]), loc(), &mut diagnostics)
            .ok()
            .unwrap();
        assert_eq!(floats(&node), vec![0.0, -1.0]);
    }

    #[test]
    fn folds_matrix_products() {
        let mut diagnostics = Diagnostics::new();
        let m = mat2_const([1.0, 2.0, 3.0, 4.0]);
        let v = vec_const(&[1.0, 1.0]);
        let node = add_binary_math(Op::Mul, m.clone(), v.clone(), loc(), &mut diagnostics).ok().unwrap();
        assert_eq!(floats(&node), vec![4.0, 6.0]);
        let node = add_binary_math(Op::Mul, v, m.clone(), loc(), &mut diagnostics).ok().unwrap();
        assert_eq!(floats(&node), vec![3.0, 7.0]);
        let node = add_binary_math(Op::Mul, m.clone(), m, loc(), &mut diagnostics).ok().unwrap();
        assert_eq!(floats(&node), vec![7.0, 10.0, 15.0, 22.0]);
    }

    #[test]
    fn integer_divide_by_zero_is_an_error() {
        let mut diagnostics = Diagnostics::new();
        let node = add_binary_math(Op::Div, Node::const_int(1, loc()), Node::const_int(0, loc()), loc(), &mut diagnostics)
            .ok()
            .unwrap();
        assert_eq!(node.const_value(), Some(ConstValue::Int(i32::MAX)));
        assert_eq!(diagnostics.num_errors(), 1);

        add_binary_math(Op::Div, Node::const_float(-1.0, loc()), Node::const_float(0.0, loc()), loc(), &mut diagnostics)
            .ok()
            .unwrap();
        assert_eq!(diagnostics.num_errors(), 1);
        assert_eq!(diagnostics.num_warnings(), 1);
    }

    #[test]
    fn rejects_mismatched_operands() {
        let mut diagnostics = Diagnostics::new();
        let float = temp(BasicType::Float, 1, false);
        let int = temp(BasicType::Int, 1, false);
        assert!(add_binary_math(Op::Add, float.clone(), int, loc(), &mut diagnostics).is_err());

        let vec3 = temp(BasicType::Float, 3, false);
        let vec2 = temp(BasicType::Float, 2, false);
        assert!(add_binary_math(Op::Add, vec3.clone(), vec2, loc(), &mut diagnostics).is_err());
        assert!(add_binary_math(Op::LessThan, vec3.clone(), vec3.clone(), loc(), &mut diagnostics).is_err());

        let mat3 = temp(BasicType::Float, 3, true);
        assert!(add_binary_math(Op::Add, mat3.clone(), vec3.clone(), loc(), &mut diagnostics).is_err());
        let node = add_binary_math(Op::Mul, mat3, vec3.clone(), loc(), &mut diagnostics).ok().unwrap();
        assert_eq!(node.as_binary().unwrap().0, Op::MatrixTimesVector);
        assert!(node.ty.is_vector());

        assert!(add_assign(Op::Assign, vec3, float, loc()).is_err());
        assert_eq!(diagnostics.num_errors(), 0);
    }

    #[test]
    fn comparisons_yield_bool() {
        let mut diagnostics = Diagnostics::new();
        let vec3 = temp(BasicType::Float, 3, false);
        let node = add_binary_math(Op::Equal, vec3.clone(), vec3, loc(), &mut diagnostics).ok().unwrap();
        assert_eq!(node.basic(), BasicType::Bool);
        assert_eq!(node.ty.size, 1);

        let node = add_binary_math(Op::LessThan, Node::const_int(1, loc()), Node::const_int(2, loc()), loc(), &mut diagnostics)
            .ok()
            .unwrap();
        assert_eq!(node.const_value(), Some(ConstValue::Bool(true)));
    }

    #[test]
    fn unary_operations() {
        let node = add_unary_math(Op::Negative, Node::const_int(4, loc()), loc()).ok().unwrap();
        assert_eq!(node.const_value(), Some(ConstValue::Int(-4)));
        assert!(node.ty.is_const());

        assert!(add_unary_math(Op::LogicalNot, temp(BasicType::Float, 1, false), loc()).is_err());
        assert!(add_unary_math(Op::PreIncrement, temp(BasicType::Bool, 1, false), loc()).is_err());
        let node = add_unary_math(Op::Sin, temp(BasicType::Float, 2, false), loc()).ok().unwrap();
        assert_eq!(node.qualifier(), Qualifier::Temporary);
    }

    #[test]
    fn aggregates_grow_only_when_open() {
        let a = Node::const_int(1, loc());
        let b = Node::const_int(2, loc());
        let c = Node::const_int(3, loc());
        let list = grow_aggregate(Some(a), Some(b), loc());
        let list = grow_aggregate(list, Some(c), loc()).unwrap();
        assert_eq!(list.as_aggregate().unwrap().children.len(), 3);

        let seq = set_aggregate_operator(Some(list), Op::Sequence, loc());
        let grown = grow_aggregate(Some(seq), None, loc()).unwrap();
        let outer = grown.as_aggregate().unwrap();
        assert_eq!(outer.op, Op::Null);
        assert_eq!(outer.children.len(), 1);
        assert!(grow_aggregate(None, None, loc()).is_none());
    }

    #[test]
    fn constant_selection_picks_branch() {
        let node = add_selection(
            Node::const_bool(false, loc()),
            Node::const_int(1, loc()),
            Node::const_int(2, loc()),
            loc(),
        );
        assert_eq!(node.const_value(), Some(ConstValue::Int(2)));
    }
}
