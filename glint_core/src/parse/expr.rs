//! Expressions: operators, identifiers, selection, constructors and calls.

use super::context::ParseContext;
use super::{decl, Parser};
use crate::const_tree::parse_const_tree;
use crate::extension::EXT_DRAW_BUFFERS;
use crate::intermediate::{
    add_assign, add_binary_math, add_comma, add_constant, add_index, add_selection, add_swizzle,
    add_unary_math, literal_type, set_aggregate_operator,
};
use crate::ir::{Aggregate, ConstValue, Node, Op};
use crate::symbol_table::{Function, Param, Symbol, SymbolID, Variable};
use crate::text::SourceLoc;
use crate::token::{Token, T};
use crate::types::{BasicType, Precision, Qualifier, Type};
use std::rc::Rc;

const MAX_INT_LITERAL: u32 = 1 << 16;

/// Variable an identifier resolved to.
pub(crate) struct NamedVariable {
    pub id: SymbolID,
    pub ty: Type,
    pub value: Option<Rc<[ConstValue]>>,
}

pub(super) fn expression(p: &mut Parser) -> Result<Node, String> {
    let mut node = assignment_expression(p)?;
    while p.at(T![,]) {
        let loc = p.loc();
        p.bump();
        let right = assignment_expression(p)?;
        node = add_comma(node, right, loc);
    }
    Ok(node)
}

/// Expression that must fold to a constant, array sizes for example.
pub(super) fn constant_expression(p: &mut Parser) -> Result<Node, String> {
    let node = conditional_expression(p)?;
    let _ = p.ctx.const_check(&node);
    Ok(node)
}

pub(super) fn assignment_expression(p: &mut Parser) -> Result<Node, String> {
    let left = conditional_expression(p)?;
    let Some(op) = p.peek().as_assign_op() else {
        return Ok(left);
    };
    let loc = p.loc();
    p.bump();
    let right = assignment_expression(p)?;
    Ok(p.ctx.add_assignment(op, left, right, loc))
}

fn conditional_expression(p: &mut Parser) -> Result<Node, String> {
    let cond = sub_expr(p, 0)?;
    if !p.at(T![?]) {
        return Ok(cond);
    }
    let loc = p.loc();
    p.bump();
    let true_node = expression(p)?;
    p.expect(T![:])?;
    let false_node = assignment_expression(p)?;
    Ok(p.ctx.add_ternary(cond, true_node, false_node, loc))
}

fn precedence(op: Op) -> u32 {
    match op {
        Op::LogicalOr => 1,
        Op::LogicalXor => 2,
        Op::LogicalAnd => 3,
        Op::Equal | Op::NotEqual => 4,
        Op::LessThan | Op::GreaterThan | Op::LessThanEqual | Op::GreaterThanEqual => 5,
        Op::Add | Op::Sub => 6,
        _ => 7,
    }
}

fn sub_expr(p: &mut Parser, min_prec: u32) -> Result<Node, String> {
    let mut left = unary_expression(p)?;
    loop {
        let token = p.peek();
        let Some(op) = token.as_bin_op() else {
            break;
        };
        let prec = precedence(op);
        if prec < min_prec {
            break;
        }
        let loc = p.loc();
        p.bump();
        let right = sub_expr(p, prec + 1)?;
        left = p.ctx.add_binary(op, token.as_str(), left, right, loc);
    }
    Ok(left)
}

fn unary_expression(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    let token = p.peek();
    let op = match token {
        T!["++"] => Op::PreIncrement,
        T!["--"] => Op::PreDecrement,
        T![-] => Op::Negative,
        T![!] => Op::LogicalNot,
        T![+] => {
            p.bump();
            return unary_expression(p);
        }
        _ => return postfix_expression(p),
    };
    p.bump();
    let operand = unary_expression(p)?;
    Ok(p.ctx.add_unary(op, token.as_str(), operand, loc))
}

fn postfix_expression(p: &mut Parser) -> Result<Node, String> {
    let mut node = primary_expression(p)?;
    loop {
        let loc = p.loc();
        match p.peek() {
            T!['['] => {
                p.bump();
                let index = expression(p)?;
                let _ = p.ctx.integer_check(&index, "[]");
                p.expect(T![']'])?;
                node = p.ctx.add_index_expression(node, loc, index);
            }
            T![.] => {
                p.bump();
                let (field, field_loc) = p.ident()?;
                if p.at(T!['(']) {
                    p.ctx.error(field_loc, "methods are not supported", "", "");
                    let _ = call_arguments(p)?;
                    continue;
                }
                node = p.ctx.add_field_selection(node, loc, &field, field_loc);
            }
            T!["++"] | T!["--"] => {
                let token = p.peek();
                let op = match token {
                    T!["++"] => Op::PostIncrement,
                    _ => Op::PostDecrement,
                };
                p.bump();
                node = p.ctx.add_unary(op, token.as_str(), node, loc);
            }
            _ => return Ok(node),
        }
    }
}

fn primary_expression(p: &mut Parser) -> Result<Node, String> {
    let loc = p.loc();
    match p.peek() {
        T![int_lit] => {
            let value = p.literal().map_or(0, |value| value.as_int());
            if value.unsigned_abs() >= MAX_INT_LITERAL {
                p.ctx.error(loc, " integer constant overflow", "", "");
            }
            p.bump();
            Ok(add_constant(Rc::from([ConstValue::Int(value)]), literal_type(BasicType::Int), loc))
        }
        T![float_lit] => {
            let value = p.literal().map_or(0.0, |value| value.as_float());
            p.bump();
            Ok(add_constant(Rc::from([ConstValue::Float(value)]), literal_type(BasicType::Float), loc))
        }
        T![true] | T![false] => {
            let value = p.peek() == T![true];
            p.bump();
            Ok(add_constant(Rc::from([ConstValue::Bool(value)]), literal_type(BasicType::Bool), loc))
        }
        T!['('] => {
            p.bump();
            let node = expression(p)?;
            p.expect(T![')'])?;
            Ok(node)
        }
        T![ident] if p.at_next(T!['(']) && decl::struct_type(p).is_none() => {
            let (name, loc) = p.ident()?;
            let _ = p.ctx.reserved_check(loc, &name);
            let args = call_arguments(p)?;
            Ok(p.ctx.add_function_call(loc, &name, args))
        }
        T![ident] if decl::struct_type(p).is_none() => {
            let (name, loc) = p.ident()?;
            Ok(p.ctx.add_identifier(loc, &name))
        }
        token if token.is_type_keyword() || token == T![ident] => {
            let (ty, loc) = decl::type_specifier_nonarray(p)?;
            let args = call_arguments(p)?;
            Ok(p.ctx.add_constructor_call(loc, ty, args))
        }
        _ => Err("expected expression".into()),
    }
}

/// `()`, `(void)` or a comma separated argument list
fn call_arguments(p: &mut Parser) -> Result<Vec<Node>, String> {
    p.expect(T!['('])?;
    if p.at(T![void]) && p.at_next(T![')']) {
        p.bump();
    }
    let mut args = Vec::new();
    if p.eat(T![')']) {
        return Ok(args);
    }
    loop {
        args.push(assignment_expression(p)?);
        if !p.eat(T![,]) {
            break;
        }
    }
    p.expect(T![')'])?;
    Ok(args)
}

fn is_comparison(op: Op) -> bool {
    matches!(
        op,
        Op::LessThan
            | Op::GreaterThan
            | Op::LessThanEqual
            | Op::GreaterThanEqual
            | Op::Equal
            | Op::NotEqual
            | Op::LogicalAnd
            | Op::LogicalOr
            | Op::LogicalXor
    )
}

fn false_constant(loc: SourceLoc) -> Node {
    add_constant(Rc::from([ConstValue::Bool(false)]), literal_type(BasicType::Bool), loc)
}

impl ParseContext {
    /// Prefix and postfix operators, increments require an l-value.
    /// The operand itself is the recovery value.
    pub(crate) fn add_unary(&mut self, op: Op, token: &str, operand: Node, loc: SourceLoc) -> Node {
        if op.is_inc_dec() {
            let _ = self.lvalue_check(loc, token, &operand);
        }
        match add_unary_math(op, operand, loc) {
            Ok(node) => node,
            Err(operand) => {
                self.unary_op_error(loc, token, &operand.ty);
                operand
            }
        }
    }

    /// Recovers to `false` for comparisons and logical operators,
    /// to the left operand otherwise.
    pub(crate) fn add_binary(&mut self, op: Op, token: &str, left: Node, right: Node, loc: SourceLoc) -> Node {
        match add_binary_math(op, left, right, loc, &mut self.diagnostics) {
            Ok(node) => node,
            Err((left, right)) => {
                self.binary_op_error(loc, token, &left.ty, &right.ty);
                if is_comparison(op) {
                    false_constant(loc)
                } else {
                    left
                }
            }
        }
    }

    pub(crate) fn add_assignment(&mut self, op: Op, left: Node, right: Node, loc: SourceLoc) -> Node {
        let _ = self.lvalue_check(loc, "assign", &left);
        match add_assign(op, left, right, loc) {
            Ok(node) => node,
            Err((left, right)) => {
                self.assign_error(loc, "assign", &left.ty, &right.ty);
                left
            }
        }
    }

    /// `cond ? a : b`, both branches must have the same type.
    pub(crate) fn add_ternary(&mut self, cond: Node, true_node: Node, false_node: Node, loc: SourceLoc) -> Node {
        let _ = self.bool_check(loc, &cond.ty);
        if true_node.ty != false_node.ty {
            self.binary_op_error(loc, ":", &true_node.ty, &false_node.ty);
            return false_node;
        }
        add_selection(cond, true_node, false_node, loc)
    }

    /// Resolves `name` to a variable. Unknown names are declared as
    /// float so later uses do not report again.
    pub(crate) fn named_variable(&mut self, loc: SourceLoc, name: &str, symbol: Option<SymbolID>) -> NamedVariable {
        let variable = match symbol {
            None => {
                self.error(loc, "undeclared identifier", name, "");
                None
            }
            Some(id) => match self.symbol_table.variable(id) {
                None => {
                    self.error(loc, "variable expected", name, "");
                    None
                }
                Some(var) => Some((id, var.ty.clone(), var.const_value.clone(), var.extension)),
            },
        };

        match variable {
            Some((id, ty, value, extension)) => {
                if let Some(extension) = extension {
                    let _ = self.extension_check(loc, extension);
                }
                NamedVariable { id, ty, value }
            }
            None => {
                let ty = Type::new(BasicType::Float, Precision::Undefined, Qualifier::Temporary, 1, false);
                let fake = Variable::new(name, ty.clone());
                let id = self.symbol_table.insert(Symbol::Variable(fake)).unwrap_or(SymbolID::dummy());
                NamedVariable { id, ty, value: None }
            }
        }
    }

    /// `const` variables are replaced by their value.
    pub(crate) fn add_identifier(&mut self, loc: SourceLoc, name: &str) -> Node {
        let symbol = self.symbol_table.find(name);
        let variable = self.named_variable(loc, name, symbol);
        match variable.value {
            Some(values) if variable.ty.is_const() => add_constant(values, variable.ty, loc),
            _ => Node::symbol(variable.id, name, variable.ty, loc),
        }
    }

    /// `base[index]`, constant indices into constant bases fold,
    /// constant indices out of range are clamped after reporting.
    pub(crate) fn add_index_expression(&mut self, base: Node, loc: SourceLoc, index: Node) -> Node {
        if !base.ty.is_array() && !base.ty.is_matrix() && !base.ty.is_vector() {
            let token = base.as_symbol().map_or("expression", |(_, name)| name).to_string();
            self.error(loc, " left of '[' is not of type array, matrix, or vector ", &token, "");
        }
        let base_ty = base.ty.clone();

        let constant_index = match index.const_value() {
            Some(value) if index.ty.is_const() => Some(value.as_int()),
            _ => None,
        };
        let indexed = match constant_index {
            Some(mut value) => {
                if value < 0 {
                    self.error(loc, "negative index", &value.to_string(), "");
                    value = 0;
                }
                let value = value as usize;
                if base_ty.is_const() {
                    if base_ty.is_array() {
                        self.const_array_node(value, &base, loc)
                    } else if base_ty.is_vector() {
                        self.const_vector_node(&[value], &base, loc)
                    } else if base_ty.is_matrix() {
                        self.const_matrix_node(value, &base, loc)
                    } else {
                        None
                    }
                } else {
                    let value = self.clamp_index(value, &base_ty, loc);
                    let index = Node::constant(Rc::from([ConstValue::Int(value as i32)]), index.ty, index.loc);
                    Some(add_index(Op::IndexDirect, base, index, loc))
                }
            }
            None => Some(add_index(Op::IndexIndirect, base, index, loc)),
        };

        let Some(mut indexed) = indexed else {
            let ty = Type::new(BasicType::Float, Precision::High, Qualifier::Const, 1, false);
            return add_constant(Rc::from([ConstValue::Float(0.0)]), ty, loc);
        };

        let qualifier = match base_ty.is_const() {
            true => Qualifier::Const,
            false => Qualifier::Temporary,
        };
        if base_ty.is_array() {
            indexed.ty = match &base_ty.structure {
                Some(structure) => Type::structure(structure.clone(), qualifier),
                None => base_ty.element_type().with_qualifier(qualifier),
            };
        } else if base_ty.is_matrix() {
            indexed.ty = base_ty.column_type().with_qualifier(qualifier);
        } else if base_ty.is_vector() {
            indexed.ty = base_ty.component_type().with_qualifier(qualifier);
        } else {
            indexed.ty = base_ty;
        }
        indexed
    }

    fn clamp_index(&mut self, index: usize, base: &Type, loc: SourceLoc) -> usize {
        if base.is_array() {
            let size = base.array_size as usize;
            if index >= size {
                self.error(loc, "", "[", &format!("array index out of range '{}'", index));
                return size - 1;
            }
            if base.qualifier == Qualifier::FragData && index > 0 && !self.is_extension_enabled(EXT_DRAW_BUFFERS) {
                let extra = "array indexes for gl_FragData must be zero when GL_EXT_draw_buffers is disabled";
                self.error(loc, "", "[", extra);
                return 0;
            }
        } else if (base.is_vector() || base.is_matrix()) && base.nominal_size() <= index {
            self.error(loc, "", "[", &format!("field selection out of range '{}'", index));
            return base.nominal_size() - 1;
        }
        index
    }

    fn const_vector_node(&mut self, offsets: &[usize], node: &Node, loc: SourceLoc) -> Option<Node> {
        let Some(values) = node.as_constant() else {
            self.error(loc, "Cannot offset into the vector", "Error", "");
            return None;
        };
        let mut selected = Vec::with_capacity(offsets.len());
        for &offset in offsets {
            let offset = if offset >= node.ty.nominal_size() {
                let extra = format!("vector field selection out of range '{}'", offset);
                self.error(loc, "", "[", &extra);
                0
            } else {
                offset
            };
            selected.push(values[offset]);
        }
        Some(add_constant(selected.into(), node.ty.clone(), loc))
    }

    fn const_matrix_node(&mut self, index: usize, node: &Node, loc: SourceLoc) -> Option<Node> {
        let size = node.ty.nominal_size();
        let index = if index >= size {
            self.error(loc, "", "[", &format!("matrix field selection out of range '{}'", index));
            0
        } else {
            index
        };
        let Some(values) = node.as_constant() else {
            self.error(loc, "Cannot offset into the matrix", "Error", "");
            return None;
        };
        let Some(column) = values.get(size * index..size * (index + 1)) else {
            self.error(loc, "Cannot offset into the matrix", "Error", "");
            return None;
        };
        Some(add_constant(Rc::from(column), node.ty.clone(), loc))
    }

    fn const_array_node(&mut self, index: usize, node: &Node, loc: SourceLoc) -> Option<Node> {
        let index = if index >= node.ty.array_size as usize {
            self.error(loc, "", "[", &format!("array field selection out of range '{}'", index));
            0
        } else {
            index
        };
        let Some(values) = node.as_constant() else {
            self.error(loc, "Cannot offset into the array", "Error", "");
            return None;
        };
        let element_size = node.ty.element_type().object_size();
        let Some(element) = values.get(element_size * index..element_size * (index + 1)) else {
            self.error(loc, "Cannot offset into the array", "Error", "");
            return None;
        };
        Some(add_constant(Rc::from(element), node.ty.clone(), loc))
    }

    fn const_struct_node(&mut self, field: &str, node: &Node, loc: SourceLoc) -> Option<Node> {
        let structure = node.ty.structure.clone()?;
        let mut offset = 0;
        let mut size = 0;
        for candidate in &structure.fields {
            if candidate.name == field {
                size = candidate.ty.object_size();
                break;
            }
            offset += candidate.ty.object_size();
        }
        let Some(values) = node.as_constant() else {
            self.error(loc, "Cannot offset into the structure", "Error", "");
            return None;
        };
        let Some(slice) = values.get(offset..offset + size) else {
            self.error(loc, "Cannot offset into the structure", "Error", "");
            return None;
        };
        Some(add_constant(Rc::from(slice), node.ty.clone(), loc))
    }

    /// Offsets of a swizzle like `xyz`, `rgba` or `st`.
    fn parse_vector_fields(&mut self, fields: &str, size: usize, loc: SourceLoc) -> Option<Vec<usize>> {
        if fields.len() > 4 {
            self.error(loc, "illegal vector field selection", fields, "");
            return None;
        }
        let mut selected = Vec::with_capacity(fields.len());
        for c in fields.chars() {
            let component = match c {
                'x' => (0, 0),
                'y' => (1, 0),
                'z' => (2, 0),
                'w' => (3, 0),
                'r' => (0, 1),
                'g' => (1, 1),
                'b' => (2, 1),
                'a' => (3, 1),
                's' => (0, 2),
                't' => (1, 2),
                'p' => (2, 2),
                'q' => (3, 2),
                _ => {
                    self.error(loc, "illegal vector field selection", fields, "");
                    return None;
                }
            };
            selected.push(component);
        }

        for (i, &(offset, set)) in selected.iter().enumerate() {
            if offset >= size {
                self.error(loc, "vector field selection out of range", fields, "");
                return None;
            }
            if i > 0 && selected[i - 1].1 != set {
                self.error(loc, "illegal - vector component fields not from the same set", fields, "");
                return None;
            }
        }
        Some(selected.into_iter().map(|(offset, _)| offset).collect())
    }

    /// `_N` and `N_` select whole columns and rows, `RC` a single element.
    fn parse_matrix_fields(&mut self, fields: &str, size: usize, loc: SourceLoc) -> Option<MatrixFields> {
        let bytes = fields.as_bytes();
        if bytes.len() != 2 {
            self.error(loc, "illegal length of matrix field selection", fields, "");
            return None;
        }
        let digit = |b: u8| (b'0'..=b'3').contains(&b).then(|| (b - b'0') as usize);

        let selected = match (bytes[0], bytes[1]) {
            (b'_', col) => digit(col).map(|col| MatrixFields { row: 0, col, whole: true }),
            (row, b'_') => digit(row).map(|row| MatrixFields { row, col: 0, whole: true }),
            (row, col) => match (digit(row), digit(col)) {
                (Some(row), Some(col)) => Some(MatrixFields { row, col, whole: false }),
                _ => None,
            },
        };
        let Some(selected) = selected else {
            self.error(loc, "illegal matrix field selection", fields, "");
            return None;
        };
        if selected.row >= size || selected.col >= size {
            self.error(loc, "matrix field selection out of range", fields, "");
            return None;
        }
        Some(selected)
    }

    /// `base.field` on vectors, matrices and structs.
    pub(crate) fn add_field_selection(
        &mut self,
        base: Node,
        dot_loc: SourceLoc,
        field: &str,
        field_loc: SourceLoc,
    ) -> Node {
        if base.ty.is_array() {
            self.error(field_loc, "cannot apply dot operator to an array", ".", "");
        }

        if base.ty.is_vector() {
            let size = base.ty.nominal_size();
            let offsets = self.parse_vector_fields(field, size, field_loc).unwrap_or_else(|| vec![0]);
            let count = offsets.len() as u8;
            if base.ty.is_const() {
                return match self.const_vector_node(&offsets, &base, field_loc) {
                    Some(mut node) => {
                        node.ty = Type::new(base.ty.basic, base.ty.precision, Qualifier::Const, count, false);
                        node
                    }
                    None => base,
                };
            }
            let ty = Type::new(base.ty.basic, base.ty.precision, Qualifier::Temporary, count, false);
            let mut node = add_index(Op::VectorSwizzle, base, add_swizzle(&offsets, field_loc), dot_loc);
            node.ty = ty;
            return node;
        }

        if base.ty.is_matrix() {
            let size = base.ty.nominal_size();
            let selected = self
                .parse_matrix_fields(field, size, field_loc)
                .unwrap_or(MatrixFields { row: 0, col: 0, whole: false });
            let (index, ty) = if selected.whole {
                self.error(dot_loc, " non-scalar fields not implemented yet", ".", "");
                (0, base.ty.column_type().with_qualifier(Qualifier::Temporary))
            } else {
                let index = selected.col * size + selected.row;
                (index, base.ty.component_type().with_qualifier(Qualifier::Temporary))
            };
            let index = Node::constant(Rc::from([ConstValue::Int(index as i32)]), literal_type(BasicType::Int), field_loc);
            let mut node = add_index(Op::IndexDirect, base, index, dot_loc);
            node.ty = ty;
            return node;
        }

        if let Some(structure) = base.ty.structure.clone() {
            let Some((index, found)) = structure.field(field) else {
                self.error(dot_loc, " no such field in structure", field, "");
                return base;
            };
            if base.ty.is_const() {
                return match self.const_struct_node(field, &base, dot_loc) {
                    Some(mut node) => {
                        node.ty = found.ty.clone().with_qualifier(Qualifier::Const);
                        node
                    }
                    None => base,
                };
            }
            let ty = found.ty.clone();
            let index = Node::constant(Rc::from([ConstValue::Int(index as i32)]), literal_type(BasicType::Int), field_loc);
            let mut node = add_index(Op::IndexDirectStruct, base, index, dot_loc);
            node.ty = ty;
            return node;
        }

        self.error(dot_loc, " field selection requires structure, vector, or matrix on left hand side", field, "");
        base
    }

    /// constructor operator for `ty`, unsupported types construct a float
    fn constructor_op(&mut self, loc: SourceLoc, ty: Type) -> (Op, Type) {
        if ty.structure.is_some() {
            return (Op::ConstructStruct, ty);
        }
        let op = match (ty.basic, ty.size, ty.matrix) {
            (BasicType::Float, 2, true) => Some(Op::ConstructMat2),
            (BasicType::Float, 3, true) => Some(Op::ConstructMat3),
            (BasicType::Float, 4, true) => Some(Op::ConstructMat4),
            (BasicType::Float, 1, false) => Some(Op::ConstructFloat),
            (BasicType::Float, 2, false) => Some(Op::ConstructVec2),
            (BasicType::Float, 3, false) => Some(Op::ConstructVec3),
            (BasicType::Float, 4, false) => Some(Op::ConstructVec4),
            (BasicType::Int, 1, _) => Some(Op::ConstructInt),
            (BasicType::Int, 2, _) => Some(Op::ConstructIVec2),
            (BasicType::Int, 3, _) => Some(Op::ConstructIVec3),
            (BasicType::Int, 4, _) => Some(Op::ConstructIVec4),
            (BasicType::Bool, 1, _) => Some(Op::ConstructBool),
            (BasicType::Bool, 2, _) => Some(Op::ConstructBVec2),
            (BasicType::Bool, 3, _) => Some(Op::ConstructBVec3),
            (BasicType::Bool, 4, _) => Some(Op::ConstructBVec4),
            _ => None,
        };
        match op {
            Some(op) => (op, ty),
            None => {
                self.error(loc, "cannot construct this type", ty.basic_string(), "");
                let float = Type::new(BasicType::Float, ty.precision, ty.qualifier, 1, false);
                (Op::ConstructFloat, float)
            }
        }
    }

    /// Checks the arguments of a constructor and computes its result type.
    /// The result is `const` when every argument is.
    fn constructor_check(&mut self, loc: SourceLoc, op: Op, ty: &mut Type, args: &[Node]) -> Result<(), ()> {
        let constructing_matrix = op.is_matrix_constructor();
        let mut size = 0;
        let mut full = false;
        let mut over_full = false;
        let mut matrix_in_matrix = false;
        let mut array_arg = false;
        for arg in args {
            size += arg.ty.object_size();
            if constructing_matrix && arg.ty.is_matrix() {
                matrix_in_matrix = true;
            }
            if full {
                over_full = true;
            }
            if op != Op::ConstructStruct && !ty.is_array() && size >= ty.object_size() {
                full = true;
            }
            if arg.ty.is_array() {
                array_arg = true;
            }
        }
        let all_const = args.iter().all(|arg| arg.ty.is_const());
        ty.qualifier = match all_const {
            true => Qualifier::Const,
            false => Qualifier::Temporary,
        };

        let reason = if ty.is_array() && ty.array_size as usize != args.len() {
            Some("array constructor needs one argument per array element")
        } else if array_arg && op != Op::ConstructStruct {
            Some("constructing from a non-dereferenced array")
        } else if matrix_in_matrix && !ty.is_array() && args.len() != 1 {
            Some("constructing matrix from matrix can only take one argument")
        } else if over_full {
            Some("too many arguments")
        } else if op == Op::ConstructStruct
            && !ty.is_array()
            && ty.structure.as_ref().is_some_and(|s| s.fields.len() != args.len())
        {
            Some("Number of constructor parameters does not match the number of structure fields")
        } else if (!ty.is_matrix() || !matrix_in_matrix)
            && ((op != Op::ConstructStruct && size != 1 && size < ty.object_size())
                || (op == Op::ConstructStruct && size < ty.object_size()))
        {
            Some("not enough data provided for construction")
        } else {
            match args {
                [] => Some("constructor argument does not have a type"),
                [arg] if op != Op::ConstructStruct && arg.ty.is_sampler() => Some("cannot convert a sampler"),
                [arg] if arg.ty.basic == BasicType::Void => Some("cannot convert a void"),
                _ => None,
            }
        };

        if let Some(reason) = reason {
            self.error(loc, reason, "constructor", "");
            return Err(());
        }
        Ok(())
    }

    /// Constructor aggregate, folded into a constant when every argument is one.
    fn add_constructor(&mut self, args: Vec<Node>, ty: &Type, op: Op, loc: SourceLoc) -> Option<Node> {
        if let (Op::ConstructStruct, Some(structure)) = (op, &ty.structure) {
            for (i, field) in structure.fields.iter().enumerate() {
                if args.get(i).map_or(true, |arg| arg.ty != field.ty) {
                    self.error(loc, "Structure constructor arguments do not match structure fields", "Error", "");
                    return None;
                }
            }
        }

        let all_const = args.iter().all(|arg| arg.ty.is_const());
        let single = args.len() == 1;
        let mut aggregate = Aggregate::new(op);
        aggregate.children = args;
        let node = Node::aggregate(aggregate, ty.clone(), loc);

        if all_const {
            if let Ok(values) = parse_const_tree(&node, ty, op, single, &mut self.diagnostics) {
                return Some(add_constant(values, ty.clone(), loc));
            }
        }
        Some(node)
    }

    pub(crate) fn add_constructor_call(&mut self, loc: SourceLoc, ty: Type, args: Vec<Node>) -> Node {
        let (op, mut ty) = self.constructor_op(loc, ty);
        let node = match self.constructor_check(loc, op, &mut ty, &args) {
            Ok(()) => self.add_constructor(args, &ty, op, loc),
            Err(()) => None,
        };
        let mut node = node.unwrap_or_else(|| set_aggregate_operator(None, op, loc));
        node.ty = ty;
        node
    }

    /// Looks up the overload matching `call`, the unmangled name is
    /// checked first so variables and struct names hide functions.
    /// Returns the function and whether it is a built-in.
    fn find_function(&mut self, loc: SourceLoc, call: &Function) -> Option<(Function, bool)> {
        let mut found = self.symbol_table.find_with_level(&call.name);
        if found.map_or(true, |(id, _)| self.symbol_table.get(id).is_function()) {
            found = self.symbol_table.find_with_level(&call.mangled);
        }
        let Some((id, level)) = found else {
            self.error(loc, "no matching overloaded function found", &call.name, "");
            return None;
        };
        let Some(function) = self.symbol_table.function(id) else {
            self.error(loc, "function name expected", &call.name, "");
            return None;
        };
        Some((function.clone(), level == crate::symbol_table::BUILTIN_LEVEL))
    }

    /// Call of a built-in or user function. Built-ins with an operator
    /// become operator nodes, unresolved calls become a float constant.
    pub(crate) fn add_function_call(&mut self, loc: SourceLoc, name: &str, args: Vec<Node>) -> Node {
        let mut call = Function::new(name, Type::void());
        for arg in &args {
            call.add_param(Param { name: None, ty: arg.ty.clone() });
        }

        let Some((function, builtin)) = self.find_function(loc, &call) else {
            let zero = Rc::from([ConstValue::Float(0.0)]);
            return add_constant(zero, literal_type(BasicType::Float), loc);
        };
        if let (true, Some(extension)) = (builtin, function.extension) {
            let _ = self.extension_check(loc, extension);
        }

        let mut node = match (builtin, function.op) {
            (true, Some(op)) if function.params.len() == 1 => {
                let mut args = args;
                let arg = args.remove(0);
                match add_unary_math(op, arg, loc) {
                    Ok(node) => node,
                    Err(arg) => {
                        let extra = format!("built in unary operator function.  Type: {}", arg.ty.complete_string());
                        self.error(arg.loc, " wrong operand type", "Internal Error", &extra);
                        arg
                    }
                }
            }
            (true, Some(op)) => {
                let mut aggregate = Aggregate::new(op);
                aggregate.children = args;
                Node::aggregate(aggregate, function.ret.clone(), loc)
            }
            _ => {
                let args_loc = args.first().map_or(loc, |arg| arg.loc);
                let mut aggregate = Aggregate::new(Op::FunctionCall);
                aggregate.user_defined = !builtin;
                aggregate.name = function.mangled.clone();
                for (param, arg) in function.params.iter().zip(&args) {
                    if matches!(param.ty.qualifier, Qualifier::Out | Qualifier::InOut)
                        && self.lvalue_check(loc, "assign", arg).is_err()
                    {
                        let reason = "Constant value cannot be passed for 'out' or 'inout' parameters.";
                        self.error(args_loc, reason, "Error", "");
                    }
                }
                aggregate.children = args;
                Node::aggregate(aggregate, function.ret.clone(), loc)
            }
        };
        node.ty = function.ret;
        node
    }
}

#[derive(Copy, Clone)]
struct MatrixFields {
    row: usize,
    col: usize,
    /// whole row or column selection
    whole: bool,
}

#[cfg(test)]
mod tests {
    use crate::config::ShaderType;
    use crate::ir::{ConstValue, NodeKind, Op};
    use crate::parse::tests::{main_body, parse_source};

    fn log_of(shader: ShaderType, source: &str) -> String {
        let (ctx, _) = parse_source(shader, source);
        ctx.diagnostics.info_log().to_string()
    }

    #[test]
    fn undeclared_identifier_reports_once() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "void main() { float a = b + b; b = 1.0; }");
        assert_eq!(ctx.num_errors(), 1, "{}", ctx.diagnostics.info_log());
        assert!(ctx.diagnostics.info_log().contains("'b' : undeclared identifier"));
    }

    #[test]
    fn short_constant_reports_offset_error() {
        use crate::ir::Node;
        use crate::text::SourceLoc;
        use crate::types::{BasicType, Precision, Qualifier, Type};

        let (mut ctx, _) = parse_source(ShaderType::Vertex, "void main() { }");
        let loc = SourceLoc::new(0, 3);
        let mat2 = Type::new(BasicType::Float, Precision::Undefined, Qualifier::Const, 2, true);
        let short = Node::constant([1.0, 2.0].map(ConstValue::Float).into(), mat2, loc);
        assert!(ctx.const_matrix_node(1, &short, loc).is_none());

        let mut array = Type::new(BasicType::Float, Precision::Undefined, Qualifier::Const, 1, false);
        array.array_size = 3;
        let short = Node::constant([1.0].map(ConstValue::Float).into(), array, loc);
        assert!(ctx.const_array_node(2, &short, loc).is_none());

        let log = ctx.diagnostics.info_log();
        assert!(log.contains("ERROR: 0(3): 'Error' : Cannot offset into the matrix"), "{}", log);
        assert!(log.contains("ERROR: 0(3): 'Error' : Cannot offset into the array"), "{}", log);
        assert_eq!(ctx.num_errors(), 2, "{}", log);
    }

    #[test]
    fn integer_literal_overflow() {
        let log = log_of(ShaderType::Vertex, "int a = 65536;\nint b = 65535;");
        assert_eq!(log.matches("integer constant overflow").count(), 1, "{}", log);
    }

    #[test]
    fn constant_operators_fold() {
        let (ctx, root) = parse_source(ShaderType::Vertex, "void main() { float x = 2.0 * 3.0 + 1.0; }");
        assert_eq!(ctx.num_errors(), 0);
        let body = main_body(root.as_ref().unwrap());
        let init = body.as_aggregate().unwrap().children[0].as_aggregate().unwrap().children[0].clone();
        let (op, _, right) = init.as_binary().unwrap();
        assert_eq!(op, Op::Initialize);
        assert_eq!(right.as_constant().unwrap()[..], [ConstValue::Float(7.0)]);
    }

    #[test]
    fn constructors_fold_and_splat() {
        let source = "const vec4 v = vec4(1.0);\nconst mat2 m = mat2(2.0);\nconst vec3 w = vec3(v);";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let value = |name: &str| {
            let id = ctx.symbol_table.find(name).unwrap();
            ctx.symbol_table.variable(id).unwrap().const_value.clone().unwrap()
        };
        assert_eq!(value("v")[..], [ConstValue::Float(1.0); 4]);
        assert_eq!(
            value("m")[..],
            [ConstValue::Float(2.0), ConstValue::Float(0.0), ConstValue::Float(0.0), ConstValue::Float(2.0)]
        );
        assert_eq!(value("w").len(), 3);
    }

    #[test]
    fn constructor_argument_errors() {
        let source = "void main() {\nvec3 a = vec3(1.0, 2.0);\nvec2 b = vec2(1.0, 2.0, 3.0);\nmat2 c = mat2(mat2(1.0), 1.0);\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'constructor' : not enough data provided for construction"), "{}", log);
        assert!(log.contains("'constructor' : too many arguments"), "{}", log);
        assert!(log.contains("constructing matrix from matrix can only take one argument"), "{}", log);
    }

    #[test]
    fn struct_constructor() {
        let source = "struct S { float a; int b; };\nvoid main() { S s = S(1.0, 2); S t = S(1, 2.0); }";
        let log = log_of(ShaderType::Vertex, source);
        assert_eq!(log.matches("Structure constructor arguments do not match structure fields").count(), 1, "{}", log);
    }

    #[test]
    fn swizzles() {
        let source = "void main() {\nvec2 v = vec2(0.0);\nvec3 a = v.xyz;\nfloat b = v.xr;\nvec4 c = v.xxxxx;\nvec2 d = v.yx;\nv.xx = d;\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'xyz' : vector field selection out of range"), "{}", log);
        assert!(log.contains("'xr' : illegal - vector component fields not from the same set"), "{}", log);
        assert!(log.contains("'xxxxx' : illegal vector field selection"), "{}", log);
        assert!(log.contains("l-value of swizzle cannot have duplicate components"), "{}", log);
        assert!(!log.contains("'yx'"), "{}", log);
    }

    #[test]
    fn constant_swizzle_folds() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "const vec3 v = vec3(1.0, 2.0, 3.0);\nconst vec2 s = v.zx;");
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let id = ctx.symbol_table.find("s").unwrap();
        let value = ctx.symbol_table.variable(id).unwrap().const_value.clone().unwrap();
        assert_eq!(value[..], [ConstValue::Float(3.0), ConstValue::Float(1.0)]);
    }

    #[test]
    fn matrix_fields() {
        let source = "void main() {\nmat3 m = mat3(1.0);\nmat2 n = mat2(1.0);\nvec3 a = m._0;\nfloat b = m._012;\nfloat c = n._3;\nfloat d = m._5;\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'.' :  non-scalar fields not implemented yet"), "{}", log);
        assert!(log.contains("'_012' : illegal length of matrix field selection"), "{}", log);
        assert!(log.contains("'_3' : matrix field selection out of range"), "{}", log);
        assert!(log.contains("'_5' : illegal matrix field selection"), "{}", log);
    }

    #[test]
    fn index_checks() {
        let source = "void main() {\nfloat a[3];\nfloat x = a[3];\nfloat y = a[-1];\nvec2 v;\nfloat z = v[2];\nfloat f = 1.0;\nfloat w = f[0];\nfloat q = a[1.0];\n}";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'[' :  array index out of range '3'"), "{}", log);
        assert!(log.contains("'-1' : negative index"), "{}", log);
        assert!(log.contains("'[' :  field selection out of range '2'"), "{}", log);
        assert!(log.contains("'f' :  left of '[' is not of type array, matrix, or vector"), "{}", log);
        assert!(log.contains("'[]' : integer expression required"), "{}", log);
    }

    #[test]
    fn frag_data_index_needs_draw_buffers() {
        let mut options = crate::config::CompileOptions::new(ShaderType::Fragment, crate::config::ShaderSpec::Gles2);
        options.resources.ext_draw_buffers = true;
        options.resources.max_draw_buffers = 4;
        let source = "precision mediump float;\nvoid main() { gl_FragData[0] = vec4(1.0); gl_FragData[1] = vec4(0.0); }";
        let (ctx, _) = crate::parse::tests::parse_with(&options, source);
        let log = ctx.diagnostics.info_log();
        assert_eq!(ctx.num_errors(), 1, "{}", log);
        assert!(log.contains("array indexes for gl_FragData must be zero when GL_EXT_draw_buffers is disabled"), "{}", log);

        let enabled = format!("#extension GL_EXT_draw_buffers : enable\n{}", source);
        let (ctx, _) = crate::parse::tests::parse_with(&options, &enabled);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
    }

    #[test]
    fn struct_fields() {
        let source = "struct S { float a; vec2 b; };\nvoid main() { S s; float x = s.a; float y = s.c; vec2 z = s.b; float w = x.y; }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'c' :  no such field in structure"), "{}", log);
        assert!(log.contains("'y' :  field selection requires structure, vector, or matrix on left hand side"), "{}", log);
        let body = main_body(root.as_ref().unwrap());
        let init = body.as_aggregate().unwrap().children[1].as_aggregate().unwrap().children[0].clone();
        let (_, _, right) = init.as_binary().unwrap();
        assert_eq!(right.as_binary().unwrap().0, Op::IndexDirectStruct);
    }

    #[test]
    fn operator_type_errors_recover() {
        let source = "void main() { bool b = 1.0 < true; float f = 1.0 + 2; }";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'<' :  wrong operand types  no operation '<' exists"), "{}", log);
        assert!(log.contains("'+' :  wrong operand types"), "{}", log);
        assert_eq!(ctx.num_errors(), 2, "{}", log);
    }

    #[test]
    fn assignment_requires_lvalue() {
        let source = "uniform float u;\nvoid main() { const float c = 1.0; c = 2.0; u = 1.0; float x; x = true; }";
        let log = log_of(ShaderType::Vertex, source);
        assert!(log.contains("'assign' :  l-value required (can't modify a const)"), "{}", log);
        assert!(log.contains("'assign' :  l-value required \"u\" (can't modify a uniform)"), "{}", log);
        assert!(log.contains("'assign' :  cannot convert from 'const bool' to 'highp float'"), "{}", log);
    }

    #[test]
    fn ternary_types_must_match() {
        let log = log_of(ShaderType::Vertex, "void main() { float x = true ? 1.0 : 2; float y = 1.0 ? 1.0 : 2.0; }");
        assert!(log.contains("':' :  wrong operand types"), "{}", log);
        assert!(log.contains("boolean expression expected"), "{}", log);
    }

    #[test]
    fn function_calls() {
        let source = "void f(out float x) { x = 1.0; }\nvoid main() { f(2.0); g(1.0); float s = sin(1.0); float d = dot(vec2(1.0), vec2(2.0)); }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("Constant value cannot be passed for 'out' or 'inout' parameters."), "{}", log);
        assert!(log.contains("'g' : no matching overloaded function found"), "{}", log);

        let body = main_body(root.as_ref().unwrap());
        let statements = &body.as_aggregate().unwrap().children;
        let call = statements[0].as_aggregate().unwrap();
        assert_eq!(call.op, Op::FunctionCall);
        assert!(call.user_defined);
        let sin = statements[2].as_aggregate().unwrap().children[0].as_binary().unwrap().2;
        assert!(matches!(sin.kind, NodeKind::Unary { op: Op::Sin, .. }));
        let dot = statements[3].as_aggregate().unwrap().children[0].as_binary().unwrap().2;
        assert_eq!(dot.as_aggregate().unwrap().op, Op::Dot);
    }

    #[test]
    fn extension_gated_function() {
        let source = "#extension GL_OES_standard_derivatives : enable\nprecision mediump float;\nvarying vec2 v;\nvoid main() { vec2 d = dFdx(v); }";
        let mut options = crate::config::CompileOptions::new(ShaderType::Fragment, crate::config::ShaderSpec::Gles2);
        options.resources.oes_standard_derivatives = true;
        let (ctx, _) = crate::parse::tests::parse_with(&options, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());

        let source = "precision mediump float;\nvarying vec2 v;\nvoid main() { vec2 d = dFdx(v); }";
        let (ctx, _) = crate::parse::tests::parse_with(&options, source);
        assert!(ctx.diagnostics.info_log().contains("'GL_OES_standard_derivatives' : extension is disabled"));
    }

    #[test]
    fn methods_are_rejected() {
        let log = log_of(ShaderType::Vertex, "void main() { vec2 v; float l = v.length(); }");
        assert!(log.contains("methods are not supported"), "{}", log);
    }
}
