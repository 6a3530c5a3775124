//! Declarations: qualifiers, type specifiers, structs, variables and functions.

use super::context::ParseContext;
use super::{expr, stmt, Parser};
use crate::config::{ShaderSpec, ShaderType};
use crate::extension::{EXT_EGL_IMAGE_EXTERNAL, EXT_TEXTURE_RECTANGLE};
use crate::intermediate::grow_aggregate;
use crate::ir::{Aggregate, Node, Op};
use crate::symbol_table::{Function, Param, StructSymbol, Symbol, SymbolID, Variable};
use crate::text::SourceLoc;
use crate::token::T;
use crate::types::{BasicType, Field, Precision, Qualifier, StructType, Type};
use std::rc::Rc;

const WEBGL_MAX_STRUCT_NESTING: u32 = 4;

/// Parses one declaration up to and including its `;`.
/// Function definitions are only accepted when `external` is set.
pub(super) fn declaration(p: &mut Parser, external: bool) -> Result<Option<Node>, String> {
    if p.at(T![precision]) {
        precision_statement(p)?;
        return Ok(None);
    }
    if p.at(T![invariant]) && !p.at_next(T![varying]) {
        return invariant_declaration(p);
    }

    let (ty, ty_loc) = fully_specified_type(p)?;
    if p.eat(T![;]) {
        let node = p.ctx.parse_declarator(None, &ty, ty_loc, "");
        return Ok(node.map(declaration_node));
    }

    let (name, name_loc) = p.ident()?;
    if p.at(T!['(']) {
        let function = function_prototype(p, ty, &name, name_loc)?;
        if external && p.at(T!['{']) {
            return function_definition(p, &function, name_loc).map(Some);
        }
        p.expect(T![;])?;
        return Ok(Some(p.ctx.prototype_declaration(name_loc, &function)));
    }

    let mut list = declarator(p, None, &ty, &name, name_loc)?;
    while p.eat(T![,]) {
        let (name, loc) = p.ident()?;
        list = declarator(p, list, &ty, &name, loc)?;
    }
    p.expect(T![;])?;
    Ok(list.map(declaration_node))
}

fn declaration_node(mut node: Node) -> Node {
    if let Some(aggregate) = node.as_aggregate_mut() {
        if aggregate.op == Op::Null {
            aggregate.op = Op::Declaration;
        }
    }
    node
}

/// `name`, `name[size]` or `name = init` after the declared type
fn declarator(
    p: &mut Parser,
    list: Option<Node>,
    ty: &Type,
    name: &str,
    loc: SourceLoc,
) -> Result<Option<Node>, String> {
    if p.at(T!['[']) {
        let bracket_loc = p.loc();
        p.bump();
        if p.eat(T![']']) {
            p.ctx.error(loc, "unsized array declarations not supported", name, "");
            let symbol = Node::symbol(SymbolID::dummy(), name, ty.clone(), loc);
            return Ok(grow_aggregate(list, Some(symbol), loc));
        }
        let size = expr::constant_expression(p)?;
        p.expect(T![']'])?;
        return Ok(p.ctx.parse_array_declarator(list, ty, loc, name, bracket_loc, &size));
    }
    if p.at(T![=]) {
        let init_loc = p.loc();
        p.bump();
        let init = expr::assignment_expression(p)?;
        return Ok(p.ctx.parse_init_declarator(list, ty, loc, name, init_loc, init));
    }
    Ok(p.ctx.parse_declarator(list, ty, loc, name))
}

fn precision_statement(p: &mut Parser) -> Result<(), String> {
    let loc = p.loc();
    p.expect(T![precision])?;
    let Some(precision) = precision_qualifier(p) else {
        return Err("expected precision qualifier".into());
    };
    let (ty, _) = type_specifier_no_prec(p)?;
    p.expect(T![;])?;
    p.ctx.set_default_precision(loc, precision, &ty);
    Ok(())
}

fn invariant_declaration(p: &mut Parser) -> Result<Option<Node>, String> {
    let invariant_loc = p.loc();
    p.expect(T![invariant])?;
    let _ = p.ctx.global_check(invariant_loc, "invariant varying");

    let mut list = None;
    loop {
        let (name, loc) = p.ident()?;
        if let Some(symbol) = p.ctx.parse_invariant_declaration(loc, &name) {
            list = grow_aggregate(list, Some(symbol), loc);
        }
        if !p.eat(T![,]) {
            break;
        }
    }
    p.expect(T![;])?;

    Ok(list.map(|mut node| {
        if let Some(aggregate) = node.as_aggregate_mut() {
            aggregate.op = Op::InvariantDeclaration;
        }
        node
    }))
}

pub(super) fn fully_specified_type(p: &mut Parser) -> Result<(Type, SourceLoc), String> {
    let qualifier = type_qualifier(p)?;
    let (spec, loc) = type_specifier(p)?;
    Ok((p.ctx.add_fully_specified_type(qualifier, spec, loc), loc))
}

fn type_qualifier(p: &mut Parser) -> Result<Option<Qualifier>, String> {
    let loc = p.loc();
    let shader_type = p.ctx.shader_type;
    let qualifier = match p.peek() {
        T![const] => Qualifier::Const,
        T![attribute] => {
            if shader_type != ShaderType::Vertex {
                p.ctx.error(loc, " supported in vertex shaders only ", "attribute", "");
            }
            let _ = p.ctx.global_check(loc, "attribute");
            Qualifier::Attribute
        }
        T![varying] => {
            let _ = p.ctx.global_check(loc, "varying");
            varying_qualifier(shader_type, false)
        }
        T![invariant] => {
            p.bump();
            if !p.at(T![varying]) {
                return Err("expected `varying`".into());
            }
            let _ = p.ctx.global_check(loc, "invariant varying");
            varying_qualifier(shader_type, true)
        }
        T![uniform] => {
            let _ = p.ctx.global_check(loc, "uniform");
            Qualifier::Uniform
        }
        _ => return Ok(None),
    };
    p.bump();
    Ok(Some(qualifier))
}

fn varying_qualifier(shader_type: ShaderType, invariant: bool) -> Qualifier {
    match (shader_type, invariant) {
        (ShaderType::Vertex, false) => Qualifier::VaryingOut,
        (ShaderType::Vertex, true) => Qualifier::InvariantVaryingOut,
        (ShaderType::Fragment, false) => Qualifier::VaryingIn,
        (ShaderType::Fragment, true) => Qualifier::InvariantVaryingIn,
    }
}

fn precision_qualifier(p: &mut Parser) -> Option<Precision> {
    let precision = match p.peek() {
        T![lowp] => Precision::Low,
        T![mediump] => Precision::Medium,
        T![highp] => Precision::High,
        _ => return None,
    };
    p.bump();
    Some(precision)
}

/// Type with an optional precision, types without one take
/// the default precision of the current scope.
pub(super) fn type_specifier(p: &mut Parser) -> Result<(Type, SourceLoc), String> {
    let precision = precision_qualifier(p);
    let (mut ty, loc) = type_specifier_no_prec(p)?;
    match precision {
        Some(precision) => ty.precision = precision,
        None => {
            ty.precision = p.ctx.symbol_table.default_precision(ty.basic);
            let _ = p.ctx.precision_check(loc, ty.precision, ty.basic);
        }
    }
    Ok((ty, loc))
}

fn type_specifier_no_prec(p: &mut Parser) -> Result<(Type, SourceLoc), String> {
    let (mut ty, loc) = type_specifier_nonarray(p)?;
    if p.at(T!['[']) {
        let bracket_loc = p.loc();
        p.bump();
        let size = expr::constant_expression(p)?;
        p.expect(T![']'])?;
        if p.ctx.array_type_check(bracket_loc, &ty).is_ok() {
            ty.array_size = p.ctx.array_size_check(bracket_loc, &size).unwrap_or(1);
        }
    }
    Ok((ty, loc))
}

pub(super) fn type_specifier_nonarray(p: &mut Parser) -> Result<(Type, SourceLoc), String> {
    let loc = p.loc();
    let qualifier = match p.ctx.symbol_table.at_global_level() {
        true => Qualifier::Global,
        false => Qualifier::Temporary,
    };

    if let Some((basic, size, matrix)) = p.peek().as_type() {
        p.bump();
        let extension = match basic {
            BasicType::SamplerExternalOES => Some(EXT_EGL_IMAGE_EXTERNAL),
            BasicType::Sampler2DRect => Some(EXT_TEXTURE_RECTANGLE),
            _ => None,
        };
        if let Some(extension) = extension {
            if !p.ctx.supports_extension(extension) {
                p.ctx.error(loc, "unsupported type", basic.as_str(), "");
            }
        }
        return Ok((Type::new(basic, Precision::Undefined, qualifier, size, matrix), loc));
    }

    match p.peek() {
        T![struct] => {
            let ty = struct_specifier(p)?;
            Ok((ty.with_qualifier(qualifier), loc))
        }
        T![ident] => match struct_type(p) {
            Some(ty) => {
                p.bump();
                Ok((ty.with_qualifier(qualifier), loc))
            }
            None => Err("expected type".into()),
        },
        _ => Err("expected type".into()),
    }
}

/// struct type named by the identifier at the cursor
pub(super) fn struct_type(p: &Parser) -> Option<Type> {
    if !p.at(T![ident]) {
        return None;
    }
    let id = p.ctx.symbol_table.find(p.text(p.cursor))?;
    match p.ctx.symbol_table.get(id) {
        Symbol::Struct(structure) => Some(structure.ty.clone()),
        _ => None,
    }
}

/// true when the cursor starts a type specifier
pub(super) fn at_type(p: &Parser) -> bool {
    let token = p.peek();
    token.is_type_keyword()
        || token.is_precision_keyword()
        || token == T![struct]
        || struct_type(p).is_some()
}

fn struct_specifier(p: &mut Parser) -> Result<Type, String> {
    let struct_loc = p.loc();
    p.expect(T![struct])?;
    let (name, name_loc) = match p.at(T![ident]) {
        true => p.ident()?,
        false => (String::new(), struct_loc),
    };
    p.expect(T!['{'])?;
    let _ = p.ctx.enter_struct_declaration(name_loc);

    let mut fields: Vec<Field> = Vec::new();
    loop {
        let (spec, spec_loc) = type_specifier(p)?;
        let mut declarators = Vec::new();
        loop {
            let (field_name, field_loc) = p.ident()?;
            let _ = p.ctx.reserved_check(field_loc, &field_name);
            let mut array_size = 0;
            if p.at(T!['[']) {
                let bracket_loc = p.loc();
                p.bump();
                let size = expr::constant_expression(p)?;
                p.expect(T![']'])?;
                array_size = p.ctx.array_size_check(bracket_loc, &size).unwrap_or(1);
            }
            declarators.push((field_name, field_loc, array_size));
            if !p.eat(T![,]) {
                break;
            }
        }
        p.expect(T![;])?;

        for field in p.ctx.add_struct_declarator_list(&spec, spec_loc, declarators) {
            if fields.iter().any(|existing| existing.name == field.name) {
                p.ctx.error(spec_loc, "duplicate field name in structure:", "struct", &field.name);
            }
            fields.push(field);
        }
        if p.at(T!['}']) || p.at(T![eof]) {
            break;
        }
    }
    p.expect(T!['}'])?;
    Ok(p.ctx.add_structure(name_loc, name, fields))
}

/// Parses the parameter list after `name`, leaving the function scope pushed.
fn function_prototype(
    p: &mut Parser,
    ret: Type,
    name: &str,
    loc: SourceLoc,
) -> Result<Function, String> {
    p.ctx.function_header(loc, &ret);
    let _ = p.ctx.builtin_function_check(loc, name);
    p.expect(T!['('])?;

    let mut function = Function::new(name, ret);
    if !p.at(T![')']) {
        let mut first = true;
        loop {
            let comma_loc = p.prev_loc();
            let param = parameter_declaration(p)?;
            if param.ty.basic != BasicType::Void {
                function.add_param(param);
            } else if !first {
                p.ctx.error(comma_loc, "cannot be an argument type except for '(void)'", "void", "");
            }
            first = false;
            if !p.eat(T![,]) {
                break;
            }
        }
    }
    let close_loc = p.loc();
    p.expect(T![')'])?;
    p.ctx.function_prototype(close_loc, &function);
    Ok(function)
}

fn parameter_declaration(p: &mut Parser) -> Result<Param, String> {
    let qualifier = match p.peek() {
        T![const] => Some(Qualifier::Const),
        T![attribute] => Some(Qualifier::Attribute),
        T![uniform] => Some(Qualifier::Uniform),
        T![varying] => Some(varying_qualifier(p.ctx.shader_type, false)),
        _ => None,
    };
    if qualifier.is_some() {
        p.bump();
    }
    let direction = match p.peek() {
        T![in] => Qualifier::In,
        T![out] => Qualifier::Out,
        T![inout] => Qualifier::InOut,
        _ => Qualifier::Temporary,
    };
    if direction != Qualifier::Temporary {
        p.bump();
    }
    let direction = match direction {
        Qualifier::Temporary => Qualifier::In,
        direction => direction,
    };

    let (mut ty, loc) = type_specifier(p)?;
    let mut name = None;
    if p.at(T![ident]) {
        let (param_name, name_loc) = p.ident()?;
        if ty.basic == BasicType::Void {
            p.ctx.error(name_loc, "illegal use of type 'void'", &param_name, "");
        }
        let _ = p.ctx.reserved_check(name_loc, &param_name);
        if p.at(T!['[']) {
            let bracket_loc = p.loc();
            p.bump();
            let size = expr::constant_expression(p)?;
            p.expect(T![']'])?;
            let _ = p.ctx.array_type_check(bracket_loc, &ty);
            ty.array_size = p.ctx.array_size_check(bracket_loc, &size).unwrap_or(1);
        }
        name = Some(param_name);
    }

    match qualifier {
        Some(qualifier) => {
            let _ = p.ctx.param_check(loc, qualifier, direction, &mut ty);
        }
        None => {
            let _ = p.ctx.parameter_sampler_check(loc, direction, &ty);
            let _ = p.ctx.param_check(loc, Qualifier::Temporary, direction, &mut ty);
        }
    }
    Ok(Param { name, ty })
}

fn function_definition(p: &mut Parser, function: &Function, loc: SourceLoc) -> Result<Node, String> {
    let params = p.ctx.begin_function_definition(loc, function);
    let body = stmt::compound_statement_no_new_scope(p)?;
    Ok(p.ctx.end_function_definition(loc, function, params, body))
}

impl ParseContext {
    /// Applies the storage `qualifier` to a type specifier.
    pub(crate) fn add_fully_specified_type(
        &mut self,
        qualifier: Option<Qualifier>,
        spec: Type,
        loc: SourceLoc,
    ) -> Type {
        let mut ty = spec;
        if ty.is_array() {
            self.error(loc, "not supported", "first-class array", "");
            ty.array_size = 0;
        }
        let Some(qualifier) = qualifier else {
            return ty;
        };
        ty.qualifier = qualifier;

        let io = matches!(
            qualifier,
            Qualifier::Attribute | Qualifier::VaryingIn | Qualifier::VaryingOut
        );
        if io && matches!(ty.basic, BasicType::Bool | BasicType::Int) {
            self.error(loc, "cannot be bool or int", qualifier.as_str(), "");
        }
        ty
    }

    /// Declares `name` without initializer and appends its symbol to `list`.
    /// An empty name declares nothing, as in `struct S { .. };`.
    pub(crate) fn parse_declarator(
        &mut self,
        list: Option<Node>,
        ty: &Type,
        loc: SourceLoc,
        name: &str,
    ) -> Option<Node> {
        let mut ty = ty.clone();
        let mut id = SymbolID::dummy();
        if !name.is_empty() {
            let _ = self.struct_qualifier_check(loc, &ty);
            let _ = self.non_init_const_check(loc, name, &mut ty, false);
            if let Ok(declared) = self.non_init_check(loc, name, &ty) {
                id = declared;
            }
        }
        grow_aggregate(list, Some(Node::symbol(id, name, ty, loc)), loc)
    }

    pub(crate) fn parse_array_declarator(
        &mut self,
        list: Option<Node>,
        ty: &Type,
        loc: SourceLoc,
        name: &str,
        bracket_loc: SourceLoc,
        size: &Node,
    ) -> Option<Node> {
        let mut ty = ty.clone();
        let _ = self.struct_qualifier_check(loc, &ty);
        let _ = self.non_init_const_check(loc, name, &mut ty, true);
        if self.array_type_check(bracket_loc, &ty).is_ok() {
            let _ = self.array_qualifier_check(bracket_loc, &ty);
        }
        ty.array_size = self.array_size_check(bracket_loc, size).unwrap_or(1);

        let id = self.array_check(loc, name, &ty).unwrap_or(SymbolID::dummy());
        grow_aggregate(list, Some(Node::symbol(id, name, ty, loc)), loc)
    }

    /// `const` declarations contribute no node, a failed initializer
    /// leaves `list` unchanged.
    pub(crate) fn parse_init_declarator(
        &mut self,
        list: Option<Node>,
        ty: &Type,
        loc: SourceLoc,
        name: &str,
        init_loc: SourceLoc,
        init: Node,
    ) -> Option<Node> {
        let _ = self.struct_qualifier_check(loc, ty);
        match self.execute_initializer(loc, name, ty, init) {
            Ok(Some(node)) => grow_aggregate(list, Some(node), init_loc),
            Ok(None) | Err(()) => list,
        }
    }

    pub(crate) fn parse_invariant_declaration(&mut self, loc: SourceLoc, name: &str) -> Option<Node> {
        let Some(id) = self.symbol_table.find(name) else {
            self.error(loc, "undeclared identifier declared as invariant", name, "");
            return None;
        };
        if name == "gl_FrontFacing" {
            self.error(loc, "identifier should not be declared as invariant", name, "");
            return None;
        }
        let variable = self.named_variable(loc, name, Some(id));
        Some(Node::symbol(variable.id, name, variable.ty, loc))
    }

    pub(crate) fn set_default_precision(&mut self, loc: SourceLoc, precision: Precision, ty: &Type) {
        let fragment = self.shader_type == ShaderType::Fragment;
        if precision == Precision::High && fragment && !self.resources.fragment_precision_high {
            self.error(loc, "precision is not supported in fragment shader", "highp", "");
        }
        let scalar = ty.is_scalar() && !ty.is_array();
        if !scalar || !self.symbol_table.set_default_precision(ty.basic, precision) {
            self.error(loc, "illegal type argument for default precision qualifier", ty.basic_string(), "");
        }
    }

    pub(crate) fn enter_struct_declaration(&mut self, loc: SourceLoc) -> Result<(), ()> {
        self.struct_nesting += 1;
        if self.struct_nesting > 1 {
            self.error(loc, "", "Embedded struct definitions are not allowed", "");
            return Err(());
        }
        Ok(())
    }

    pub(crate) fn exit_struct_declaration(&mut self) {
        self.struct_nesting = self.struct_nesting.saturating_sub(1);
    }

    /// WebGL limits how deeply struct types may reference each other.
    fn struct_nesting_check(&mut self, loc: SourceLoc, field: &Field) -> Result<(), ()> {
        if self.spec != ShaderSpec::WebGL {
            return Ok(());
        }
        let Some(structure) = &field.ty.structure else {
            return Ok(());
        };
        if 1 + structure.deepest_nesting() > WEBGL_MAX_STRUCT_NESTING {
            let reason = format!(
                "Reference of struct type {} exceeds maximum allowed nesting level of {}",
                structure.name, WEBGL_MAX_STRUCT_NESTING
            );
            self.error(loc, reason, &field.name, "");
            return Err(());
        }
        Ok(())
    }

    /// Fields declared by one `spec name, name[size];` member line.
    pub(crate) fn add_struct_declarator_list(
        &mut self,
        spec: &Type,
        spec_loc: SourceLoc,
        declarators: Vec<(String, SourceLoc, u32)>,
    ) -> Vec<Field> {
        if let Some((name, _, _)) = declarators.first() {
            let _ = self.void_check(spec_loc, name, spec);
        }

        let mut fields = Vec::with_capacity(declarators.len());
        for (name, loc, array_size) in declarators {
            let mut ty = spec.clone();
            ty.array_size = array_size;
            if array_size > 0 {
                let _ = self.array_type_check(spec_loc, spec);
            }
            if spec.is_array() {
                ty.array_size = spec.array_size;
            }
            let field = Field { name, ty, loc };
            let _ = self.struct_nesting_check(spec_loc, &field);
            fields.push(field);
        }
        fields
    }

    /// Finishes a struct definition, a named struct becomes a type symbol.
    pub(crate) fn add_structure(&mut self, name_loc: SourceLoc, name: String, fields: Vec<Field>) -> Type {
        let invalid: Vec<(SourceLoc, Qualifier)> = fields
            .iter()
            .filter(|field| !matches!(field.ty.qualifier, Qualifier::Global | Qualifier::Temporary))
            .map(|field| (field.loc, field.ty.qualifier))
            .collect();

        let structure = Rc::new(StructType::new(name.clone(), fields));
        let ty = Type::structure(structure, Qualifier::Temporary);

        if !name.is_empty() {
            let _ = self.reserved_check(name_loc, &name);
            let symbol = Symbol::Struct(StructSymbol { name: name.clone(), ty: ty.clone() });
            if self.symbol_table.insert(symbol).is_none() {
                self.error(name_loc, "redefinition", &name, "struct");
            }
        }
        for (loc, qualifier) in invalid {
            self.error(loc, "invalid qualifier on struct member", qualifier.as_str(), "");
        }

        self.exit_struct_declaration();
        ty
    }

    /// Checks the return type and opens the scope holding the parameters.
    pub(crate) fn function_header(&mut self, loc: SourceLoc, ret: &Type) {
        if !matches!(ret.qualifier, Qualifier::Global | Qualifier::Temporary) {
            self.error(loc, "no qualifiers allowed for function return", ret.qualifier.as_str(), "");
        }
        let _ = self.struct_qualifier_check(loc, ret);
        self.symbol_table.push();
    }

    /// No overload of a built-in name may be declared or defined.
    pub(crate) fn builtin_function_check(&mut self, loc: SourceLoc, name: &str) -> Result<(), ()> {
        if self.symbol_table.is_builtin_function(name) {
            self.error(loc, "built-in functions cannot be redefined", name, "");
            return Err(());
        }
        Ok(())
    }

    /// Records a prototype in the scope enclosing the parameters.
    /// Redeclarations must agree on return type and parameter qualifiers.
    pub(crate) fn function_prototype(&mut self, loc: SourceLoc, function: &Function) {
        let previous = self
            .symbol_table
            .find(&function.mangled)
            .and_then(|id| self.symbol_table.function(id))
            .cloned();
        if let Some(previous) = previous {
            if previous.ret != function.ret {
                let ret = function.ret.basic_string();
                self.error(loc, "overloaded functions must have the same return type", ret, "");
            }
            for (prev, param) in previous.params.iter().zip(&function.params) {
                if prev.ty.qualifier != param.ty.qualifier {
                    let qualifier = param.ty.qualifier.as_str();
                    self.error(loc, "overloaded functions must have the same parameter qualifiers", qualifier, "");
                }
            }
        }

        let existing = self.symbol_table.find(&function.name);
        if let Some(id) = existing {
            if !self.symbol_table.get(id).is_function() {
                self.error(loc, "redefinition", &function.name, "function");
            }
        }

        let outer = self.symbol_table.current_level().saturating_sub(1);
        let id = match self.symbol_table.insert_at(outer, Symbol::Function(function.clone())) {
            Some(id) => Some(id),
            None => self.symbol_table.find_at(outer, &function.mangled),
        };
        if let (None, Some(id)) = (existing, id) {
            self.symbol_table.insert_unmangled(outer, id);
        }
    }

    /// `Prototype` node of a declaration without body, closes the parameter scope.
    pub(crate) fn prototype_declaration(&mut self, loc: SourceLoc, function: &Function) -> Node {
        let mut aggregate = Aggregate::new(Op::Prototype);
        aggregate.name = function.mangled.clone();
        for param in &function.params {
            let name = param.name.as_deref().unwrap_or("");
            aggregate.children.push(Node::symbol(SymbolID::dummy(), name, param.ty.clone(), loc));
        }
        self.symbol_table.pop();
        Node::aggregate(aggregate, function.ret.clone(), loc)
    }

    /// Marks the function defined, declares its parameters and
    /// returns their `Parameters` node.
    pub(crate) fn begin_function_definition(&mut self, loc: SourceLoc, function: &Function) -> Node {
        let defined = match self
            .symbol_table
            .find(&function.mangled)
            .and_then(|id| self.symbol_table.function_mut(id))
        {
            Some(previous) => std::mem::replace(&mut previous.defined, true),
            None => false,
        };
        if defined {
            self.error(loc, "function already has a body", &function.name, "");
        }

        if function.name == "main" {
            if !function.params.is_empty() {
                self.error(loc, "function cannot take any parameter(s)", &function.name, "");
            }
            if function.ret.basic != BasicType::Void {
                self.error(loc, "", function.ret.basic_string(), "main function cannot return a value");
            }
        }

        self.current_function_type = Some(function.ret.clone());
        self.function_returns_value = false;

        let mut params = Aggregate::new(Op::Parameters);
        for param in &function.params {
            let node = match &param.name {
                Some(name) => {
                    let variable = Variable::new(name, param.ty.clone());
                    let id = match self.symbol_table.insert(Symbol::Variable(variable)) {
                        Some(id) => id,
                        None => {
                            self.error(loc, "redefinition", name, "");
                            SymbolID::dummy()
                        }
                    };
                    Node::symbol(id, name, param.ty.clone(), loc)
                }
                None => Node::symbol(SymbolID::dummy(), "", param.ty.clone(), loc),
            };
            params.children.push(node);
        }
        self.loop_nesting = 0;
        Node::aggregate(params, Type::void(), loc)
    }

    pub(crate) fn end_function_definition(
        &mut self,
        loc: SourceLoc,
        function: &Function,
        params: Node,
        body: Option<Node>,
    ) -> Node {
        if function.ret.basic != BasicType::Void && !self.function_returns_value {
            self.error(loc, "function does not return a value:", "", &function.name);
        }

        let mut aggregate = Aggregate::new(Op::Function);
        aggregate.name = function.mangled.clone();
        aggregate.optimize = self.pragma.optimize;
        aggregate.debug = self.pragma.debug;
        aggregate.children.push(params);
        aggregate.children.extend(body);

        self.symbol_table.pop();
        self.current_function_type = None;
        Node::aggregate(aggregate, function.ret.clone(), loc)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CompileOptions, ShaderSpec, ShaderType};
    use crate::ir::Op;
    use crate::parse::tests::parse_source;

    #[test]
    fn global_declarations_take_global_qualifier() {
        let (ctx, root) = parse_source(ShaderType::Vertex, "float a, b[2];\nuniform vec4 u;");
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let root = root.unwrap();
        let decl = root.as_aggregate().unwrap().children[0].as_aggregate().unwrap();
        assert_eq!(decl.op, Op::Declaration);
        assert_eq!(decl.children.len(), 2);
        assert_eq!(decl.children[1].ty.array_size, 2);
        assert_eq!(decl.children[0].ty.complete_string(), "highp float");
    }

    #[test]
    fn qualifier_restrictions() {
        let (ctx, _) = parse_source(
            ShaderType::Fragment,
            "precision mediump float;\nattribute vec4 a;\nvarying bool b;\nconst float c;",
        );
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'attribute' :  supported in vertex shaders only"), "{}", log);
        assert!(log.contains("'varying' : cannot be bool or int"), "{}", log);
        assert!(log.contains("'c' : variables with qualifier 'const' must be initialized"), "{}", log);
        assert_eq!(ctx.num_errors(), 3);
    }

    #[test]
    fn local_storage_qualifiers_are_rejected() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "void main() { uniform float u; }");
        assert!(ctx.diagnostics.info_log().contains("'uniform' : only allowed at global scope"));
    }

    #[test]
    fn fragment_float_needs_precision() {
        let (ctx, _) = parse_source(ShaderType::Fragment, "float f;");
        assert!(ctx.diagnostics.info_log().contains("No precision specified for (float)"));
        let (ctx, _) = parse_source(ShaderType::Fragment, "precision highp float;");
        assert!(ctx.diagnostics.info_log().contains("'highp' : precision is not supported in fragment shader"));
        let (ctx, _) = parse_source(ShaderType::Vertex, "precision mediump vec2;");
        assert!(ctx
            .diagnostics
            .info_log()
            .contains("illegal type argument for default precision qualifier"));
    }

    #[test]
    fn struct_rules() {
        let source = "struct S { float x; float x; };\nstruct T { struct U { float y; } u; };\nstruct S { int z; };";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'struct' : duplicate field name in structure: x"), "{}", log);
        assert!(log.contains("'Embedded struct definitions are not allowed' : "), "{}", log);
        assert!(log.contains("'S' : redefinition struct"), "{}", log);
    }

    #[test]
    fn webgl_struct_nesting_limit() {
        let source = "struct A { float x; };\nstruct B { A a; };\nstruct C { B b; };\nstruct D { C c; };\nstruct E { D d; };";
        let mut options = CompileOptions::new(ShaderType::Vertex, ShaderSpec::WebGL);
        options.validate_loop_indexing = false;
        let (ctx, _) = crate::parse::tests::parse_with(&options, source);
        let log = ctx.diagnostics.info_log();
        assert!(
            log.contains("'d' : Reference of struct type D exceeds maximum allowed nesting level of 4"),
            "{}",
            log
        );
        assert_eq!(ctx.num_errors(), 1);
    }

    #[test]
    fn function_redeclaration_rules() {
        let source = "float f(float x);\nint f(float x);\nvoid g(out float x);\nvoid g(in float x);\nvoid h() {}\nvoid h() {}";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("overloaded functions must have the same return type"), "{}", log);
        assert!(log.contains("'in' : overloaded functions must have the same parameter qualifiers"), "{}", log);
        assert!(log.contains("'h' : function already has a body"), "{}", log);
    }

    #[test]
    fn function_definitions() {
        let source = "float twice(float x) { return x * 2.0; }\nvoid main() { float y = twice(1.0); }";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        assert_eq!(ctx.num_errors(), 0, "{}", ctx.diagnostics.info_log());
        let root = root.unwrap();
        let function = root.as_aggregate().unwrap().children[0].as_aggregate().unwrap();
        assert_eq!(function.op, Op::Function);
        assert_eq!(function.name, "twice(f1;");
        assert_eq!(function.children[0].as_aggregate().unwrap().op, Op::Parameters);
    }

    #[test]
    fn main_and_builtin_rules() {
        let source = "float sin(float x) { return x; }\nint main(float a) { }";
        let (ctx, _) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'sin' : built-in functions cannot be redefined"), "{}", log);
        assert!(log.contains("'main' : function cannot take any parameter(s)"), "{}", log);
        assert!(log.contains("'int' :  main function cannot return a value"), "{}", log);
        assert!(log.contains("function does not return a value: main"), "{}", log);
    }

    #[test]
    fn builtin_names_reject_every_overload() {
        let source = "float sin(vec2 a, vec2 b) { return 1.0; }\nfloat cos(float a);\nvoid main() { }";
        let (ctx, _) = parse_source(ShaderType::Fragment, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("0(1): 'sin' : built-in functions cannot be redefined"), "{}", log);
        assert!(log.contains("0(2): 'cos' : built-in functions cannot be redefined"), "{}", log);
        assert_eq!(ctx.num_errors(), 2, "{}", log);
    }

    #[test]
    fn void_parameters() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "void f(void);\nvoid g(float a, void);\nvoid h(void x);");
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'void' : cannot be an argument type except for '(void)'"), "{}", log);
        assert!(log.contains("'x' : illegal use of type 'void'"), "{}", log);
        assert_eq!(ctx.num_errors(), 2);
    }

    #[test]
    fn variable_name_clashes_with_function() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "float f;\nvoid f();");
        assert!(ctx.diagnostics.info_log().contains("'f' : redefinition function"));
    }

    #[test]
    fn invariant_declarations() {
        let source = "varying vec4 v;\ninvariant v;\ninvariant missing;\ninvariant gl_Position;";
        let (ctx, root) = parse_source(ShaderType::Vertex, source);
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'missing' : undeclared identifier declared as invariant"), "{}", log);
        assert_eq!(ctx.num_errors(), 1);
        let root = root.unwrap();
        let invariant = root.as_aggregate().unwrap().children[1].as_aggregate().unwrap();
        assert_eq!(invariant.op, Op::InvariantDeclaration);
    }

    #[test]
    fn array_declarations() {
        let (ctx, _) = parse_source(ShaderType::Vertex, "const float a[2];\nattribute vec4 b[2];\nfloat c[];\nfloat d[0];");
        let log = ctx.diagnostics.info_log();
        assert!(log.contains("arrays may not be declared constant since they cannot be initialized"), "{}", log);
        assert!(log.contains("cannot declare arrays of this qualifier"), "{}", log);
        assert!(log.contains("'c' : unsized array declarations not supported"), "{}", log);
        assert!(log.contains("array size must be greater than zero"), "{}", log);
    }
}
