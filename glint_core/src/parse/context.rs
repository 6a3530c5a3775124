use crate::builtins::insert_builtins;
use crate::config::{CompileOptions, Resources, ShaderSpec, ShaderType};
use crate::error::{Diagnostics, Severity};
use crate::extension::{ExtensionBehavior, ExtensionTable, Pragma};
use crate::intermediate::add_assign;
use crate::ir::{Node, NodeKind, Op};
use crate::symbol_table::{Symbol, SymbolID, SymbolTable, Variable};
use crate::text::SourceLoc;
use crate::types::{BasicType, Precision, Qualifier, Type};
use std::borrow::Cow;

const MAX_ARRAY_SIZE: i32 = 65536;

/// State shared by every semantic action of one parse.
/// Checks report their diagnostic and return `Err(())`,
/// the caller then continues with a recovery value.
pub struct ParseContext {
    pub symbol_table: SymbolTable,
    pub diagnostics: Diagnostics,
    pub extensions: ExtensionTable,
    pub pragma: Pragma,
    pub shader_type: ShaderType,
    pub spec: ShaderSpec,
    pub resources: Resources,
    pub(crate) loop_nesting: u32,
    pub(crate) struct_nesting: u32,
    /// return type of the function whose body is being parsed
    pub(crate) current_function_type: Option<Type>,
    pub(crate) function_returns_value: bool,
}

impl ParseContext {
    /// Context with the built-in level populated for `options.shader_type`
    /// and an empty global level pushed on top.
    pub fn new(options: &CompileOptions, diagnostics: Diagnostics) -> ParseContext {
        let mut symbol_table = SymbolTable::new();
        symbol_table.push();
        insert_builtins(&mut symbol_table, options.shader_type, &options.resources);
        symbol_table.push();

        ParseContext {
            symbol_table,
            diagnostics,
            extensions: ExtensionTable::from_resources(&options.resources),
            pragma: Pragma::default(),
            shader_type: options.shader_type,
            spec: options.spec,
            resources: options.resources.clone(),
            loop_nesting: 0,
            struct_nesting: 0,
            current_function_type: None,
            function_returns_value: false,
        }
    }

    pub fn num_errors(&self) -> usize {
        self.diagnostics.num_errors()
    }

    pub(crate) fn error(
        &mut self,
        loc: SourceLoc,
        reason: impl Into<Cow<'static, str>>,
        token: &str,
        extra: &str,
    ) {
        self.diagnostics.write_info(Severity::Error, loc, reason, token, extra);
    }

    pub(crate) fn warning(
        &mut self,
        loc: SourceLoc,
        reason: impl Into<Cow<'static, str>>,
        token: &str,
        extra: &str,
    ) {
        self.diagnostics.write_info(Severity::Warning, loc, reason, token, extra);
    }

    pub(crate) fn assign_error(&mut self, loc: SourceLoc, op: &str, left: &Type, right: &Type) {
        let extra = format!(
            "cannot convert from '{}' to '{}'",
            right.complete_string(),
            left.complete_string()
        );
        self.error(loc, "", op, &extra);
    }

    pub(crate) fn unary_op_error(&mut self, loc: SourceLoc, op: &str, operand: &Type) {
        let extra = format!(
            "no operation '{}' exists that takes an operand of type {} (or there is no acceptable conversion)",
            op,
            operand.complete_string()
        );
        self.error(loc, " wrong operand type", op, &extra);
    }

    pub(crate) fn binary_op_error(&mut self, loc: SourceLoc, op: &str, left: &Type, right: &Type) {
        let extra = format!(
            "no operation '{}' exists that takes a left-hand operand of type '{}' and a right operand of type '{}' (or there is no acceptable conversion)",
            op,
            left.complete_string(),
            right.complete_string()
        );
        self.error(loc, " wrong operand types ", op, &extra);
    }

    pub(crate) fn precision_check(
        &mut self,
        loc: SourceLoc,
        precision: Precision,
        basic: BasicType,
    ) -> Result<(), ()> {
        if precision != Precision::Undefined {
            return Ok(());
        }
        match basic {
            BasicType::Float => self.error(loc, "No precision specified for (float)", "", ""),
            BasicType::Int => self.error(loc, "No precision specified (int)", "", ""),
            _ => return Ok(()),
        }
        Err(())
    }

    /// Checks that `node` can be written through with `op`.
    /// Index and struct selections are writable when their base is,
    /// swizzles additionally must not repeat a component.
    pub(crate) fn lvalue_check(&mut self, loc: SourceLoc, op: &str, node: &Node) -> Result<(), ()> {
        if let NodeKind::Binary { op: bin_op, left, right } = &node.kind {
            return match bin_op {
                Op::IndexDirect | Op::IndexIndirect | Op::IndexDirectStruct => {
                    self.lvalue_check(loc, op, left)
                }
                Op::VectorSwizzle => {
                    self.lvalue_check(loc, op, left)?;
                    let mut seen = [false; 4];
                    let offsets = right.as_aggregate().map(|a| a.children.as_slice()).unwrap_or(&[]);
                    for offset in offsets {
                        let idx = offset.const_value().map_or(0, |v| v.as_int()).clamp(0, 3) as usize;
                        if seen[idx] {
                            self.error(loc, " l-value of swizzle cannot have duplicate components", op, "");
                            return Err(());
                        }
                        seen[idx] = true;
                    }
                    Ok(())
                }
                _ => {
                    self.error(loc, " l-value required", op, "");
                    Err(())
                }
            };
        }

        let message = match node.qualifier() {
            Qualifier::Const | Qualifier::ConstReadOnly => Some("can't modify a const"),
            Qualifier::Attribute => Some("can't modify an attribute"),
            Qualifier::Uniform => Some("can't modify a uniform"),
            Qualifier::VaryingIn | Qualifier::InvariantVaryingIn => Some("can't modify a varying"),
            Qualifier::FragCoord => Some("can't modify gl_FragCoord"),
            Qualifier::FrontFacing => Some("can't modify gl_FrontFacing"),
            Qualifier::PointCoord => Some("can't modify gl_PointCoord"),
            _ if node.basic().is_sampler() => Some("can't modify a sampler"),
            _ if node.basic() == BasicType::Void => Some("can't modify void"),
            _ => None,
        };

        let symbol = node.as_symbol().map(|(_, name)| name);
        match (message, symbol) {
            (None, Some(_)) => Ok(()),
            (None, None) => {
                self.error(loc, " l-value required", op, "");
                Err(())
            }
            (Some(message), Some(name)) => {
                let extra = format!("\"{}\" ({})", name, message);
                self.error(loc, " l-value required", op, &extra);
                Err(())
            }
            (Some(message), None) => {
                let extra = format!("({})", message);
                self.error(loc, " l-value required", op, &extra);
                Err(())
            }
        }
    }

    pub(crate) fn const_check(&mut self, node: &Node) -> Result<(), ()> {
        if node.ty.is_const() {
            return Ok(());
        }
        self.error(node.loc, "constant expression required", "", "");
        Err(())
    }

    pub(crate) fn integer_check(&mut self, node: &Node, token: &str) -> Result<(), ()> {
        if node.ty.is_scalar_int() {
            return Ok(());
        }
        self.error(node.loc, "integer expression required", token, "");
        Err(())
    }

    pub(crate) fn global_check(&mut self, loc: SourceLoc, token: &str) -> Result<(), ()> {
        if self.symbol_table.at_global_level() {
            return Ok(());
        }
        self.error(loc, "only allowed at global scope", token, "");
        Err(())
    }

    /// `gl_` names and, under WebGL, `webgl_` and `_webgl_` names belong to the implementation.
    pub(crate) fn reserved_check(&mut self, loc: SourceLoc, name: &str) -> Result<(), ()> {
        if self.symbol_table.at_builtin_level() {
            return Ok(());
        }
        let mut prefixes = vec!["gl_"];
        if self.spec == ShaderSpec::WebGL {
            prefixes.extend(["webgl_", "_webgl_"]);
        }
        if let Some(prefix) = prefixes.into_iter().find(|prefix| name.starts_with(prefix)) {
            self.error(loc, "reserved built-in name", prefix, "");
            return Err(());
        }
        if name.contains("__") {
            self.error(
                loc,
                "identifiers containing two consecutive underscores (__) are reserved as possible future keywords",
                name,
                "",
            );
            return Err(());
        }
        Ok(())
    }

    pub(crate) fn void_check(&mut self, loc: SourceLoc, name: &str, ty: &Type) -> Result<(), ()> {
        if ty.basic != BasicType::Void {
            return Ok(());
        }
        self.error(loc, "illegal use of type 'void'", name, "");
        Err(())
    }

    /// condition expressions must be scalar `bool`
    pub(crate) fn bool_check(&mut self, loc: SourceLoc, ty: &Type) -> Result<(), ()> {
        if ty.basic == BasicType::Bool && ty.is_scalar() && !ty.is_array() {
            return Ok(());
        }
        self.error(loc, "boolean expression expected", "", "");
        Err(())
    }

    pub(crate) fn sampler_check(&mut self, loc: SourceLoc, ty: &Type, reason: &'static str) -> Result<(), ()> {
        if ty.basic == BasicType::Struct {
            if ty.contains_sampler() {
                self.error(loc, reason, ty.basic_string(), "(structure contains a sampler)");
                return Err(());
            }
            return Ok(());
        }
        if ty.is_sampler() {
            self.error(loc, reason, ty.basic_string(), "");
            return Err(());
        }
        Ok(())
    }

    pub(crate) fn struct_qualifier_check(&mut self, loc: SourceLoc, ty: &Type) -> Result<(), ()> {
        let io = matches!(
            ty.qualifier,
            Qualifier::VaryingIn | Qualifier::VaryingOut | Qualifier::Attribute
        );
        if io && ty.basic == BasicType::Struct {
            self.error(loc, "cannot be used with a structure", ty.qualifier.as_str(), "");
            return Err(());
        }
        if ty.qualifier != Qualifier::Uniform {
            self.sampler_check(loc, ty, "samplers must be uniform")?;
        }
        Ok(())
    }

    pub(crate) fn parameter_sampler_check(
        &mut self,
        loc: SourceLoc,
        qualifier: Qualifier,
        ty: &Type,
    ) -> Result<(), ()> {
        let output = matches!(qualifier, Qualifier::Out | Qualifier::InOut);
        if output && ty.is_sampler() {
            self.error(loc, "samplers cannot be output parameters", ty.basic_string(), "");
            return Err(());
        }
        Ok(())
    }

    /// Size of an array declarator, `Err` after reporting when it
    /// is not a constant integer in `1..=65536`.
    pub(crate) fn array_size_check(&mut self, loc: SourceLoc, expr: &Node) -> Result<u32, ()> {
        let size = match expr.const_value() {
            Some(value) if expr.ty.is_scalar_int() => value.as_int(),
            _ => {
                self.error(loc, "array size must be a constant integer expression", "", "");
                return Err(());
            }
        };
        let reason = match size {
            size if size < 0 => "array size must be non-negative",
            0 => "array size must be greater than zero",
            size if size > MAX_ARRAY_SIZE => "array size too large",
            size => return Ok(size as u32),
        };
        self.error(loc, reason, "", "");
        Err(())
    }

    pub(crate) fn array_qualifier_check(&mut self, loc: SourceLoc, ty: &Type) -> Result<(), ()> {
        if matches!(ty.qualifier, Qualifier::Attribute | Qualifier::Const) {
            self.error(loc, "cannot declare arrays of this qualifier", &ty.complete_string(), "");
            return Err(());
        }
        Ok(())
    }

    pub(crate) fn array_type_check(&mut self, loc: SourceLoc, ty: &Type) -> Result<(), ()> {
        if ty.is_array() {
            self.error(loc, "cannot declare arrays of arrays", &ty.complete_string(), "");
            return Err(());
        }
        Ok(())
    }

    /// Declares the array `name` of type `ty`, or completes an earlier
    /// unsized declaration of it in the same scope.
    pub(crate) fn array_check(&mut self, loc: SourceLoc, name: &str, ty: &Type) -> Result<SymbolID, ()> {
        let current = self.symbol_table.current_level();
        let existing = self.symbol_table.find_with_level(name).filter(|(_, level)| *level == current);

        let id = match existing {
            None => {
                self.reserved_check(loc, name)?;
                match self.symbol_table.insert(Symbol::Variable(Variable::new(name, ty.clone()))) {
                    Some(id) => id,
                    None => {
                        self.error(loc, "INTERNAL ERROR inserting new symbol", name, "");
                        return Err(());
                    }
                }
            }
            Some((id, _)) => {
                let reason = match self.symbol_table.variable(id) {
                    None => Some("variable expected"),
                    Some(var) if !var.ty.is_array() => Some("redeclaring non-array as array"),
                    Some(var) if var.ty.array_size > 0 => Some("redeclaration of array with size"),
                    Some(var) if var.ty.element_type() != ty.element_type() => {
                        Some("redeclaration of array with a different type")
                    }
                    Some(_) => None,
                };
                if let Some(reason) = reason {
                    self.error(loc, reason, name, "");
                    return Err(());
                }
                if let Symbol::Variable(var) = self.symbol_table.get_mut(id) {
                    var.ty.array_size = ty.array_size;
                }
                id
            }
        };

        self.void_check(loc, name, ty)?;
        Ok(id)
    }

    /// `const` declarations need an initializer, the qualifier is dropped
    /// so the declaration can still be used.
    pub(crate) fn non_init_const_check(
        &mut self,
        loc: SourceLoc,
        name: &str,
        ty: &mut Type,
        array: bool,
    ) -> Result<(), ()> {
        if ty.qualifier != Qualifier::Const {
            return Ok(());
        }
        ty.qualifier = Qualifier::Temporary;
        let contains_arrays = ty.structure.as_ref().is_some_and(|s| s.contains_arrays());
        let reason = if array {
            "arrays may not be declared constant since they cannot be initialized"
        } else if contains_arrays {
            "structures containing arrays may not be declared constant since they cannot be initialized"
        } else {
            "variables with qualifier 'const' must be initialized"
        };
        self.error(loc, reason, name, "");
        Err(())
    }

    /// Declares `name` without an initializer.
    pub(crate) fn non_init_check(&mut self, loc: SourceLoc, name: &str, ty: &Type) -> Result<SymbolID, ()> {
        let _ = self.reserved_check(loc, name);
        let Some(id) = self.symbol_table.insert(Symbol::Variable(Variable::new(name, ty.clone()))) else {
            self.error(loc, "redefinition", name, "");
            return Err(());
        };
        self.void_check(loc, name, ty)?;
        Ok(id)
    }

    /// Resolves the qualifier of a parameter declared with `qualifier`
    /// (`const` or none) and direction `param_qualifier`.
    pub(crate) fn param_check(
        &mut self,
        loc: SourceLoc,
        qualifier: Qualifier,
        param_qualifier: Qualifier,
        ty: &mut Type,
    ) -> Result<(), ()> {
        if qualifier != Qualifier::Const && qualifier != Qualifier::Temporary {
            self.error(loc, "qualifier not allowed on function parameter", qualifier.as_str(), "");
            return Err(());
        }
        if qualifier == Qualifier::Const && param_qualifier != Qualifier::In {
            self.error(loc, "qualifier not allowed with ", qualifier.as_str(), param_qualifier.as_str());
            return Err(());
        }
        ty.qualifier = match qualifier {
            Qualifier::Const => Qualifier::ConstReadOnly,
            _ => param_qualifier,
        };
        Ok(())
    }

    /// Built-ins gated on `extension` may only be used when it is enabled,
    /// `warn` behavior allows the use with a warning.
    pub(crate) fn extension_check(&mut self, loc: SourceLoc, extension: &str) -> Result<(), ()> {
        match self.extensions.get(extension) {
            None => {
                self.error(loc, "extension", extension, "is not supported");
                Err(())
            }
            Some(ExtensionBehavior::Disable | ExtensionBehavior::Undefined) => {
                self.error(loc, "extension", extension, "is disabled");
                Err(())
            }
            Some(ExtensionBehavior::Warn) => {
                self.warning(loc, "extension", extension, "is being used");
                Ok(())
            }
            Some(ExtensionBehavior::Enable | ExtensionBehavior::Require) => Ok(()),
        }
    }

    pub(crate) fn supports_extension(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    pub(crate) fn is_extension_enabled(&self, extension: &str) -> bool {
        self.extensions.is_enabled(extension)
    }

    /// Declares `name` and initializes it with `init`.
    /// `const` variables take the initializer value and produce no node,
    /// others produce an `Initialize` node.
    pub(crate) fn execute_initializer(
        &mut self,
        loc: SourceLoc,
        name: &str,
        ty: &Type,
        init: Node,
    ) -> Result<Option<Node>, ()> {
        self.reserved_check(loc, name)?;
        self.void_check(loc, name, ty)?;
        let Some(id) = self.symbol_table.insert(Symbol::Variable(Variable::new(name, ty.clone()))) else {
            self.error(loc, "redefinition", name, "");
            return Err(());
        };

        let qualifier = ty.qualifier;
        if !matches!(qualifier, Qualifier::Temporary | Qualifier::Global | Qualifier::Const) {
            self.error(loc, " cannot initialize this type of qualifier ", qualifier.as_str(), "");
            return Err(());
        }

        if qualifier == Qualifier::Const {
            let extra = format!("'{}'", ty.complete_string());
            if !init.ty.is_const() {
                self.error(loc, " assigning non-constant to", "=", &extra);
                self.demote_to_temporary(id);
                return Err(());
            }
            if *ty != init.ty {
                self.error(loc, " non-matching types for const initializer ", qualifier.as_str(), "");
                self.demote_to_temporary(id);
                return Err(());
            }
            let value = match (&init.kind, init.as_symbol()) {
                (NodeKind::Constant(values), _) => Some(values.clone()),
                (_, Some((source, _))) => {
                    self.symbol_table.variable(source).and_then(|var| var.const_value.clone())
                }
                _ => None,
            };
            let Some(value) = value else {
                self.error(loc, " cannot assign to", "=", &extra);
                self.demote_to_temporary(id);
                return Err(());
            };
            if let Symbol::Variable(var) = self.symbol_table.get_mut(id) {
                var.const_value = Some(value);
            }
            return Ok(None);
        }

        let symbol = Node::symbol(id, name, ty.clone(), loc);
        match add_assign(Op::Initialize, symbol, init, loc) {
            Ok(node) => Ok(Some(node)),
            Err((symbol, init)) => {
                self.assign_error(loc, "=", &symbol.ty, &init.ty);
                Err(())
            }
        }
    }

    fn demote_to_temporary(&mut self, id: SymbolID) {
        if let Symbol::Variable(var) = self.symbol_table.get_mut(id) {
            var.ty.qualifier = Qualifier::Temporary;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ir::ConstValue;
    use std::rc::Rc;

    pub(crate) fn context(shader_type: ShaderType) -> ParseContext {
        let options = CompileOptions::new(shader_type, ShaderSpec::Gles2);
        ParseContext::new(&options, Diagnostics::new())
    }

    fn loc() -> SourceLoc {
        SourceLoc::new(0, 3)
    }

    fn float() -> Type {
        Type::new(BasicType::Float, Precision::High, Qualifier::Global, 1, false)
    }

    #[test]
    fn reserved_prefixes() {
        let mut ctx = context(ShaderType::Vertex);
        assert!(ctx.reserved_check(loc(), "gl_Thing").is_err());
        assert!(ctx.reserved_check(loc(), "a__b").is_err());
        assert!(ctx.reserved_check(loc(), "webgl_x").is_ok());
        ctx.spec = ShaderSpec::WebGL;
        assert!(ctx.reserved_check(loc(), "webgl_x").is_err());
        assert!(ctx.reserved_check(loc(), "_webgl_x").is_err());

        let log = ctx.diagnostics.info_log();
        assert!(log.contains("ERROR: 0(3): 'gl_' : reserved built-in name"));
        assert!(log.contains("'webgl_' : reserved built-in name"));
        assert_eq!(ctx.num_errors(), 4);
    }

    #[test]
    fn lvalue_messages_name_the_symbol() {
        let mut ctx = context(ShaderType::Vertex);
        let uniform = float().with_qualifier(Qualifier::Uniform);
        let node = Node::symbol(SymbolID::new(0), "u", uniform, loc());
        assert!(ctx.lvalue_check(loc(), "assign", &node).is_err());
        assert_eq!(
            ctx.diagnostics.errors()[0].diagnostic().render(Severity::Error),
            "ERROR: 0(3): 'assign' :  l-value required \"u\" (can't modify a uniform)"
        );

        let constant = Node::const_float(1.0, loc());
        assert!(ctx.lvalue_check(loc(), "++", &constant).is_err());
        assert!(ctx.diagnostics.info_log().contains("'++' :  l-value required (can't modify a const)"));

        let writable = Node::symbol(SymbolID::new(0), "x", float(), loc());
        assert!(ctx.lvalue_check(loc(), "assign", &writable).is_ok());
    }

    #[test]
    fn array_sizes() {
        let mut ctx = context(ShaderType::Vertex);
        assert_eq!(ctx.array_size_check(loc(), &Node::const_int(4, loc())), Ok(4));
        assert!(ctx.array_size_check(loc(), &Node::const_int(0, loc())).is_err());
        assert!(ctx.array_size_check(loc(), &Node::const_int(-2, loc())).is_err());
        assert!(ctx.array_size_check(loc(), &Node::const_int(65537, loc())).is_err());
        assert!(ctx.array_size_check(loc(), &Node::const_float(2.0, loc())).is_err());

        let log = ctx.diagnostics.info_log();
        assert!(log.contains("array size must be greater than zero"));
        assert!(log.contains("array size must be non-negative"));
        assert!(log.contains("array size too large"));
        assert!(log.contains("array size must be a constant integer expression"));
    }

    #[test]
    fn const_initializer_shares_value() {
        let mut ctx = context(ShaderType::Vertex);
        let ty = float().with_qualifier(Qualifier::Const);
        let node = ctx.execute_initializer(loc(), "k", &ty, Node::const_float(2.5, loc()));
        assert!(matches!(node, Ok(None)));

        let id = ctx.symbol_table.find("k").unwrap();
        let value = ctx.symbol_table.variable(id).unwrap().const_value.clone().unwrap();
        assert_eq!(&value[..], &[ConstValue::Float(2.5)]);
    }

    #[test]
    fn const_initializer_must_be_constant() {
        let mut ctx = context(ShaderType::Vertex);
        let ty = float().with_qualifier(Qualifier::Const);
        let init = Node::symbol(SymbolID::new(0), "x", float(), loc());
        assert!(ctx.execute_initializer(loc(), "k", &ty, init).is_err());
        assert!(ctx.diagnostics.info_log().contains("' assigning non-constant to"));

        let id = ctx.symbol_table.find("k").unwrap();
        assert_eq!(ctx.symbol_table.variable(id).unwrap().ty.qualifier, Qualifier::Temporary);
    }

    #[test]
    fn initializer_type_mismatch() {
        let mut ctx = context(ShaderType::Vertex);
        let init = Node::constant(Rc::from([ConstValue::Bool(true)]), Type::bool_const(), loc());
        assert!(ctx.execute_initializer(loc(), "f", &float(), init).is_err());
        assert!(ctx
            .diagnostics
            .info_log()
            .contains("cannot convert from 'const bool' to 'highp float'"));
    }

    #[test]
    fn redefinition_in_same_scope() {
        let mut ctx = context(ShaderType::Vertex);
        assert!(ctx.non_init_check(loc(), "v", &float()).is_ok());
        assert!(ctx.non_init_check(loc(), "v", &float()).is_err());
        ctx.symbol_table.push();
        assert!(ctx.non_init_check(loc(), "v", &float()).is_ok());
        assert_eq!(ctx.num_errors(), 1);
    }

    #[test]
    fn extension_behaviors() {
        let mut options = CompileOptions::new(ShaderType::Fragment, ShaderSpec::Gles2);
        options.resources.oes_standard_derivatives = true;
        let mut ctx = ParseContext::new(&options, Diagnostics::new());
        let ext = crate::extension::EXT_STANDARD_DERIVATIVES;

        assert!(ctx.extension_check(loc(), ext).is_err());
        ctx.extensions.set(ext, ExtensionBehavior::Warn);
        assert!(ctx.extension_check(loc(), ext).is_ok());
        ctx.extensions.set(ext, ExtensionBehavior::Enable);
        assert!(ctx.extension_check(loc(), ext).is_ok());
        assert!(ctx.extension_check(loc(), "GL_missing").is_err());

        let log = ctx.diagnostics.info_log();
        assert!(log.contains("'GL_OES_standard_derivatives' : extension is disabled"));
        assert!(log.contains("WARNING: 0(3): 'GL_OES_standard_derivatives' : extension is being used"));
        assert!(log.contains("'GL_missing' : extension is not supported"));
    }
}
