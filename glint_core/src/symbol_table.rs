use crate::ir::{ConstValue, Op};
use crate::types::{BasicType, Precision, Type};
use rustc_hash::FxHashMap;
use std::rc::Rc;

crate::id_impl!(SymbolID);

pub enum Symbol {
    Variable(Variable),
    Function(Function),
    Struct(StructSymbol),
}

pub struct Variable {
    pub name: String,
    pub ty: Type,
    /// value of `const` qualified variables
    pub const_value: Option<Rc<[ConstValue]>>,
    /// extension that must be enabled to reference the variable
    pub extension: Option<&'static str>,
}

#[derive(Clone)]
pub struct Param {
    pub name: Option<String>,
    pub ty: Type,
}

#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub mangled: String,
    pub ret: Type,
    pub params: Vec<Param>,
    /// operator a built-in call resolves to
    pub op: Option<Op>,
    pub defined: bool,
    pub extension: Option<&'static str>,
}

/// Named struct type.
pub struct StructSymbol {
    pub name: String,
    pub ty: Type,
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(var) => &var.name,
            Symbol::Function(func) => &func.name,
            Symbol::Struct(ty) => &ty.name,
        }
    }
    /// key the symbol is stored under, the mangled name for functions
    pub fn key(&self) -> &str {
        match self {
            Symbol::Function(func) => &func.mangled,
            _ => self.name(),
        }
    }
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Symbol::Variable(var) => Some(var),
            _ => None,
        }
    }
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Symbol::Function(func) => Some(func),
            _ => None,
        }
    }
    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function(_))
    }
}

impl Variable {
    pub fn new(name: &str, ty: Type) -> Variable {
        Variable { name: name.to_string(), ty, const_value: None, extension: None }
    }
}

impl Function {
    pub fn new(name: &str, ret: Type) -> Function {
        Function {
            name: name.to_string(),
            mangled: format!("{}(", name),
            ret,
            params: Vec::new(),
            op: None,
            defined: false,
            extension: None,
        }
    }
    pub fn with_op(name: &str, ret: Type, op: Op) -> Function {
        let mut function = Function::new(name, ret);
        function.op = Some(op);
        function
    }
    pub fn add_param(&mut self, param: Param) {
        self.mangled.push_str(&param.ty.mangled_name());
        self.params.push(param);
    }
}

/// Scoped symbol storage.
/// Every symbol lives in one arena, its index is its `SymbolID`.
/// Levels map keys to ids, popping a level makes its symbols unreachable by lookup.
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    levels: Vec<FxHashMap<String, SymbolID>>,
    precisions: Vec<FxHashMap<BasicType, Precision>>,
}

/// Level holding the built-in functions and variables.
pub const BUILTIN_LEVEL: usize = 0;
/// Level of user global declarations.
pub const GLOBAL_LEVEL: usize = 1;

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable { symbols: Vec::with_capacity(512), levels: Vec::new(), precisions: Vec::new() }
    }

    pub fn push(&mut self) {
        self.levels.push(FxHashMap::default());
        self.precisions.push(FxHashMap::default());
        log::trace!("symbol table push, level {}", self.levels.len() - 1);
    }
    pub fn pop(&mut self) {
        assert!(!self.levels.is_empty(), "symbol table pop without matching push");
        self.levels.pop();
        self.precisions.pop();
        log::trace!("symbol table pop, {} levels left", self.levels.len());
    }
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
    pub fn current_level(&self) -> usize {
        self.levels.len().wrapping_sub(1)
    }
    pub fn at_builtin_level(&self) -> bool {
        self.levels.len() <= BUILTIN_LEVEL + 1
    }
    pub fn at_global_level(&self) -> bool {
        self.levels.len() <= GLOBAL_LEVEL + 1
    }

    /// inserts into the innermost level.
    /// `None` when a symbol with the same key already exists at that level.
    pub fn insert(&mut self, symbol: Symbol) -> Option<SymbolID> {
        let level = self.current_level();
        self.insert_at(level, symbol)
    }

    pub fn insert_at(&mut self, level: usize, symbol: Symbol) -> Option<SymbolID> {
        let scope = self.levels.get_mut(level)?;
        if scope.contains_key(symbol.key()) {
            return None;
        }
        let id = SymbolID::new(self.symbols.len());
        scope.insert(symbol.key().to_string(), id);
        self.symbols.push(symbol);
        Some(id)
    }

    /// registers the unmangled name of an inserted function at `level`,
    /// used to detect later redefinition of the name as a variable
    pub fn insert_unmangled(&mut self, level: usize, id: SymbolID) {
        let name = self.symbols[id.index()].name().to_string();
        if let Some(scope) = self.levels.get_mut(level) {
            scope.entry(name).or_insert(id);
        }
    }

    pub fn find(&self, name: &str) -> Option<SymbolID> {
        self.find_with_level(name).map(|(id, _)| id)
    }
    /// lookup with the level the symbol was found at
    pub fn find_with_level(&self, name: &str) -> Option<(SymbolID, usize)> {
        self.levels
            .iter()
            .enumerate()
            .rev()
            .find_map(|(level, scope)| scope.get(name).map(|id| (*id, level)))
    }
    pub fn find_mangled(&self, mangled: &str) -> Option<SymbolID> {
        self.find(mangled)
    }
    pub fn find_builtin(&self, name: &str) -> Option<SymbolID> {
        self.levels.get(BUILTIN_LEVEL)?.get(name).copied()
    }
    /// any overload of `name` is a built-in function
    pub fn is_builtin_function(&self, name: &str) -> bool {
        let Some(scope) = self.levels.get(BUILTIN_LEVEL) else {
            return false;
        };
        scope
            .values()
            .any(|id| self.symbols[id.index()].as_function().is_some_and(|f| f.name == name))
    }
    pub fn find_at(&self, level: usize, name: &str) -> Option<SymbolID> {
        self.levels.get(level)?.get(name).copied()
    }

    pub fn get(&self, id: SymbolID) -> &Symbol {
        &self.symbols[id.index()]
    }
    pub fn get_mut(&mut self, id: SymbolID) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }
    pub fn variable(&self, id: SymbolID) -> Option<&Variable> {
        self.get(id).as_variable()
    }
    pub fn function(&self, id: SymbolID) -> Option<&Function> {
        self.get(id).as_function()
    }
    pub fn function_mut(&mut self, id: SymbolID) -> Option<&mut Function> {
        match self.get_mut(id) {
            Symbol::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn set_default_precision(&mut self, basic: BasicType, precision: Precision) -> bool {
        if !basic.uses_precision() {
            return false;
        }
        match self.precisions.last_mut() {
            Some(scope) => {
                scope.insert(basic, precision);
                true
            }
            None => false,
        }
    }
    pub fn default_precision(&self, basic: BasicType) -> Precision {
        self.precisions
            .iter()
            .rev()
            .find_map(|scope| scope.get(&basic).copied())
            .unwrap_or(Precision::Undefined)
    }
}

impl Default for SymbolTable {
    fn default() -> SymbolTable {
        SymbolTable::new()
    }
}
