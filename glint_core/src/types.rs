use crate::text::SourceLoc;
use std::fmt::Write;
use std::rc::Rc;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BasicType {
    Void,
    Bool,
    Int,
    Float,
    Sampler2D,
    SamplerCube,
    SamplerExternalOES,
    Sampler2DRect,
    Struct,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Precision {
    Undefined,
    Low,
    Medium,
    High,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Qualifier {
    Temporary,
    Global,
    Const,
    Attribute,
    /// vertex shader output
    VaryingOut,
    /// fragment shader input
    VaryingIn,
    InvariantVaryingOut,
    InvariantVaryingIn,
    Uniform,
    In,
    Out,
    InOut,
    ConstReadOnly,
    Position,
    PointSize,
    FragCoord,
    FrontFacing,
    FragColor,
    FragData,
    FragDepth,
    PointCoord,
}

impl BasicType {
    pub fn as_str(self) -> &'static str {
        match self {
            BasicType::Void => "void",
            BasicType::Bool => "bool",
            BasicType::Int => "int",
            BasicType::Float => "float",
            BasicType::Sampler2D => "sampler2D",
            BasicType::SamplerCube => "samplerCube",
            BasicType::SamplerExternalOES => "samplerExternalOES",
            BasicType::Sampler2DRect => "sampler2DRect",
            BasicType::Struct => "structure",
        }
    }
    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            BasicType::Sampler2D
                | BasicType::SamplerCube
                | BasicType::SamplerExternalOES
                | BasicType::Sampler2DRect
        )
    }
    /// types that take a default precision
    pub fn uses_precision(self) -> bool {
        matches!(self, BasicType::Float | BasicType::Int) || self.is_sampler()
    }
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Undefined => "",
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        }
    }
    pub fn higher(self, other: Precision) -> Precision {
        self.max(other)
    }
}

impl Qualifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Qualifier::Temporary => "Temporary",
            Qualifier::Global => "Global",
            Qualifier::Const => "const",
            Qualifier::Attribute => "attribute",
            Qualifier::VaryingOut | Qualifier::VaryingIn => "varying",
            Qualifier::InvariantVaryingOut | Qualifier::InvariantVaryingIn => "invariant varying",
            Qualifier::Uniform => "uniform",
            Qualifier::In => "in",
            Qualifier::Out => "out",
            Qualifier::InOut => "inout",
            Qualifier::ConstReadOnly => "const",
            Qualifier::Position => "Position",
            Qualifier::PointSize => "PointSize",
            Qualifier::FragCoord => "FragCoord",
            Qualifier::FrontFacing => "FrontFacing",
            Qualifier::FragColor => "FragColor",
            Qualifier::FragData => "FragData",
            Qualifier::FragDepth => "FragDepth",
            Qualifier::PointCoord => "PointCoord",
        }
    }
    pub fn is_varying(self) -> bool {
        matches!(
            self,
            Qualifier::VaryingOut
                | Qualifier::VaryingIn
                | Qualifier::InvariantVaryingOut
                | Qualifier::InvariantVaryingIn
        )
    }
    /// qualifiers only legal on declarations at global scope
    pub fn is_global_only(self) -> bool {
        matches!(self, Qualifier::Attribute | Qualifier::Uniform) || self.is_varying()
    }
}

pub struct Field {
    pub name: String,
    pub ty: Type,
    pub loc: SourceLoc,
}

/// User defined structure, shared by every `Type` that refers to it.
pub struct StructType {
    pub name: String,
    pub fields: Vec<Field>,
    deepest_nesting: u32,
}

impl StructType {
    pub fn new(name: String, fields: Vec<Field>) -> StructType {
        let deepest_nesting = 1 + fields
            .iter()
            .filter_map(|field| field.ty.structure.as_ref())
            .map(|inner| inner.deepest_nesting)
            .max()
            .unwrap_or(0);
        StructType { name, fields, deepest_nesting }
    }

    pub fn object_size(&self) -> usize {
        self.fields.iter().map(|field| field.ty.object_size()).sum()
    }
    /// depth of nested struct definitions, 1 for a struct of basic types
    pub fn deepest_nesting(&self) -> u32 {
        self.deepest_nesting
    }
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, field)| field.name == name)
    }
    pub fn contains_arrays(&self) -> bool {
        self.fields.iter().any(|field| {
            field.ty.is_array() || field.ty.structure.as_ref().is_some_and(|s| s.contains_arrays())
        })
    }
    pub fn contains_samplers(&self) -> bool {
        self.fields.iter().any(|field| field.ty.contains_sampler())
    }
}

#[derive(Clone)]
pub struct Type {
    pub basic: BasicType,
    pub precision: Precision,
    pub qualifier: Qualifier,
    /// component count for vectors, column count for matrices, 1 for scalars
    pub size: u8,
    pub matrix: bool,
    /// 0 when not an array
    pub array_size: u32,
    pub structure: Option<Rc<StructType>>,
}

impl PartialEq for Type {
    /// precision and qualifier do not take part in type identity
    fn eq(&self, other: &Type) -> bool {
        self.basic == other.basic
            && self.size == other.size
            && self.matrix == other.matrix
            && self.array_size == other.array_size
            && match (&self.structure, &other.structure) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Type {
    pub fn new(basic: BasicType, precision: Precision, qualifier: Qualifier, size: u8, matrix: bool) -> Type {
        Type { basic, precision, qualifier, size, matrix, array_size: 0, structure: None }
    }
    pub fn scalar(basic: BasicType, qualifier: Qualifier) -> Type {
        Type::new(basic, Precision::Undefined, qualifier, 1, false)
    }
    pub fn vector(basic: BasicType, size: u8) -> Type {
        Type::new(basic, Precision::Undefined, Qualifier::Temporary, size, false)
    }
    pub fn structure(structure: Rc<StructType>, qualifier: Qualifier) -> Type {
        Type {
            basic: BasicType::Struct,
            precision: Precision::Undefined,
            qualifier,
            size: 1,
            matrix: false,
            array_size: 0,
            structure: Some(structure),
        }
    }
    pub fn void() -> Type {
        Type::scalar(BasicType::Void, Qualifier::Temporary)
    }
    pub fn float_const() -> Type {
        Type::scalar(BasicType::Float, Qualifier::Const)
    }
    pub fn bool_const() -> Type {
        Type::scalar(BasicType::Bool, Qualifier::Const)
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Type {
        self.qualifier = qualifier;
        self
    }
    pub fn with_precision(mut self, precision: Precision) -> Type {
        self.precision = precision;
        self
    }
    pub fn with_array_size(mut self, array_size: u32) -> Type {
        self.array_size = array_size;
        self
    }

    pub fn is_array(&self) -> bool {
        self.array_size > 0
    }
    pub fn is_matrix(&self) -> bool {
        self.matrix
    }
    pub fn is_vector(&self) -> bool {
        self.size > 1 && !self.matrix
    }
    pub fn is_scalar(&self) -> bool {
        self.size == 1 && !self.matrix && self.structure.is_none()
    }
    pub fn is_scalar_int(&self) -> bool {
        self.is_scalar() && !self.is_array() && self.basic == BasicType::Int
    }
    pub fn is_sampler(&self) -> bool {
        self.basic.is_sampler()
    }
    pub fn contains_sampler(&self) -> bool {
        self.is_sampler() || self.structure.as_ref().is_some_and(|s| s.contains_samplers())
    }
    pub fn is_const(&self) -> bool {
        self.qualifier == Qualifier::Const
    }
    pub fn nominal_size(&self) -> usize {
        self.size as usize
    }

    /// number of scalar components, including every array element
    pub fn object_size(&self) -> usize {
        let element = match &self.structure {
            Some(structure) => structure.object_size(),
            None if self.matrix => self.nominal_size() * self.nominal_size(),
            None => self.nominal_size(),
        };
        if self.is_array() {
            element * self.array_size as usize
        } else {
            element
        }
    }

    /// type of one element of an array
    pub fn element_type(&self) -> Type {
        let mut ty = self.clone();
        ty.array_size = 0;
        ty
    }
    /// type of one column of a matrix
    pub fn column_type(&self) -> Type {
        Type::new(self.basic, self.precision, self.qualifier, self.size, false)
    }
    /// scalar component type of a vector
    pub fn component_type(&self) -> Type {
        Type::new(self.basic, self.precision, self.qualifier, 1, false)
    }

    pub fn basic_string(&self) -> &'static str {
        self.basic.as_str()
    }

    /// readable type, `const highp 4-component vector of float`
    pub fn complete_string(&self) -> String {
        let mut string = String::new();
        if self.qualifier != Qualifier::Temporary && self.qualifier != Qualifier::Global {
            string.push_str(self.qualifier.as_str());
            string.push(' ');
        }
        if self.precision != Precision::Undefined {
            string.push_str(self.precision.as_str());
            string.push(' ');
        }
        if self.is_array() {
            let _ = write!(string, "array[{}] of ", self.array_size);
        }
        if self.matrix {
            let _ = write!(string, "{}X{} matrix of ", self.size, self.size);
        } else if self.size > 1 {
            let _ = write!(string, "{}-component vector of ", self.size);
        }
        string.push_str(self.basic_string());
        string
    }

    /// GLSL spelling of the type, `vec4`, `mat3`, `S[2]`
    pub fn glsl_name(&self) -> String {
        let mut name = match (&self.structure, self.basic, self.size, self.matrix) {
            (Some(structure), ..) => structure.name.clone(),
            (None, BasicType::Float, 1, _) => "float".to_string(),
            (None, BasicType::Float, size, true) => format!("mat{}", size),
            (None, BasicType::Float, size, false) => format!("vec{}", size),
            (None, BasicType::Int, 1, _) => "int".to_string(),
            (None, BasicType::Int, size, _) => format!("ivec{}", size),
            (None, BasicType::Bool, 1, _) => "bool".to_string(),
            (None, BasicType::Bool, size, _) => format!("bvec{}", size),
            (None, basic, ..) => basic.as_str().to_string(),
        };
        if self.is_array() {
            let _ = write!(name, "[{}]", self.array_size);
        }
        name
    }

    /// encoding used to build function mangled names
    pub fn mangled_name(&self) -> String {
        let mut mangled = String::new();
        self.build_mangled_name(&mut mangled);
        mangled.push(';');
        mangled
    }

    fn build_mangled_name(&self, mangled: &mut String) {
        if self.matrix {
            mangled.push('m');
        }
        match self.basic {
            BasicType::Float => mangled.push('f'),
            BasicType::Int => mangled.push('i'),
            BasicType::Bool => mangled.push('b'),
            BasicType::Sampler2D => mangled.push_str("s2"),
            BasicType::SamplerCube => mangled.push_str("sC"),
            BasicType::SamplerExternalOES => mangled.push_str("sext"),
            BasicType::Sampler2DRect => mangled.push_str("s2r"),
            BasicType::Struct => {
                mangled.push_str("struct-");
                if let Some(structure) = &self.structure {
                    mangled.push_str(&structure.name);
                    for field in &structure.fields {
                        mangled.push('-');
                        field.ty.build_mangled_name(mangled);
                    }
                }
            }
            BasicType::Void => {}
        }
        mangled.push(char::from(b'0' + self.size));
        if self.is_array() {
            let _ = write!(mangled, "[{}]", self.array_size);
        }
    }
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.complete_string())
    }
}
