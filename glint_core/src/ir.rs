use crate::symbol_table::SymbolID;
use crate::text::SourceLoc;
use crate::types::{BasicType, Qualifier, Type};
use std::rc::Rc;

/// Typed tree node, owned by its parent.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: Type,
    pub loc: SourceLoc,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Symbol { id: SymbolID, name: String },
    Constant(Rc<[ConstValue]>),
    Unary { op: Op, operand: Box<Node> },
    Binary { op: Op, left: Box<Node>, right: Box<Node> },
    Aggregate(Aggregate),
    Selection(Selection),
    Loop(Loop),
    Branch { kind: BranchKind, value: Option<Box<Node>> },
}

#[derive(Clone, Debug)]
pub struct Aggregate {
    pub op: Op,
    pub children: Vec<Node>,
    /// mangled name for calls, function definitions and prototypes
    pub name: String,
    pub user_defined: bool,
    pub optimize: bool,
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct Selection {
    pub cond: Box<Node>,
    pub then_branch: Option<Box<Node>>,
    pub else_branch: Option<Box<Node>>,
}

#[derive(Clone, Debug)]
pub struct Loop {
    pub kind: LoopKind,
    pub init: Option<Box<Node>>,
    pub cond: Option<Box<Node>>,
    pub expr: Option<Box<Node>>,
    pub body: Option<Box<Node>>,
    /// set by the limitations validator when the loop index
    /// is used to index a sampler array
    pub unroll: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BranchKind {
    Discard,
    Return,
    Break,
    Continue,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ConstValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Op {
    Null,
    Sequence,
    FunctionCall,
    Function,
    Parameters,
    Declaration,
    InvariantDeclaration,
    Prototype,

    Negative,
    LogicalNot,
    VectorLogicalNot,
    PostIncrement,
    PostDecrement,
    PreIncrement,
    PreDecrement,

    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    VectorEqual,
    VectorNotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    Comma,

    VectorTimesScalar,
    VectorTimesMatrix,
    MatrixTimesVector,
    MatrixTimesScalar,
    MatrixTimesMatrix,

    LogicalOr,
    LogicalXor,
    LogicalAnd,

    IndexDirect,
    IndexIndirect,
    IndexDirectStruct,
    VectorSwizzle,

    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Mod,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    SmoothStep,
    Length,
    Distance,
    Dot,
    Cross,
    Normalize,
    FaceForward,
    Reflect,
    Refract,
    DFdx,
    DFdy,
    Fwidth,
    MatrixCompMult,
    Any,
    All,

    ConstructInt,
    ConstructBool,
    ConstructFloat,
    ConstructVec2,
    ConstructVec3,
    ConstructVec4,
    ConstructBVec2,
    ConstructBVec3,
    ConstructBVec4,
    ConstructIVec2,
    ConstructIVec3,
    ConstructIVec4,
    ConstructMat2,
    ConstructMat3,
    ConstructMat4,
    ConstructStruct,

    Assign,
    Initialize,
    AddAssign,
    SubAssign,
    MulAssign,
    VectorTimesMatrixAssign,
    VectorTimesScalarAssign,
    MatrixTimesScalarAssign,
    MatrixTimesMatrixAssign,
    DivAssign,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Negative => "-",
            Op::LogicalNot | Op::VectorLogicalNot => "!",
            Op::PostIncrement | Op::PreIncrement => "++",
            Op::PostDecrement | Op::PreDecrement => "--",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul
            | Op::VectorTimesScalar
            | Op::VectorTimesMatrix
            | Op::MatrixTimesVector
            | Op::MatrixTimesScalar
            | Op::MatrixTimesMatrix => "*",
            Op::Div => "/",
            Op::Equal => "==",
            Op::NotEqual => "!=",
            Op::VectorEqual => "equal",
            Op::VectorNotEqual => "notEqual",
            Op::LessThan => "<",
            Op::GreaterThan => ">",
            Op::LessThanEqual => "<=",
            Op::GreaterThanEqual => ">=",
            Op::Comma => ",",
            Op::LogicalOr => "||",
            Op::LogicalXor => "^^",
            Op::LogicalAnd => "&&",
            Op::Assign => "=",
            Op::Initialize => "=",
            Op::AddAssign => "+=",
            Op::SubAssign => "-=",
            Op::MulAssign
            | Op::VectorTimesMatrixAssign
            | Op::VectorTimesScalarAssign
            | Op::MatrixTimesScalarAssign
            | Op::MatrixTimesMatrixAssign => "*=",
            Op::DivAssign => "/=",
            Op::IndexDirect | Op::IndexIndirect => "[]",
            Op::IndexDirectStruct | Op::VectorSwizzle => ".",
            Op::Radians => "radians",
            Op::Degrees => "degrees",
            Op::Sin => "sin",
            Op::Cos => "cos",
            Op::Tan => "tan",
            Op::Asin => "asin",
            Op::Acos => "acos",
            Op::Atan => "atan",
            Op::Pow => "pow",
            Op::Exp => "exp",
            Op::Log => "log",
            Op::Exp2 => "exp2",
            Op::Log2 => "log2",
            Op::Sqrt => "sqrt",
            Op::InverseSqrt => "inversesqrt",
            Op::Abs => "abs",
            Op::Sign => "sign",
            Op::Floor => "floor",
            Op::Ceil => "ceil",
            Op::Fract => "fract",
            Op::Mod => "mod",
            Op::Min => "min",
            Op::Max => "max",
            Op::Clamp => "clamp",
            Op::Mix => "mix",
            Op::Step => "step",
            Op::SmoothStep => "smoothstep",
            Op::Length => "length",
            Op::Distance => "distance",
            Op::Dot => "dot",
            Op::Cross => "cross",
            Op::Normalize => "normalize",
            Op::FaceForward => "faceforward",
            Op::Reflect => "reflect",
            Op::Refract => "refract",
            Op::DFdx => "dFdx",
            Op::DFdy => "dFdy",
            Op::Fwidth => "fwidth",
            Op::MatrixCompMult => "matrixCompMult",
            Op::Any => "any",
            Op::All => "all",
            Op::ConstructInt => "int",
            Op::ConstructBool => "bool",
            Op::ConstructFloat => "float",
            Op::ConstructVec2 => "vec2",
            Op::ConstructVec3 => "vec3",
            Op::ConstructVec4 => "vec4",
            Op::ConstructBVec2 => "bvec2",
            Op::ConstructBVec3 => "bvec3",
            Op::ConstructBVec4 => "bvec4",
            Op::ConstructIVec2 => "ivec2",
            Op::ConstructIVec3 => "ivec3",
            Op::ConstructIVec4 => "ivec4",
            Op::ConstructMat2 => "mat2",
            Op::ConstructMat3 => "mat3",
            Op::ConstructMat4 => "mat4",
            Op::ConstructStruct => "structure",
            Op::Null => "",
            Op::Sequence => "Sequence",
            Op::FunctionCall => "Function Call",
            Op::Function => "Function Definition",
            Op::Parameters => "Function Parameters",
            Op::Declaration => "Declaration",
            Op::InvariantDeclaration => "Invariant Declaration",
            Op::Prototype => "Prototype",
        }
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Op::Assign
                | Op::Initialize
                | Op::AddAssign
                | Op::SubAssign
                | Op::MulAssign
                | Op::VectorTimesMatrixAssign
                | Op::VectorTimesScalarAssign
                | Op::MatrixTimesScalarAssign
                | Op::MatrixTimesMatrixAssign
                | Op::DivAssign
        )
    }
    pub fn is_inc_dec(self) -> bool {
        matches!(
            self,
            Op::PostIncrement | Op::PostDecrement | Op::PreIncrement | Op::PreDecrement
        )
    }
    pub fn modifies_state(self) -> bool {
        self.is_assignment() || self.is_inc_dec()
    }
    pub fn is_constructor(self) -> bool {
        matches!(
            self,
            Op::ConstructInt
                | Op::ConstructBool
                | Op::ConstructFloat
                | Op::ConstructVec2
                | Op::ConstructVec3
                | Op::ConstructVec4
                | Op::ConstructBVec2
                | Op::ConstructBVec3
                | Op::ConstructBVec4
                | Op::ConstructIVec2
                | Op::ConstructIVec3
                | Op::ConstructIVec4
                | Op::ConstructMat2
                | Op::ConstructMat3
                | Op::ConstructMat4
                | Op::ConstructStruct
        )
    }
    pub fn is_matrix_constructor(self) -> bool {
        matches!(self, Op::ConstructMat2 | Op::ConstructMat3 | Op::ConstructMat4)
    }
}

impl ConstValue {
    pub fn as_float(self) -> f32 {
        match self {
            ConstValue::Float(v) => v,
            ConstValue::Int(v) => v as f32,
            ConstValue::Bool(v) => v as i32 as f32,
        }
    }
    pub fn as_int(self) -> i32 {
        match self {
            ConstValue::Float(v) => v as i32,
            ConstValue::Int(v) => v,
            ConstValue::Bool(v) => v as i32,
        }
    }
    pub fn as_bool(self) -> bool {
        match self {
            ConstValue::Float(v) => v != 0.0,
            ConstValue::Int(v) => v != 0,
            ConstValue::Bool(v) => v,
        }
    }
    /// converts the value into the representation of `basic`
    pub fn cast(self, basic: BasicType) -> ConstValue {
        match basic {
            BasicType::Float => ConstValue::Float(self.as_float()),
            BasicType::Int => ConstValue::Int(self.as_int()),
            BasicType::Bool => ConstValue::Bool(self.as_bool()),
            _ => self,
        }
    }
    pub fn zero(basic: BasicType) -> ConstValue {
        match basic {
            BasicType::Int => ConstValue::Int(0),
            BasicType::Bool => ConstValue::Bool(false),
            _ => ConstValue::Float(0.0),
        }
    }
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Float(v) => write!(f, "{:?}", v),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl Aggregate {
    pub fn new(op: Op) -> Aggregate {
        Aggregate {
            op,
            children: Vec::new(),
            name: String::new(),
            user_defined: false,
            optimize: true,
            debug: false,
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind, ty: Type, loc: SourceLoc) -> Node {
        Node { kind, ty, loc }
    }
    pub fn symbol(id: SymbolID, name: &str, ty: Type, loc: SourceLoc) -> Node {
        Node::new(NodeKind::Symbol { id, name: name.to_string() }, ty, loc)
    }
    pub fn constant(values: Rc<[ConstValue]>, ty: Type, loc: SourceLoc) -> Node {
        Node::new(NodeKind::Constant(values), ty, loc)
    }
    pub fn const_float(value: f32, loc: SourceLoc) -> Node {
        Node::constant(Rc::from([ConstValue::Float(value)]), Type::float_const(), loc)
    }
    pub fn const_int(value: i32, loc: SourceLoc) -> Node {
        let ty = Type::scalar(BasicType::Int, Qualifier::Const);
        Node::constant(Rc::from([ConstValue::Int(value)]), ty, loc)
    }
    pub fn const_bool(value: bool, loc: SourceLoc) -> Node {
        Node::constant(Rc::from([ConstValue::Bool(value)]), Type::bool_const(), loc)
    }
    pub fn aggregate(aggregate: Aggregate, ty: Type, loc: SourceLoc) -> Node {
        Node::new(NodeKind::Aggregate(aggregate), ty, loc)
    }

    pub fn qualifier(&self) -> Qualifier {
        self.ty.qualifier
    }
    pub fn basic(&self) -> BasicType {
        self.ty.basic
    }

    pub fn as_constant(&self) -> Option<&Rc<[ConstValue]>> {
        match &self.kind {
            NodeKind::Constant(values) => Some(values),
            _ => None,
        }
    }
    pub fn as_symbol(&self) -> Option<(SymbolID, &str)> {
        match &self.kind {
            NodeKind::Symbol { id, name } => Some((*id, name)),
            _ => None,
        }
    }
    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match &self.kind {
            NodeKind::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
    pub fn as_aggregate_mut(&mut self) -> Option<&mut Aggregate> {
        match &mut self.kind {
            NodeKind::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }
    pub fn as_binary(&self) -> Option<(Op, &Node, &Node)> {
        match &self.kind {
            NodeKind::Binary { op, left, right } => Some((*op, left, right)),
            _ => None,
        }
    }
    pub fn as_unary(&self) -> Option<(Op, &Node)> {
        match &self.kind {
            NodeKind::Unary { op, operand } => Some((*op, operand)),
            _ => None,
        }
    }
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant(_))
    }
    /// first component of a constant node
    pub fn const_value(&self) -> Option<ConstValue> {
        self.as_constant().and_then(|values| values.first().copied())
    }
}
