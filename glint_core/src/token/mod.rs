mod token_gen;

use crate::directive::Directive;
use crate::ir::{ConstValue, Op};
use crate::text::SourceLoc;
use crate::types::BasicType;

#[rustfmt::skip]
token_gen::token_gen! {
    // special tokens
    [eof]        | "end of file"    | Eof        |
    [ident]      | "identifier"     | Ident      |
    [int_lit]    | "int constant"   | IntLit     |
    [float_lit]  | "float constant" | FloatLit   |

    // storage and precision qualifiers
    [attribute]  | "attribute"  | KwAttribute  | KW.
    [const]      | "const"      | KwConst      | KW.
    [uniform]    | "uniform"    | KwUniform    | KW.
    [varying]    | "varying"    | KwVarying    | KW.
    [invariant]  | "invariant"  | KwInvariant  | KW.
    [in]         | "in"         | KwIn         | KW.
    [out]        | "out"        | KwOut        | KW.
    [inout]      | "inout"      | KwInout      | KW.
    [lowp]       | "lowp"       | KwLowp       | KW.
    [mediump]    | "mediump"    | KwMediump    | KW.
    [highp]      | "highp"      | KwHighp      | KW.
    [precision]  | "precision"  | KwPrecision  | KW.

    // statements
    [break]      | "break"      | KwBreak      | KW.
    [continue]   | "continue"   | KwContinue   | KW.
    [do]         | "do"         | KwDo         | KW.
    [for]        | "for"        | KwFor        | KW.
    [while]      | "while"      | KwWhile      | KW.
    [if]         | "if"         | KwIf         | KW.
    [else]       | "else"       | KwElse       | KW.
    [discard]    | "discard"    | KwDiscard    | KW.
    [return]     | "return"     | KwReturn     | KW.
    [struct]     | "struct"     | KwStruct     | KW.
    [true]       | "true"       | KwTrue       | KW.
    [false]      | "false"      | KwFalse      | KW.

    // type keywords
    [void]               | "void"               | KwVoid               | KW. TYPE[BasicType::Void, 1, false]
    [bool]               | "bool"               | KwBool               | KW. TYPE[BasicType::Bool, 1, false]
    [int]                | "int"                | KwInt                | KW. TYPE[BasicType::Int, 1, false]
    [float]              | "float"              | KwFloat              | KW. TYPE[BasicType::Float, 1, false]
    [vec2]               | "vec2"               | KwVec2               | KW. TYPE[BasicType::Float, 2, false]
    [vec3]               | "vec3"               | KwVec3               | KW. TYPE[BasicType::Float, 3, false]
    [vec4]               | "vec4"               | KwVec4               | KW. TYPE[BasicType::Float, 4, false]
    [bvec2]              | "bvec2"              | KwBvec2              | KW. TYPE[BasicType::Bool, 2, false]
    [bvec3]              | "bvec3"              | KwBvec3              | KW. TYPE[BasicType::Bool, 3, false]
    [bvec4]              | "bvec4"              | KwBvec4              | KW. TYPE[BasicType::Bool, 4, false]
    [ivec2]              | "ivec2"              | KwIvec2              | KW. TYPE[BasicType::Int, 2, false]
    [ivec3]              | "ivec3"              | KwIvec3              | KW. TYPE[BasicType::Int, 3, false]
    [ivec4]              | "ivec4"              | KwIvec4              | KW. TYPE[BasicType::Int, 4, false]
    [mat2]               | "mat2"               | KwMat2               | KW. TYPE[BasicType::Float, 2, true]
    [mat3]               | "mat3"               | KwMat3               | KW. TYPE[BasicType::Float, 3, true]
    [mat4]               | "mat4"               | KwMat4               | KW. TYPE[BasicType::Float, 4, true]
    [sampler2D]          | "sampler2D"          | KwSampler2D          | KW. TYPE[BasicType::Sampler2D, 1, false]
    [samplerCube]        | "samplerCube"        | KwSamplerCube        | KW. TYPE[BasicType::SamplerCube, 1, false]
    [samplerExternalOES] | "samplerExternalOES" | KwSamplerExternalOES | KW. TYPE[BasicType::SamplerExternalOES, 1, false]
    [sampler2DRect]      | "sampler2DRect"      | KwSampler2DRect      | KW. TYPE[BasicType::Sampler2DRect, 1, false]

    // single punctuation
    [.]      | "."      | Dot          |
    [,]      | ","      | Comma        |
    [:]      | ":"      | Colon        |
    [;]      | ";"      | Semicolon    |
    [?]      | "?"      | Question     |
    ['(']    | "("      | ParenOpen    |
    [')']    | ")"      | ParenClose   |
    ['[']    | "["      | BracketOpen  |
    [']']    | "]"      | BracketClose |
    ['{']    | "{"      | BlockOpen    |
    ['}']    | "}"      | BlockClose   |
    [!]      | "!"      | Bang         |
    [~]      | "~"      | Tilde        |

    // bin op tokens
    [+]      | "+"      | Plus         | BIN[Op::Add]
    [-]      | "-"      | Minus        | BIN[Op::Sub]
    [*]      | "*"      | Star         | BIN[Op::Mul]
    [/]      | "/"      | ForwSlash    | BIN[Op::Div]
    [%]      | "%"      | Percent      |
    [&]      | "&"      | Ampersand    |
    [|]      | "|"      | Pipe         |
    [^]      | "^"      | Caret        |
    [<<]     | "<<"     | Shl          |
    [>>]     | ">>"     | Shr          |
    [==]     | "=="     | IsEq         | BIN[Op::Equal]
    [!=]     | "!="     | NotEq        | BIN[Op::NotEqual]
    [<]      | "<"      | Less         | BIN[Op::LessThan]
    [<=]     | "<="     | LessEq       | BIN[Op::LessThanEqual]
    [>]      | ">"      | Greater      | BIN[Op::GreaterThan]
    [>=]     | ">="     | GreaterEq    | BIN[Op::GreaterThanEqual]
    [&&]     | "&&"     | LogicAnd     | BIN[Op::LogicalAnd]
    [||]     | "||"     | LogicOr      | BIN[Op::LogicalOr]
    ["^^"]   | "^^"     | LogicXor     | BIN[Op::LogicalXor]
    ["++"]   | "++"     | Inc          |
    ["--"]   | "--"     | Dec          |

    // assign op tokens
    [=]      | "="      | Equals       | ASSIGN[Op::Assign]
    [+=]     | "+="     | AssignAdd    | ASSIGN[Op::AddAssign]
    [-=]     | "-="     | AssignSub    | ASSIGN[Op::SubAssign]
    [*=]     | "*="     | AssignMul    | ASSIGN[Op::MulAssign]
    [/=]     | "/="     | AssignDiv    | ASSIGN[Op::DivAssign]
    [%=]     | "%="     | AssignRem    |
    [&=]     | "&="     | AssignBitAnd |
    [|=]     | "|="     | AssignBitOr  |
    [^=]     | "^="     | AssignBitXor |
    [<<=]    | "<<="    | AssignShl    |
    [>>=]    | ">>="    | AssignShr    |
}

#[rustfmt::skip]
token_gen::token_from_char! {
    '.' => T![.]
    ',' => T![,]
    ':' => T![:]
    ';' => T![;]
    '?' => T![?]
    '(' => T!['(']
    ')' => T![')']
    '[' => T!['[']
    ']' => T![']']
    '{' => T!['{']
    '}' => T!['}']
    '!' => T![!]
    '~' => T![~]

    '+' => T![+]
    '-' => T![-]
    '*' => T![*]
    '/' => T![/]
    '%' => T![%]
    '&' => T![&]
    '|' => T![|]
    '^' => T![^]
    '<' => T![<]
    '>' => T![>]

    '=' => T![=]
}

#[rustfmt::skip]
token_gen::token_glue_extend! {
    glue_double,
    (T![+] => T!["++"]) if '+'
    (T![-] => T!["--"]) if '-'
    (T![>] => T![>>]) if '>'
    (T![<] => T![<<]) if '<'
    (T![&] => T![&&]) if '&'
    (T![|] => T![||]) if '|'
    (T![^] => T!["^^"]) if '^'

    (T![+] => T![+=])
    (T![-] => T![-=])
    (T![*] => T![*=])
    (T![/] => T![/=])
    (T![%] => T![%=])
    (T![&] => T![&=])
    (T![|] => T![|=])
    (T![^] => T![^=])
    (T![=] => T![==])
    (T![!] => T![!=])
    (T![<] => T![<=])
    (T![>] => T![>=]) if '='
}

#[rustfmt::skip]
token_gen::token_glue_extend! {
    glue_triple,
    (T![<<] => T![<<=])
    (T![>>] => T![>>=]) if '='
}

pub(crate) use T;

/// Words reserved for future use, an error wherever they appear.
pub const RESERVED_WORDS: &[&str] = &[
    "asm", "class", "union", "enum", "typedef", "template", "this", "packed", "goto", "switch",
    "default", "inline", "noinline", "volatile", "public", "static", "extern", "external",
    "interface", "flat", "long", "short", "double", "half", "fixed", "unsigned", "superp",
    "input", "output", "hvec2", "hvec3", "hvec4", "dvec2", "dvec3", "dvec4", "fvec2", "fvec3",
    "fvec4", "sampler1D", "sampler3D", "sampler1DShadow", "sampler2DShadow", "sampler3DRect",
    "sampler2DRectShadow", "sizeof", "cast", "namespace", "using",
];

impl Token {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            T![true] => Some(true),
            T![false] => Some(false),
            _ => None,
        }
    }
    pub fn is_type_keyword(self) -> bool {
        self.as_type().is_some()
    }
    pub fn is_qualifier_keyword(self) -> bool {
        matches!(
            self,
            T![attribute] | T![const] | T![uniform] | T![varying] | T![invariant]
        )
    }
    pub fn is_precision_keyword(self) -> bool {
        matches!(self, T![lowp] | T![mediump] | T![highp])
    }
}

/// Token stream of a translation unit.
/// Directives are stored with the index of the token they precede.
/// Literal values are stored sparsely, keyed by token index.
pub struct TokenList {
    tokens: Vec<Token>,
    locs: Vec<SourceLoc>,
    spans: Vec<(u32, u32)>,
    literals: Vec<(usize, ConstValue)>,
    directives: Vec<(usize, SourceLoc, Directive)>,
}

impl TokenList {
    pub fn new(cap: usize) -> TokenList {
        TokenList {
            tokens: Vec::with_capacity(cap),
            locs: Vec::with_capacity(cap),
            spans: Vec::with_capacity(cap),
            literals: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
    pub fn token(&self, idx: usize) -> Token {
        self.tokens[idx.min(self.tokens.len() - 1)]
    }
    pub fn loc(&self, idx: usize) -> SourceLoc {
        self.locs[idx.min(self.locs.len() - 1)]
    }
    pub fn span(&self, idx: usize) -> std::ops::Range<usize> {
        let (start, end) = self.spans[idx.min(self.spans.len() - 1)];
        start as usize..end as usize
    }
    /// value of the int or float literal at `idx`
    pub fn literal(&self, idx: usize) -> Option<ConstValue> {
        self.literals
            .binary_search_by_key(&idx, |(token_idx, _)| *token_idx)
            .ok()
            .map(|pos| self.literals[pos].1)
    }
    pub fn directives(&self) -> &[(usize, SourceLoc, Directive)] {
        &self.directives
    }

    pub fn add_token(&mut self, token: Token, loc: SourceLoc, span: (u32, u32)) {
        self.tokens.push(token);
        self.locs.push(loc);
        self.spans.push(span);
    }
    pub fn add_literal(&mut self, token: Token, value: ConstValue, loc: SourceLoc, span: (u32, u32)) {
        self.literals.push((self.tokens.len(), value));
        self.add_token(token, loc, span);
    }
    pub fn add_directive(&mut self, loc: SourceLoc, directive: Directive) {
        self.directives.push((self.tokens.len(), loc, directive));
    }
}
