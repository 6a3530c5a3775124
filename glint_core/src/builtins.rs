use crate::config::{Resources, ShaderType};
use crate::extension::{EXT_FRAG_DEPTH, EXT_SHADER_TEXTURE_LOD, EXT_STANDARD_DERIVATIVES};
use crate::ir::{ConstValue, Op};
use crate::symbol_table::{Function, Param, StructSymbol, Symbol, SymbolTable, Variable};
use crate::types::{BasicType, Field, Precision, Qualifier, StructType, Type};
use crate::text::SourceLoc;
use std::rc::Rc;

/// Fills the built-in level of `table` with the functions, variables,
/// constants and default precisions visible to a `shader` compile.
pub fn insert_builtins(table: &mut SymbolTable, shader: ShaderType, resources: &Resources) {
    let mut builtins = Builtins { table, extension: None };
    builtins.common_functions();
    builtins.texture_functions(shader, resources);
    builtins.extension_functions(shader, resources);
    builtins.variables(shader, resources);
    builtins.constants(resources);
    builtins.default_precisions(shader);
}

struct Builtins<'t> {
    table: &'t mut SymbolTable,
    /// extension gating the functions being inserted
    extension: Option<&'static str>,
}

fn gen(size: u8) -> Type {
    vec(BasicType::Float, size)
}

fn vec(basic: BasicType, size: u8) -> Type {
    Type::new(basic, Precision::Undefined, Qualifier::Temporary, size, false)
}

fn mat(size: u8) -> Type {
    Type::new(BasicType::Float, Precision::Undefined, Qualifier::Temporary, size, true)
}

fn sampler(basic: BasicType) -> Type {
    vec(basic, 1)
}

impl<'t> Builtins<'t> {
    fn function(&mut self, op: Option<Op>, ret: &Type, name: &str, params: &[&Type]) {
        let mut function = Function::new(name, ret.clone());
        function.op = op;
        function.extension = self.extension;
        for param in params {
            let ty = (*param).clone().with_qualifier(Qualifier::In);
            function.add_param(Param { name: None, ty });
        }
        if self.table.insert(Symbol::Function(function)).is_none() {
            log::warn!("duplicate built-in `{}`", name);
        }
    }

    fn op(&mut self, op: Op, ret: &Type, params: &[&Type]) {
        self.function(Some(op), ret, op.as_str(), params);
    }

    fn call(&mut self, ret: &Type, name: &str, params: &[&Type]) {
        self.function(None, ret, name, params);
    }

    fn common_functions(&mut self) {
        let float = gen(1);
        let bool1 = vec(BasicType::Bool, 1);

        for n in 1..=4 {
            let g = gen(n);
            for op in [
                Op::Radians,
                Op::Degrees,
                Op::Sin,
                Op::Cos,
                Op::Tan,
                Op::Asin,
                Op::Acos,
                Op::Atan,
                Op::Exp,
                Op::Log,
                Op::Exp2,
                Op::Log2,
                Op::Sqrt,
                Op::InverseSqrt,
                Op::Abs,
                Op::Sign,
                Op::Floor,
                Op::Ceil,
                Op::Fract,
                Op::Normalize,
            ] {
                self.op(op, &g, &[&g]);
            }
            self.op(Op::Atan, &g, &[&g, &g]);
            self.op(Op::Pow, &g, &[&g, &g]);

            self.op(Op::Mod, &g, &[&g, &float]);
            self.op(Op::Min, &g, &[&g, &float]);
            self.op(Op::Max, &g, &[&g, &float]);
            self.op(Op::Clamp, &g, &[&g, &float, &float]);
            self.op(Op::Mix, &g, &[&g, &g, &float]);
            self.op(Op::Step, &g, &[&float, &g]);
            self.op(Op::SmoothStep, &g, &[&float, &float, &g]);
            if n > 1 {
                self.op(Op::Mod, &g, &[&g, &g]);
                self.op(Op::Min, &g, &[&g, &g]);
                self.op(Op::Max, &g, &[&g, &g]);
                self.op(Op::Clamp, &g, &[&g, &g, &g]);
                self.op(Op::Mix, &g, &[&g, &g, &g]);
                self.op(Op::Step, &g, &[&g, &g]);
                self.op(Op::SmoothStep, &g, &[&g, &g, &g]);
            }

            self.op(Op::Length, &float, &[&g]);
            self.op(Op::Distance, &float, &[&g, &g]);
            self.op(Op::Dot, &float, &[&g, &g]);
            self.op(Op::FaceForward, &g, &[&g, &g, &g]);
            self.op(Op::Reflect, &g, &[&g, &g]);
            self.op(Op::Refract, &g, &[&g, &g, &float]);
        }
        self.op(Op::Cross, &gen(3), &[&gen(3), &gen(3)]);

        for n in 2..=4 {
            let m = mat(n);
            self.op(Op::MatrixCompMult, &m, &[&m, &m]);

            let bvec = vec(BasicType::Bool, n);
            for basic in [BasicType::Float, BasicType::Int] {
                let v = vec(basic, n);
                self.function(Some(Op::LessThan), &bvec, "lessThan", &[&v, &v]);
                self.function(Some(Op::LessThanEqual), &bvec, "lessThanEqual", &[&v, &v]);
                self.function(Some(Op::GreaterThan), &bvec, "greaterThan", &[&v, &v]);
                self.function(Some(Op::GreaterThanEqual), &bvec, "greaterThanEqual", &[&v, &v]);
            }
            for basic in [BasicType::Float, BasicType::Int, BasicType::Bool] {
                let v = vec(basic, n);
                self.op(Op::VectorEqual, &bvec, &[&v, &v]);
                self.op(Op::VectorNotEqual, &bvec, &[&v, &v]);
            }
            self.op(Op::Any, &bool1, &[&bvec]);
            self.op(Op::All, &bool1, &[&bvec]);
            self.function(Some(Op::VectorLogicalNot), &bvec, "not", &[&bvec]);
        }
    }

    fn texture_functions(&mut self, shader: ShaderType, resources: &Resources) {
        let vec4 = gen(4);
        let (float, vec2, vec3) = (gen(1), gen(2), gen(3));
        let sampler2d = sampler(BasicType::Sampler2D);
        let cube = sampler(BasicType::SamplerCube);

        self.call(&vec4, "texture2D", &[&sampler2d, &vec2]);
        self.call(&vec4, "texture2DProj", &[&sampler2d, &vec3]);
        self.call(&vec4, "texture2DProj", &[&sampler2d, &vec4]);
        self.call(&vec4, "textureCube", &[&cube, &vec3]);

        match shader {
            ShaderType::Fragment => {
                self.call(&vec4, "texture2D", &[&sampler2d, &vec2, &float]);
                self.call(&vec4, "texture2DProj", &[&sampler2d, &vec3, &float]);
                self.call(&vec4, "texture2DProj", &[&sampler2d, &vec4, &float]);
                self.call(&vec4, "textureCube", &[&cube, &vec3, &float]);
            }
            ShaderType::Vertex => {
                self.call(&vec4, "texture2DLod", &[&sampler2d, &vec2, &float]);
                self.call(&vec4, "texture2DProjLod", &[&sampler2d, &vec3, &float]);
                self.call(&vec4, "texture2DProjLod", &[&sampler2d, &vec4, &float]);
                self.call(&vec4, "textureCubeLod", &[&cube, &vec3, &float]);
            }
        }

        if resources.oes_egl_image_external {
            let external = sampler(BasicType::SamplerExternalOES);
            self.call(&vec4, "texture2D", &[&external, &vec2]);
            self.call(&vec4, "texture2DProj", &[&external, &vec3]);
            self.call(&vec4, "texture2DProj", &[&external, &vec4]);
        }
        if resources.arb_texture_rectangle {
            let rect = sampler(BasicType::Sampler2DRect);
            self.call(&vec4, "texture2DRect", &[&rect, &vec2]);
            self.call(&vec4, "texture2DRectProj", &[&rect, &vec3]);
            self.call(&vec4, "texture2DRectProj", &[&rect, &vec4]);
        }
    }

    fn extension_functions(&mut self, shader: ShaderType, resources: &Resources) {
        if shader != ShaderType::Fragment {
            return;
        }

        if resources.oes_standard_derivatives {
            self.extension = Some(EXT_STANDARD_DERIVATIVES);
            for n in 1..=4 {
                let g = gen(n);
                self.op(Op::DFdx, &g, &[&g]);
                self.op(Op::DFdy, &g, &[&g]);
                self.op(Op::Fwidth, &g, &[&g]);
            }
        }

        if resources.ext_shader_texture_lod {
            self.extension = Some(EXT_SHADER_TEXTURE_LOD);
            let (float, vec2, vec3, vec4) = (gen(1), gen(2), gen(3), gen(4));
            let sampler2d = sampler(BasicType::Sampler2D);
            let cube = sampler(BasicType::SamplerCube);
            self.call(&vec4, "texture2DLodEXT", &[&sampler2d, &vec2, &float]);
            self.call(&vec4, "texture2DProjLodEXT", &[&sampler2d, &vec3, &float]);
            self.call(&vec4, "texture2DProjLodEXT", &[&sampler2d, &vec4, &float]);
            self.call(&vec4, "textureCubeLodEXT", &[&cube, &vec3, &float]);
            self.call(&vec4, "texture2DGradEXT", &[&sampler2d, &vec2, &vec2, &vec2]);
            self.call(&vec4, "texture2DProjGradEXT", &[&sampler2d, &vec3, &vec2, &vec2]);
            self.call(&vec4, "texture2DProjGradEXT", &[&sampler2d, &vec4, &vec2, &vec2]);
            self.call(&vec4, "textureCubeGradEXT", &[&cube, &vec3, &vec3, &vec3]);
        }
        self.extension = None;
    }

    fn variable(&mut self, name: &str, ty: Type) -> Option<&mut Variable> {
        let id = self.table.insert(Symbol::Variable(Variable::new(name, ty)))?;
        match self.table.get_mut(id) {
            Symbol::Variable(var) => Some(var),
            _ => None,
        }
    }

    fn variables(&mut self, shader: ShaderType, resources: &Resources) {
        let loc = SourceLoc::default();
        let highp_float = Type::new(BasicType::Float, Precision::High, Qualifier::Temporary, 1, false);
        let field = |name: &str| Field { name: name.to_string(), ty: highp_float.clone(), loc };
        let depth_range = Rc::new(StructType::new(
            "gl_DepthRangeParameters".to_string(),
            vec![field("near"), field("far"), field("diff")],
        ));
        let struct_ty = Type::structure(depth_range, Qualifier::Temporary);
        self.table.insert(Symbol::Struct(StructSymbol {
            name: "gl_DepthRangeParameters".to_string(),
            ty: struct_ty.clone(),
        }));
        self.variable("gl_DepthRange", struct_ty.with_qualifier(Qualifier::Uniform));

        let ty = |precision: Precision, qualifier: Qualifier, basic: BasicType, size: u8| {
            Type::new(basic, precision, qualifier, size, false)
        };
        use BasicType::{Bool, Float};
        use Precision::{High, Medium, Undefined};

        match shader {
            ShaderType::Vertex => {
                self.variable("gl_Position", ty(High, Qualifier::Position, Float, 4));
                self.variable("gl_PointSize", ty(Medium, Qualifier::PointSize, Float, 1));
            }
            ShaderType::Fragment => {
                self.variable("gl_FragCoord", ty(Medium, Qualifier::FragCoord, Float, 4));
                self.variable("gl_FrontFacing", ty(Undefined, Qualifier::FrontFacing, Bool, 1));
                self.variable("gl_FragColor", ty(Medium, Qualifier::FragColor, Float, 4));
                self.variable("gl_PointCoord", ty(Medium, Qualifier::PointCoord, Float, 2));

                let draw_buffers = if resources.ext_draw_buffers {
                    resources.max_draw_buffers.max(1) as u32
                } else {
                    1
                };
                let frag_data = ty(Medium, Qualifier::FragData, Float, 4).with_array_size(draw_buffers);
                self.variable("gl_FragData", frag_data);

                if resources.ext_frag_depth {
                    let precision = if resources.fragment_precision_high { High } else { Medium };
                    let frag_depth = ty(precision, Qualifier::FragDepth, Float, 1);
                    if let Some(var) = self.variable("gl_FragDepthEXT", frag_depth) {
                        var.extension = Some(EXT_FRAG_DEPTH);
                    }
                }
            }
        }
    }

    fn constants(&mut self, resources: &Resources) {
        let constants = [
            ("gl_MaxVertexAttribs", resources.max_vertex_attribs),
            ("gl_MaxVertexUniformVectors", resources.max_vertex_uniform_vectors),
            ("gl_MaxVaryingVectors", resources.max_varying_vectors),
            ("gl_MaxVertexTextureImageUnits", resources.max_vertex_texture_image_units),
            ("gl_MaxCombinedTextureImageUnits", resources.max_combined_texture_image_units),
            ("gl_MaxTextureImageUnits", resources.max_texture_image_units),
            ("gl_MaxFragmentUniformVectors", resources.max_fragment_uniform_vectors),
            ("gl_MaxDrawBuffers", resources.max_draw_buffers),
        ];
        for (name, value) in constants {
            let ty = Type::new(BasicType::Int, Precision::Medium, Qualifier::Const, 1, false);
            if let Some(var) = self.variable(name, ty) {
                var.const_value = Some(Rc::from([ConstValue::Int(value)]));
            }
        }
    }

    fn default_precisions(&mut self, shader: ShaderType) {
        match shader {
            ShaderType::Vertex => {
                self.table.set_default_precision(BasicType::Float, Precision::High);
                self.table.set_default_precision(BasicType::Int, Precision::High);
            }
            ShaderType::Fragment => {
                self.table.set_default_precision(BasicType::Int, Precision::Medium);
            }
        }
        for basic in [
            BasicType::Sampler2D,
            BasicType::SamplerCube,
            BasicType::SamplerExternalOES,
            BasicType::Sampler2DRect,
        ] {
            self.table.set_default_precision(basic, Precision::Low);
        }
    }
}
