use crate::error::Error;
use crate::support::AsStr;
use serde::{Deserialize, Serialize};
use std::path::Path;

crate::enum_as_str! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
    pub enum ShaderType {
        #[serde(rename = "vertex")]
        Vertex "vertex",
        #[serde(rename = "fragment")]
        Fragment "fragment",
    }
}

crate::enum_as_str! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
    pub enum ShaderSpec {
        #[serde(rename = "gles2")]
        Gles2 "gles2",
        #[serde(rename = "webgl")]
        WebGL "webgl",
    }
}

impl ShaderType {
    /// infer shader type from `.vert` / `.frag` style file extensions
    pub fn from_path(path: &Path) -> Option<ShaderType> {
        match path.extension()?.to_str()? {
            "vert" | "vs" | "vsh" => Some(ShaderType::Vertex),
            "frag" | "fs" | "fsh" => Some(ShaderType::Fragment),
            _ => None,
        }
    }
}

/// Target limits and supported extensions, table key `[resources]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resources {
    pub max_vertex_attribs: i32,
    pub max_vertex_uniform_vectors: i32,
    pub max_varying_vectors: i32,
    pub max_vertex_texture_image_units: i32,
    pub max_combined_texture_image_units: i32,
    pub max_texture_image_units: i32,
    pub max_fragment_uniform_vectors: i32,
    pub max_draw_buffers: i32,

    pub oes_standard_derivatives: bool,
    pub oes_egl_image_external: bool,
    pub arb_texture_rectangle: bool,
    pub ext_draw_buffers: bool,
    pub ext_frag_depth: bool,
    pub ext_shader_texture_lod: bool,

    pub fragment_precision_high: bool,
}

impl Default for Resources {
    fn default() -> Resources {
        Resources {
            max_vertex_attribs: 8,
            max_vertex_uniform_vectors: 128,
            max_varying_vectors: 8,
            max_vertex_texture_image_units: 0,
            max_combined_texture_image_units: 8,
            max_texture_image_units: 8,
            max_fragment_uniform_vectors: 16,
            max_draw_buffers: 1,
            oes_standard_derivatives: false,
            oes_egl_image_external: false,
            arb_texture_rectangle: false,
            ext_draw_buffers: false,
            ext_frag_depth: false,
            ext_shader_texture_lod: false,
            fragment_precision_high: false,
        }
    }
}

/// `Glint.toml` layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub shader: Option<ShaderType>,     // default shader type
    pub spec: Option<ShaderSpec>,       // default shader spec
    pub validate_loop_indexing: Option<bool>,
    pub unroll_sampler_loops: Option<bool>,
    #[serde(default)]
    pub resources: Resources,           // table key [resources]
}

#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub shader_type: ShaderType,
    pub spec: ShaderSpec,
    pub resources: Resources,
    /// run the limitations validator after a successful parse
    pub validate_loop_indexing: bool,
    /// flag `for` loops indexing sampler arrays for unrolling,
    /// rejecting float loop indices used that way
    pub unroll_sampler_loops: bool,
}

impl CompileOptions {
    pub fn new(shader_type: ShaderType, spec: ShaderSpec) -> CompileOptions {
        CompileOptions {
            shader_type,
            spec,
            resources: Resources::default(),
            validate_loop_indexing: spec == ShaderSpec::WebGL,
            unroll_sampler_loops: false,
        }
    }

    pub fn from_config(config: &ConfigFile, shader_type: ShaderType) -> CompileOptions {
        let spec = config.spec.unwrap_or(ShaderSpec::Gles2);
        let mut options = CompileOptions::new(shader_type, spec);
        options.resources = config.resources.clone();
        if let Some(validate) = config.validate_loop_indexing {
            options.validate_loop_indexing = validate;
        }
        if let Some(unroll) = config.unroll_sampler_loops {
            options.unroll_sampler_loops = unroll;
        }
        options
    }
}

pub fn serialize(config: &ConfigFile) -> Result<String, Error> {
    basic_toml::to_string(config).map_err(|error| {
        Error::message(format!("failed to serialize config file\nreason: {}", error))
    })
}

pub fn deserialize(config: &str, config_path: &Path) -> Result<ConfigFile, Error> {
    basic_toml::from_str(config).map_err(|error| {
        Error::message(format!(
            "failed to parse config file: `{}`\nreason: {}",
            config_path.to_string_lossy(),
            error
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let text = r#"
shader = "fragment"
spec = "webgl"

[resources]
max_draw_buffers = 4
oes_standard_derivatives = true
"#;
        let config = deserialize(text, Path::new("Glint.toml")).ok().unwrap();
        assert_eq!(config.shader, Some(ShaderType::Fragment));
        assert_eq!(config.resources.max_draw_buffers, 4);
        assert_eq!(config.resources.max_vertex_attribs, 8);
        assert!(config.resources.oes_standard_derivatives);

        let options = CompileOptions::from_config(&config, ShaderType::Fragment);
        assert_eq!(options.spec, ShaderSpec::WebGL);
        assert!(options.validate_loop_indexing);
        assert!(!options.unroll_sampler_loops);
    }

    #[test]
    fn bad_config_is_error() {
        let error = deserialize("spec = \"gles3\"", Path::new("Glint.toml")).err().unwrap();
        assert!(error.diagnostic().msg.contains("Glint.toml"));
    }

    #[test]
    fn shader_type_names() {
        assert_eq!(ShaderType::from_str("vertex"), Some(ShaderType::Vertex));
        assert_eq!(ShaderType::Fragment.as_str(), "fragment");
        assert_eq!(ShaderType::from_path(Path::new("a/b.frag")), Some(ShaderType::Fragment));
        assert_eq!(ShaderType::from_path(Path::new("shader.glsl")), None);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = ConfigFile { spec: Some(ShaderSpec::WebGL), ..ConfigFile::default() };
        let text = serialize(&config).ok().unwrap();
        let back = deserialize(&text, Path::new("Glint.toml")).ok().unwrap();
        assert_eq!(back.spec, Some(ShaderSpec::WebGL));
        assert_eq!(back.resources, Resources::default());
    }
}
