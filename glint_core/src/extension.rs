use crate::config::Resources;
use crate::support::AsStr;
use rustc_hash::FxHashMap;

crate::enum_as_str! {
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub enum ExtensionBehavior {
        Require "require",
        Enable "enable",
        Warn "warn",
        Disable "disable",
        Undefined "undefined",
    }
}

impl ExtensionBehavior {
    /// behavior named by an `#extension` directive,
    /// `Undefined` when the string is not one of the four legal values
    pub fn from_directive(behavior: &str) -> ExtensionBehavior {
        match ExtensionBehavior::from_str(behavior) {
            Some(ExtensionBehavior::Undefined) | None => ExtensionBehavior::Undefined,
            Some(behavior) => behavior,
        }
    }
}

pub const EXT_STANDARD_DERIVATIVES: &str = "GL_OES_standard_derivatives";
pub const EXT_EGL_IMAGE_EXTERNAL: &str = "GL_OES_EGL_image_external";
pub const EXT_TEXTURE_RECTANGLE: &str = "GL_ARB_texture_rectangle";
pub const EXT_DRAW_BUFFERS: &str = "GL_EXT_draw_buffers";
pub const EXT_FRAG_DEPTH: &str = "GL_EXT_frag_depth";
pub const EXT_SHADER_TEXTURE_LOD: &str = "GL_EXT_shader_texture_lod";

/// Extension name to behavior mapping.  
/// Keys are the extensions supported by the target, seeded once per unit.
#[derive(Clone, Default)]
pub struct ExtensionTable {
    behaviors: FxHashMap<String, ExtensionBehavior>,
}

impl ExtensionTable {
    pub fn new() -> ExtensionTable {
        ExtensionTable { behaviors: FxHashMap::default() }
    }

    pub fn from_resources(resources: &Resources) -> ExtensionTable {
        let mut table = ExtensionTable::new();
        let supported = [
            (resources.oes_standard_derivatives, EXT_STANDARD_DERIVATIVES),
            (resources.oes_egl_image_external, EXT_EGL_IMAGE_EXTERNAL),
            (resources.arb_texture_rectangle, EXT_TEXTURE_RECTANGLE),
            (resources.ext_draw_buffers, EXT_DRAW_BUFFERS),
            (resources.ext_frag_depth, EXT_FRAG_DEPTH),
            (resources.ext_shader_texture_lod, EXT_SHADER_TEXTURE_LOD),
        ];
        for (enabled, name) in supported {
            if enabled {
                table.add(name, ExtensionBehavior::Undefined);
            }
        }
        table
    }

    pub fn add(&mut self, name: &str, behavior: ExtensionBehavior) {
        self.behaviors.insert(name.to_string(), behavior);
    }
    pub fn get(&self, name: &str) -> Option<ExtensionBehavior> {
        self.behaviors.get(name).copied()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.behaviors.contains_key(name)
    }
    /// overwrites an existing entry, returns `false` for unknown names
    pub fn set(&mut self, name: &str, behavior: ExtensionBehavior) -> bool {
        match self.behaviors.get_mut(name) {
            Some(entry) => {
                *entry = behavior;
                true
            }
            None => false,
        }
    }
    pub fn set_all(&mut self, behavior: ExtensionBehavior) {
        for entry in self.behaviors.values_mut() {
            *entry = behavior;
        }
    }
    pub fn is_enabled(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ExtensionBehavior::Require | ExtensionBehavior::Enable))
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
    /// entries sorted by name
    pub fn entries(&self) -> Vec<(&str, ExtensionBehavior)> {
        let mut entries: Vec<_> =
            self.behaviors.iter().map(|(name, behavior)| (name.as_str(), *behavior)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// `#pragma optimize` and `#pragma debug` state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Pragma {
    pub optimize: bool,
    pub debug: bool,
}

impl Default for Pragma {
    fn default() -> Pragma {
        Pragma { optimize: true, debug: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn behavior_from_directive() {
        assert_eq!(ExtensionBehavior::from_directive("require"), ExtensionBehavior::Require);
        assert_eq!(ExtensionBehavior::from_directive("warn"), ExtensionBehavior::Warn);
        assert_eq!(ExtensionBehavior::from_directive("undefined"), ExtensionBehavior::Undefined);
        assert_eq!(ExtensionBehavior::from_directive("Enable"), ExtensionBehavior::Undefined);
    }

    #[test]
    fn seeded_from_resources() {
        let mut resources = Resources::default();
        resources.oes_standard_derivatives = true;
        resources.ext_frag_depth = true;
        let table = ExtensionTable::from_resources(&resources);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(EXT_STANDARD_DERIVATIVES), Some(ExtensionBehavior::Undefined));
        assert!(!table.contains(EXT_DRAW_BUFFERS));
        assert!(!table.is_enabled(EXT_FRAG_DEPTH));
    }
}
