//! Shader Generator Settings
//!
//! Output configuration applied to every program the generator acquires.
//!
//! ```rust,ignore
//! use myth_shadergen::{ShaderGenerator, ShaderGeneratorSettings};
//!
//! let settings = ShaderGeneratorSettings {
//!     shader_language: "glsles".into(),
//!     light_count: [0, 2, 0],
//!     ..Default::default()
//! };
//! let generator = ShaderGenerator::new(library, settings);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shader_gen::program::ProgramSettings;

/// Name of the scheme used by callers that do not pick their own.
pub const DEFAULT_SCHEME_NAME: &str = "ShaderGeneratorDefaultScheme";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderGeneratorSettings {
    /// Target shading language: `"wgsl"` or `"glsles"`.
    pub shader_language: String,

    /// Profile list handed to the vertex program compiler.
    pub vertex_profiles: String,

    /// Profile list handed to the fragment program compiler.
    pub fragment_profiles: String,

    /// Directory generated sources may be cached in. `None` keeps everything
    /// in memory.
    pub shader_cache_path: Option<PathBuf>,

    /// Number of lights each generated lighting stage handles, per type:
    /// `[point, directional, spot]`.
    pub light_count: [u32; 3],
}

impl Default for ShaderGeneratorSettings {
    fn default() -> Self {
        Self {
            shader_language: "wgsl".to_owned(),
            vertex_profiles: "vs_5_0".to_owned(),
            fragment_profiles: "ps_5_0".to_owned(),
            shader_cache_path: None,
            light_count: [0, 1, 0],
        }
    }
}

impl ShaderGeneratorSettings {
    #[must_use]
    pub fn program_settings(&self) -> ProgramSettings {
        ProgramSettings {
            language: self.shader_language.clone(),
            vertex_profiles: self.vertex_profiles.clone(),
            fragment_profiles: self.fragment_profiles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_survive_a_config_file() {
        let settings = ShaderGeneratorSettings {
            shader_language: "glsles".to_owned(),
            shader_cache_path: Some(PathBuf::from("cache/shaders")),
            light_count: [2, 1, 0],
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let restored: ShaderGeneratorSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let restored: ShaderGeneratorSettings =
            serde_json::from_str(r#"{ "light_count": [1, 0, 0] }"#).unwrap();
        assert_eq!(restored.light_count, [1, 0, 0]);
        assert_eq!(restored.shader_language, "wgsl");
        assert_eq!(restored.shader_cache_path, None);
    }
}
