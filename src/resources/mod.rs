//! Resource definitions consumed by the shader generator.
//!
//! None of these types depend on a GPU:
//! - `material`: material library, techniques and passes
//! - `fixed_function`: fixed-function pass state (generation input)
//! - `shader_defines`: interned macro sets used for generation and hashing

pub mod fixed_function;
pub mod material;
pub mod shader_defines;

pub use fixed_function::{
    FixedFunctionState, FogMode, FogState, LayerBlend, MAX_TEXTURE_UNITS, TexCoordCalc,
    TextureUnitState, TrackVertexColour, VertexElements, VertexFormat,
};
pub use material::{
    DEFAULT_MATERIAL_SCHEME, Material, MaterialId, MaterialLibrary, Pass, PassHandle,
    SharedMaterialLibrary, Technique, TechniqueHandle, TechniqueId,
};
pub use shader_defines::ShaderDefines;
