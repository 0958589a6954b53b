#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader_gen;
pub mod utils;

pub use errors::{Result, ShaderGenError};
pub use renderer::{DrawBinding, DrawOverride, ListenerId, RenderObjectEvent, SceneRenderer};
pub use resources::{
    FixedFunctionState, Material, MaterialLibrary, Pass, ShaderDefines, SharedMaterialLibrary,
    Technique,
};
pub use scene::{Light, Renderable, Viewport};
pub use shader_gen::{
    DEFAULT_SCHEME_NAME, RenderState, ShaderGenerator, ShaderGeneratorSettings, SubRenderState,
    SubRenderStateFactory,
};
pub use utils::interner;
