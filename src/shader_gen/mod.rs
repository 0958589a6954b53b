//! Runtime shader generation.
//!
//! - `generator`: the [`ShaderGenerator`] context object
//! - `entries` / `scheme`: bookkeeping of generated techniques
//! - `render_state` / `sub_render_state`: generation recipes
//! - `ffp` / `per_pixel`: built-in sub render states
//! - `cache`: render state deduplication
//! - `program`: program manager boundary and the template-based default

pub mod cache;
pub mod entries;
pub mod ffp;
pub mod generator;
pub mod per_pixel;
pub mod program;
pub mod render_state;
pub mod scheme;
pub mod settings;
pub mod sub_render_state;

pub use cache::RenderStateCache;
pub use entries::{PassKey, SgMaterial, SgPass, SgTechnique, TechniqueKey};
pub use generator::{ProgramManagerFactory, RenderStateMut, ShaderGenerator};
pub use per_pixel::{PER_PIXEL_LIGHTING_TYPE, PerPixelLighting, PerPixelLightingFactory};
pub use program::{
    GpuProgram, GpuProgramSet, ParamValue, ProgramManager, ProgramParameters, ProgramSettings,
    ShaderStage, TemplateProgramManager,
};
pub use render_state::RenderState;
pub use scheme::SgScheme;
pub use settings::{DEFAULT_SCHEME_NAME, ShaderGeneratorSettings};
pub use sub_render_state::{
    BuildContext, FactoryRegistry, ParamContext, SubRenderState, SubRenderStateFactory,
};
