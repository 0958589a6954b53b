//! Scene-side types observed by the shader generator:
//! - Light: light sources handed to the per-object callback
//! - Renderable: a drawable object bound to a material
//! - Viewport: carries the material scheme used to pick techniques

pub mod light;
pub mod renderable;
pub mod viewport;

pub use light::{Light, LightKind, LightType};
pub use renderable::Renderable;
pub use viewport::Viewport;
