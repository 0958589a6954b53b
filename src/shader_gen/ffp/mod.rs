//! Fixed-Function Conversion
//!
//! The built-in sub render states that reproduce the fixed-function pipeline
//! in generated shader code. Each has a factory whose `create_for_pass`
//! inspects the source pass, so registering these factories is what makes a
//! plain fixed-function pass convertible.
//!
//! | Type | Order | Skipped when |
//! |------|-------|--------------|
//! | `FFP_Transform` | 100 | never |
//! | `FFP_Colour` | 200 | never |
//! | `FFP_Lighting` | 300 | lighting off or no normals |
//! | `FFP_Texturing` | 400 | no texture units |
//! | `FFP_Fog` | 500 | fog off |

mod colour;
mod fog;
mod lighting;
mod texturing;
mod transform;

use std::sync::Arc;

use crate::errors::Result;
use crate::shader_gen::per_pixel::PerPixelLightingFactory;
use crate::shader_gen::sub_render_state::{
    BuildContext, SubRenderState, SubRenderStateFactory, prepared_instance,
};

pub use colour::FfpColour;
pub use fog::FfpFog;
pub use lighting::FfpLighting;
pub(crate) use lighting::{write_light_defines, write_light_params};
pub use texturing::FfpTexturing;
pub use transform::FfpTransform;

// Execution orders
pub const FFP_TRANSFORM: i32 = 100;
pub const FFP_COLOUR: i32 = 200;
pub const FFP_LIGHTING: i32 = 300;
pub const FFP_TEXTURING: i32 = 400;
pub const FFP_FOG: i32 = 500;

// Type names
pub const FFP_TRANSFORM_TYPE: &str = "FFP_Transform";
pub const FFP_COLOUR_TYPE: &str = "FFP_Colour";
pub const FFP_LIGHTING_TYPE: &str = "FFP_Lighting";
pub const FFP_TEXTURING_TYPE: &str = "FFP_Texturing";
pub const FFP_FOG_TYPE: &str = "FFP_Fog";

macro_rules! ffp_factory {
    ($factory:ident, $state:ty, $type_name:expr) => {
        #[derive(Debug, Default)]
        pub struct $factory;

        impl SubRenderStateFactory for $factory {
            fn type_name(&self) -> &str {
                $type_name
            }

            fn create_instance(&self) -> Box<dyn SubRenderState> {
                Box::new(<$state>::default())
            }

            fn create_for_pass(
                &self,
                ctx: &BuildContext<'_>,
            ) -> Result<Option<Box<dyn SubRenderState>>> {
                prepared_instance(self, ctx)
            }
        }
    };
}

ffp_factory!(FfpTransformFactory, FfpTransform, FFP_TRANSFORM_TYPE);
ffp_factory!(FfpColourFactory, FfpColour, FFP_COLOUR_TYPE);
ffp_factory!(FfpLightingFactory, FfpLighting, FFP_LIGHTING_TYPE);
ffp_factory!(FfpTexturingFactory, FfpTexturing, FFP_TEXTURING_TYPE);
ffp_factory!(FfpFogFactory, FfpFog, FFP_FOG_TYPE);

/// Factories registered by `ShaderGenerator::initialize`.
#[must_use]
pub fn builtin_factories() -> Vec<Arc<dyn SubRenderStateFactory>> {
    vec![
        Arc::new(FfpTransformFactory),
        Arc::new(FfpColourFactory),
        Arc::new(FfpLightingFactory),
        Arc::new(FfpTexturingFactory),
        Arc::new(FfpFogFactory),
        Arc::new(PerPixelLightingFactory),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{
        FixedFunctionState, FogMode, FogState, Pass, ShaderDefines, TextureUnitState,
        TrackVertexColour, VertexElements, VertexFormat,
    };

    fn ctx_for(pass: &Pass) -> BuildContext<'_> {
        BuildContext {
            src_pass: pass,
            dst_pass: pass,
            light_count: [1, 1, 0],
        }
    }

    fn defines_of(state: &dyn SubRenderState) -> ShaderDefines {
        let mut defines = ShaderDefines::new();
        state.write_defines(&mut defines);
        defines
    }

    #[test]
    fn lighting_skipped_when_disabled() {
        let pass = Pass::new("p", FixedFunctionState::default().with_lighting(false));
        let out = FfpLightingFactory.create_for_pass(&ctx_for(&pass)).unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn lighting_emits_light_counts() {
        let pass = Pass::new("p", FixedFunctionState::default());
        let state = FfpLightingFactory
            .create_for_pass(&ctx_for(&pass))
            .unwrap()
            .unwrap();
        let defines = defines_of(state.as_ref());
        assert_eq!(defines.get("POINT_LIGHT_COUNT").as_deref(), Some("1"));
        assert_eq!(defines.get("DIRECTIONAL_LIGHT_COUNT").as_deref(), Some("1"));
        assert_eq!(defines.get("LIGHT_TOTAL").as_deref(), Some("2"));
        assert!(!defines.contains("USE_SPECULAR"));
    }

    #[test]
    fn colour_tracking_emits_every_channel() {
        let mut ff = FixedFunctionState::default().with_vertex_format(VertexFormat {
            elements: VertexElements::POSITION
                | VertexElements::NORMAL
                | VertexElements::DIFFUSE
                | VertexElements::SPECULAR,
            tex_coord_sets: 1,
        });
        ff.track_vertex_colour = TrackVertexColour::all();
        let pass = Pass::new("p", ff);
        let state = FfpColourFactory
            .create_for_pass(&ctx_for(&pass))
            .unwrap()
            .unwrap();

        let defines = defines_of(state.as_ref());
        for define in [
            "TRACK_VERTEX_AMBIENT",
            "TRACK_VERTEX_DIFFUSE",
            "TRACK_VERTEX_SPECULAR",
            "TRACK_VERTEX_EMISSIVE",
        ] {
            assert!(defines.contains(define), "{define} missing");
        }
    }

    #[test]
    fn colour_tracking_needs_vertex_colours() {
        let mut ff = FixedFunctionState::default();
        ff.track_vertex_colour = TrackVertexColour::AMBIENT | TrackVertexColour::EMISSIVE;
        let pass = Pass::new("p", ff);
        let state = FfpColourFactory
            .create_for_pass(&ctx_for(&pass))
            .unwrap()
            .unwrap();

        let defines = defines_of(state.as_ref());
        assert!(!defines.contains("TRACK_VERTEX_AMBIENT"));
        assert!(!defines.contains("TRACK_VERTEX_EMISSIVE"));
    }

    #[test]
    fn texturing_rejects_too_many_units() {
        let mut ff = FixedFunctionState::default();
        for i in 0..=crate::resources::MAX_TEXTURE_UNITS {
            ff = ff.with_texture_unit(TextureUnitState::new(format!("t{i}")));
        }
        let pass = Pass::new("p", ff);
        let err = FfpTexturingFactory
            .create_for_pass(&ctx_for(&pass))
            .unwrap_err();
        assert!(err.is_build_failure());
    }

    #[test]
    fn texturing_rejects_missing_coord_set() {
        let ff = FixedFunctionState::default()
            .with_vertex_format(VertexFormat {
                elements: VertexElements::POSITION | VertexElements::NORMAL,
                tex_coord_sets: 1,
            })
            .with_texture_unit(TextureUnitState::new("detail").with_tex_coord_set(1));
        let pass = Pass::new("p", ff);
        assert!(FfpTexturingFactory.create_for_pass(&ctx_for(&pass)).is_err());
    }

    #[test]
    fn fog_only_when_enabled() {
        let plain = Pass::new("p", FixedFunctionState::default());
        assert!(FfpFogFactory.create_for_pass(&ctx_for(&plain)).unwrap().is_none());

        let foggy = Pass::new(
            "p",
            FixedFunctionState::default().with_fog(FogState {
                mode: FogMode::Exp2,
                ..FogState::default()
            }),
        );
        let state = FfpFogFactory.create_for_pass(&ctx_for(&foggy)).unwrap().unwrap();
        assert_eq!(defines_of(state.as_ref()).get("FOG_MODE").as_deref(), Some("EXP2"));
    }
}
