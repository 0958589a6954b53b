//! Per-pixel lighting
//!
//! Replaces the per-vertex lighting stage of the fixed-function conversion
//! with lighting evaluated in the fragment program. The state occupies the
//! same execution slot as `FFP_Lighting`, so adding it to a scheme's global
//! render state (or a pass's custom state) overrides the automatic one.

use crate::errors::{Result, ShaderGenError};
use crate::resources::ShaderDefines;
use crate::shader_gen::ffp::{FFP_LIGHTING, write_light_defines, write_light_params};
use crate::shader_gen::program::ProgramParameters;
use crate::shader_gen::sub_render_state::{
    BuildContext, ParamContext, SubRenderState, SubRenderStateFactory,
};

pub const PER_PIXEL_LIGHTING_TYPE: &str = "SGX_PerPixelLighting";

#[derive(Debug, Clone, Copy, Default)]
pub struct PerPixelLighting {
    light_count: [u32; 3],
    specular: bool,
}

impl SubRenderState for PerPixelLighting {
    fn type_name(&self) -> &str {
        PER_PIXEL_LIGHTING_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_LIGHTING
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(*self)
    }

    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool> {
        let ff = &ctx.src_pass.fixed_function;
        if !ff.lighting_enabled {
            return Ok(false);
        }
        if !ff.vertex_format.has_normals() {
            return Err(ShaderGenError::build_failure(
                PER_PIXEL_LIGHTING_TYPE,
                format!("pass '{}' has no vertex normals", ctx.src_pass.name),
            ));
        }
        self.light_count = ctx.light_count;
        self.specular = ff.uses_specular();
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("PER_PIXEL_LIGHTING");
        write_light_defines(self.light_count, self.specular, defines);
    }

    fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        write_light_params(self.light_count, ctx, params);
    }
}

/// Opt-in: contributes nothing to automatic conversion.
#[derive(Debug, Default)]
pub struct PerPixelLightingFactory;

impl SubRenderStateFactory for PerPixelLightingFactory {
    fn type_name(&self) -> &str {
        PER_PIXEL_LIGHTING_TYPE
    }

    fn create_instance(&self) -> Box<dyn SubRenderState> {
        Box::new(PerPixelLighting::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FixedFunctionState, Pass, VertexElements, VertexFormat};

    #[test]
    fn not_part_of_automatic_conversion() {
        let pass = Pass::new("p", FixedFunctionState::default());
        let ctx = BuildContext {
            src_pass: &pass,
            dst_pass: &pass,
            light_count: [0, 1, 0],
        };
        assert!(PerPixelLightingFactory.create_for_pass(&ctx).unwrap().is_none());
    }

    #[test]
    fn requires_normals() {
        let pass = Pass::new(
            "p",
            FixedFunctionState::default().with_vertex_format(VertexFormat {
                elements: VertexElements::POSITION,
                tex_coord_sets: 0,
            }),
        );
        let ctx = BuildContext {
            src_pass: &pass,
            dst_pass: &pass,
            light_count: [0, 1, 0],
        };
        let mut state = PerPixelLighting::default();
        assert!(state.prepare(&ctx).unwrap_err().is_build_failure());
    }
}
