use glam::Vec4;

use crate::errors::Result;
use crate::resources::{FogMode, ShaderDefines};
use crate::shader_gen::program::{ParamValue, ProgramParameters};
use crate::shader_gen::sub_render_state::{BuildContext, ParamContext, SubRenderState};

use super::{FFP_FOG, FFP_FOG_TYPE};

/// Per-vertex fog factor blended into the final colour.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfpFog {
    mode: FogMode,
}

impl SubRenderState for FfpFog {
    fn type_name(&self) -> &str {
        FFP_FOG_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_FOG
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(*self)
    }

    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool> {
        self.mode = ctx.src_pass.fixed_function.fog.mode;
        Ok(self.mode != FogMode::None)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FFP_FOG");
        defines.set("FOG_MODE", self.mode.as_define());
    }

    fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        let fog = &ctx.pass.fixed_function.fog;
        let range = fog.end - fog.start;
        let inv_range = if range.abs() > f32::EPSILON { 1.0 / range } else { 0.0 };
        params.set("fog_colour", ParamValue::Vec4(fog.colour.extend(1.0)));
        params.set(
            "fog_params",
            ParamValue::Vec4(Vec4::new(fog.start, fog.end, fog.density, inv_range)),
        );
    }
}
