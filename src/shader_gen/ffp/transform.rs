use crate::errors::Result;
use crate::resources::ShaderDefines;
use crate::shader_gen::program::{ParamValue, ProgramParameters};
use crate::shader_gen::sub_render_state::{BuildContext, ParamContext, SubRenderState};

use super::{FFP_TRANSFORM, FFP_TRANSFORM_TYPE};

/// Object-to-clip-space transform of the vertex position. Also declares the
/// vertex inputs later stages may read.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfpTransform {
    normals: bool,
    tex_coord_sets: u8,
}

impl SubRenderState for FfpTransform {
    fn type_name(&self) -> &str {
        FFP_TRANSFORM_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_TRANSFORM
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(*self)
    }

    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool> {
        let format = &ctx.src_pass.fixed_function.vertex_format;
        self.normals = format.has_normals();
        self.tex_coord_sets = format.tex_coord_sets;
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FFP_TRANSFORM");
        if self.normals {
            defines.enable("VERTEX_NORMALS");
        }
        defines.set_value("TEX_COORD_SETS", self.tex_coord_sets);
    }

    fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        params.set(
            "world_matrix",
            ParamValue::Mat4(ctx.renderable.world_transform),
        );
    }
}
