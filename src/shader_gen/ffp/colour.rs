use crate::errors::Result;
use crate::resources::{ShaderDefines, TrackVertexColour, VertexElements};
use crate::shader_gen::program::{ParamValue, ProgramParameters};
use crate::shader_gen::sub_render_state::{BuildContext, ParamContext, SubRenderState};

use super::{FFP_COLOUR, FFP_COLOUR_TYPE};

/// Resolves where the diffuse and specular colours come from.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfpColour {
    track: TrackVertexColour,
    /// Vertex colour replaces the lit colour when lighting is off.
    vertex_colour_input: bool,
}

impl SubRenderState for FfpColour {
    fn type_name(&self) -> &str {
        FFP_COLOUR_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_COLOUR
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(*self)
    }

    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool> {
        let ff = &ctx.src_pass.fixed_function;
        let elements = ff.vertex_format.elements;

        // Tracking a channel the vertex stream does not carry is a no-op.
        self.track = TrackVertexColour::empty();
        if elements.contains(VertexElements::DIFFUSE) {
            self.track |= ff.track_vertex_colour
                & (TrackVertexColour::AMBIENT | TrackVertexColour::DIFFUSE | TrackVertexColour::EMISSIVE);
        }
        if elements.contains(VertexElements::SPECULAR) {
            self.track |= ff.track_vertex_colour & TrackVertexColour::SPECULAR;
        }
        self.vertex_colour_input = !ff.lighting_enabled && elements.contains(VertexElements::DIFFUSE);
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FFP_COLOUR");
        for (channel, define) in [
            (TrackVertexColour::AMBIENT, "TRACK_VERTEX_AMBIENT"),
            (TrackVertexColour::DIFFUSE, "TRACK_VERTEX_DIFFUSE"),
            (TrackVertexColour::SPECULAR, "TRACK_VERTEX_SPECULAR"),
            (TrackVertexColour::EMISSIVE, "TRACK_VERTEX_EMISSIVE"),
        ] {
            if self.track.contains(channel) {
                defines.enable(define);
            }
        }
        if self.vertex_colour_input {
            defines.enable("VERTEX_COLOUR_INPUT");
        }
    }

    fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        let ff = &ctx.pass.fixed_function;
        params.set("ambient_colour", ParamValue::Vec4(ff.ambient));
        params.set("diffuse_colour", ParamValue::Vec4(ff.diffuse));
        params.set("emissive_colour", ParamValue::Vec4(ff.emissive));
    }
}
