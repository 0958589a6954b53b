use glam::{Vec3, Vec4};

use crate::errors::Result;
use crate::resources::ShaderDefines;
use crate::scene::{Light, LightKind, LightType};
use crate::shader_gen::program::{ParamValue, ProgramParameters};
use crate::shader_gen::sub_render_state::{BuildContext, ParamContext, SubRenderState};

use super::{FFP_LIGHTING, FFP_LIGHTING_TYPE};

/// Per-vertex Blinn-Phong lighting for a fixed number of lights per type.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfpLighting {
    light_count: [u32; 3],
    specular: bool,
}

impl SubRenderState for FfpLighting {
    fn type_name(&self) -> &str {
        FFP_LIGHTING_TYPE
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
            log::debug!(
                "Pass '{}' has lighting enabled but no normals, lighting skipped",
                ctx.src_pass.name
            );
            return Ok(false);
        }
        self.light_count = ctx.light_count;
        self.specular = ff.uses_specular();
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FFP_LIGHTING");
        write_light_defines(self.light_count, self.specular, defines);
    }

    fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        write_light_params(self.light_count, ctx, params);
    }
}

pub(crate) fn write_light_defines(light_count: [u32; 3], specular: bool, defines: &mut ShaderDefines) {
    defines.set_value("POINT_LIGHT_COUNT", light_count[LightType::Point as usize]);
    defines.set_value(
        "DIRECTIONAL_LIGHT_COUNT",
        light_count[LightType::Directional as usize],
    );
    defines.set_value("SPOT_LIGHT_COUNT", light_count[LightType::Spot as usize]);
    defines.set_value("LIGHT_TOTAL", light_count.iter().sum::<u32>());
    if specular {
        defines.enable("USE_SPECULAR");
    }
}

/// Fills `light_<slot>_*` constants. Slots are laid out point lights first,
/// then directional, then spot; slots without a matching light are black.
pub(crate) fn write_light_params(
    light_count: [u32; 3],
    ctx: &ParamContext<'_>,
    params: &mut ProgramParameters,
) {
    let ff = &ctx.pass.fixed_function;
    params.set("specular_colour", ParamValue::Vec4(ff.specular));
    params.set("shininess", ParamValue::Float(ff.shininess));

    let mut slot = 0usize;
    for light_type in [LightType::Point, LightType::Directional, LightType::Spot] {
        let mut matching = ctx.lights.iter().filter(|l| l.light_type() == light_type);
        for _ in 0..light_count[light_type as usize] {
            match matching.next() {
                Some(light) => write_light(slot, light, params),
                None => {
                    params.set(format!("light_{slot}_colour"), ParamValue::Vec4(Vec4::ZERO));
                }
            }
            slot += 1;
        }
    }
}

fn write_light(slot: usize, light: &Light, params: &mut ProgramParameters) {
    let colour = (light.color * light.intensity).extend(1.0);
    params.set(format!("light_{slot}_colour"), ParamValue::Vec4(colour));

    match light.kind {
        LightKind::Directional(d) => {
            // w = 0 marks a direction rather than a position.
            params.set(
                format!("light_{slot}_position"),
                ParamValue::Vec4((-d.direction).extend(0.0)),
            );
        }
        LightKind::Point(p) => {
            params.set(
                format!("light_{slot}_position"),
                ParamValue::Vec4(p.position.extend(1.0)),
            );
            params.set(
                format!("light_{slot}_attenuation"),
                ParamValue::Vec4(attenuation(p.range)),
            );
        }
        LightKind::Spot(s) => {
            params.set(
                format!("light_{slot}_position"),
                ParamValue::Vec4(s.position.extend(1.0)),
            );
            params.set(
                format!("light_{slot}_direction"),
                ParamValue::Vec4(s.direction.extend(0.0)),
            );
            params.set(
                format!("light_{slot}_attenuation"),
                ParamValue::Vec4(attenuation(s.range)),
            );
            params.set(
                format!("light_{slot}_spot"),
                ParamValue::Vec3(Vec3::new(s.inner_cone.cos(), s.outer_cone.cos(), 1.0)),
            );
        }
    }
}

/// `(range, constant, linear, quadratic)`
fn attenuation(range: f32) -> Vec4 {
    let range = range.max(f32::EPSILON);
    Vec4::new(range, 1.0, 4.5 / range, 75.0 / (range * range))
}
