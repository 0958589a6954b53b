use smallvec::SmallVec;

use crate::errors::{Result, ShaderGenError};
use crate::resources::{LayerBlend, MAX_TEXTURE_UNITS, ShaderDefines, TexCoordCalc};
use crate::shader_gen::sub_render_state::{BuildContext, SubRenderState};

use super::{FFP_TEXTURING, FFP_TEXTURING_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UnitSetup {
    tex_coord_set: u8,
    blend: LayerBlend,
    coord_calc: TexCoordCalc,
}

/// One sampling + blending stage per texture unit of the pass.
#[derive(Debug, Clone, Default)]
pub struct FfpTexturing {
    units: SmallVec<[UnitSetup; 4]>,
}

impl SubRenderState for FfpTexturing {
    fn type_name(&self) -> &str {
        FFP_TEXTURING_TYPE
    }

    fn execution_order(&self) -> i32 {
        FFP_TEXTURING
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool> {
        let ff = &ctx.src_pass.fixed_function;
        if ff.texture_units.is_empty() {
            return Ok(false);
        }
        if ff.texture_units.len() > MAX_TEXTURE_UNITS {
            return Err(ShaderGenError::build_failure(
                FFP_TEXTURING_TYPE,
                format!(
                    "pass '{}' uses {} texture units, at most {MAX_TEXTURE_UNITS} are supported",
                    ctx.src_pass.name,
                    ff.texture_units.len()
                ),
            ));
        }

        let mut units = SmallVec::new();
        for (i, unit) in ff.texture_units.iter().enumerate() {
            match unit.coord_calc {
                TexCoordCalc::None if unit.tex_coord_set >= ff.vertex_format.tex_coord_sets => {
                    return Err(ShaderGenError::build_failure(
                        FFP_TEXTURING_TYPE,
                        format!(
                            "texture unit {i} ('{}') reads coordinate set {} but the vertex format has {}",
                            unit.texture_name, unit.tex_coord_set, ff.vertex_format.tex_coord_sets
                        ),
                    ));
                }
                TexCoordCalc::EnvironmentMap if !ff.vertex_format.has_normals() => {
                    return Err(ShaderGenError::build_failure(
                        FFP_TEXTURING_TYPE,
                        format!("texture unit {i} uses environment mapping without vertex normals"),
                    ));
                }
                _ => {}
            }
            units.push(UnitSetup {
                tex_coord_set: unit.tex_coord_set,
                blend: unit.blend,
                coord_calc: unit.coord_calc,
            });
        }
        self.units = units;
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FFP_TEXTURING");
        defines.set_value("TEXTURE_UNIT_COUNT", self.units.len());
        for (i, unit) in self.units.iter().enumerate() {
            defines.set_value(&format!("TEXTURE_UNIT_{i}_COORD_SET"), unit.tex_coord_set);
            defines.set(&format!("TEXTURE_UNIT_{i}_BLEND"), unit.blend.as_define());
            defines.set(&format!("TEXTURE_UNIT_{i}_CALC"), unit.coord_calc.as_define());
        }
    }
}
