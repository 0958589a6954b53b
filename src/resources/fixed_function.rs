//! Fixed-Function Pass Description
//!
//! The non-programmable configuration of a pass: surface colours, lighting,
//! fog, texture layers and the vertex format the pass is drawn with. This is
//! the input the shader generator converts into equivalent shader code.

use bitflags::bitflags;
use glam::{Vec3, Vec4};
use smallvec::SmallVec;

/// Maximum number of texture units the fixed-function texturing stage maps.
pub const MAX_TEXTURE_UNITS: usize = 8;

bitflags! {
    /// Vertex attributes present in the vertex stream.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct VertexElements: u32 {
        const POSITION = 1 << 0;
        const NORMAL   = 1 << 1;
        const DIFFUSE  = 1 << 2;
        const SPECULAR = 1 << 3;
        const TANGENT  = 1 << 4;
    }
}

bitflags! {
    /// Material colour channels that follow the vertex colour instead.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TrackVertexColour: u32 {
        const AMBIENT  = 1 << 0;
        const DIFFUSE  = 1 << 1;
        const SPECULAR = 1 << 2;
        const EMISSIVE = 1 << 3;
    }
}

/// Vertex stream layout of the geometry drawn with a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    pub elements: VertexElements,
    /// Number of texture coordinate sets.
    pub tex_coord_sets: u8,
}

impl Default for VertexFormat {
    fn default() -> Self {
        Self {
            elements: VertexElements::POSITION | VertexElements::NORMAL,
            tex_coord_sets: 1,
        }
    }
}

impl VertexFormat {
    #[inline]
    #[must_use]
    pub fn has_normals(&self) -> bool {
        self.elements.contains(VertexElements::NORMAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FogMode {
    #[default]
    None,
    Linear,
    Exp,
    Exp2,
}

impl FogMode {
    #[must_use]
    pub fn as_define(self) -> &'static str {
        match self {
            FogMode::None => "NONE",
            FogMode::Linear => "LINEAR",
            FogMode::Exp => "EXP",
            FogMode::Exp2 => "EXP2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    pub mode: FogMode,
    pub colour: Vec3,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            mode: FogMode::None,
            colour: Vec3::ONE,
            start: 0.0,
            end: 1.0,
            density: 0.001,
        }
    }
}

/// How a texture layer combines with the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerBlend {
    #[default]
    Modulate,
    Add,
    Replace,
    AlphaBlend,
}

impl LayerBlend {
    #[must_use]
    pub fn as_define(self) -> &'static str {
        match self {
            LayerBlend::Modulate => "MODULATE",
            LayerBlend::Add => "ADD",
            LayerBlend::Replace => "REPLACE",
            LayerBlend::AlphaBlend => "ALPHA_BLEND",
        }
    }
}

/// Texture coordinate generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexCoordCalc {
    /// Use the vertex texture coordinate set as-is.
    #[default]
    None,
    /// Spherical environment mapping from the view-space normal.
    EnvironmentMap,
    /// Projective texturing from a texture projector frustum.
    Projective,
}

impl TexCoordCalc {
    #[must_use]
    pub fn as_define(self) -> &'static str {
        match self {
            TexCoordCalc::None => "NONE",
            TexCoordCalc::EnvironmentMap => "ENVIRONMENT_MAP",
            TexCoordCalc::Projective => "PROJECTIVE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureUnitState {
    pub texture_name: String,
    pub tex_coord_set: u8,
    pub blend: LayerBlend,
    pub coord_calc: TexCoordCalc,
}

impl TextureUnitState {
    #[must_use]
    pub fn new(texture_name: impl Into<String>) -> Self {
        Self {
            texture_name: texture_name.into(),
            tex_coord_set: 0,
            blend: LayerBlend::Modulate,
            coord_calc: TexCoordCalc::None,
        }
    }

    #[must_use]
    pub fn with_tex_coord_set(mut self, set: u8) -> Self {
        self.tex_coord_set = set;
        self
    }

    #[must_use]
    pub fn with_blend(mut self, blend: LayerBlend) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_coord_calc(mut self, calc: TexCoordCalc) -> Self {
        self.coord_calc = calc;
        self
    }
}

/// Full fixed-function state of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionState {
    pub lighting_enabled: bool,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
    pub track_vertex_colour: TrackVertexColour,
    pub fog: FogState,
    pub texture_units: SmallVec<[TextureUnitState; 4]>,
    pub vertex_format: VertexFormat,
}

impl Default for FixedFunctionState {
    fn default() -> Self {
        Self {
            lighting_enabled: true,
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::ZERO,
            emissive: Vec4::ZERO,
            shininess: 0.0,
            track_vertex_colour: TrackVertexColour::empty(),
            fog: FogState::default(),
            texture_units: SmallVec::new(),
            vertex_format: VertexFormat::default(),
        }
    }
}

impl FixedFunctionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_lighting(mut self, enabled: bool) -> Self {
        self.lighting_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_texture_unit(mut self, unit: TextureUnitState) -> Self {
        self.texture_units.push(unit);
        self
    }

    #[must_use]
    pub fn with_fog(mut self, fog: FogState) -> Self {
        self.fog = fog;
        self
    }

    #[must_use]
    pub fn with_vertex_format(mut self, format: VertexFormat) -> Self {
        self.vertex_format = format;
        self
    }

    /// Specular highlights only contribute when both colour and exponent are set.
    #[must_use]
    pub fn uses_specular(&self) -> bool {
        self.shininess > 0.0 && self.specular.truncate() != Vec3::ZERO
    }
}
