//! GPU Program Boundary
//!
//! The shader generator hands finished [`RenderState`]s to a
//! [`ProgramManager`], which turns them into program objects that can be
//! attached to a destination pass. Compilation, preprocessing and constant
//! extraction happen behind this trait; the generator only needs stable,
//! shareable handles back.
//!
//! [`TemplateProgramManager`] is the default implementation: it renders
//! source text from embedded templates and deduplicates identical sources.

pub mod template;

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use crate::errors::Result;
use crate::shader_gen::render_state::RenderState;

pub use template::TemplateProgramManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// One generated program object.
#[derive(Debug)]
pub struct GpuProgram {
    pub stage: ShaderStage,
    pub language: String,
    /// Target profile list the program is compiled against.
    pub profile: String,
    pub source: String,
    /// xxh3-128 of `source`.
    pub source_hash: u128,
}

/// Vertex + fragment programs realized for one render state.
#[derive(Debug, Clone)]
pub struct GpuProgramSet {
    pub vertex: Arc<GpuProgram>,
    pub fragment: Arc<GpuProgram>,
    /// Content hash of the render state the set was first generated for.
    pub render_state_hash: u32,
}

/// Output configuration shared by every acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSettings {
    pub language: String,
    pub vertex_profiles: String,
    pub fragment_profiles: String,
}

/// Realizes render states as GPU programs.
pub trait ProgramManager: Send {
    /// Returns programs for `state`, reusing existing objects where possible.
    fn acquire(
        &mut self,
        state: &RenderState,
        settings: &ProgramSettings,
    ) -> Result<Arc<GpuProgramSet>>;

    /// Gives back a set previously returned by [`acquire`](Self::acquire).
    /// Program objects no longer referenced anywhere are dropped.
    fn release(&mut self, programs: Arc<GpuProgramSet>);

    /// Directory where generated source may be cached.
    fn set_cache_path(&mut self, _path: Option<&Path>) {}

    /// Number of distinct program objects currently alive.
    fn program_count(&self) -> usize;
}

/// Value of one program constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

/// Named constants supplied alongside the programs for one draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramParameters {
    values: Vec<(String, ParamValue)>,
}

impl ProgramParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}
