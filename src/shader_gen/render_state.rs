//! Render State
//!
//! An ordered collection of sub render states describing how to generate the
//! programs of one pass. User-facing render states (scheme-wide and per-pass
//! custom ones) are plain recipes; the generator merges them with the
//! fixed-function conversion into a *final* render state, which is shared
//! through the [`RenderStateCache`](super::cache::RenderStateCache).
//!
//! Two render states are content-equal when their sub states, in order,
//! describe themselves with equal defines and their light counts match.

use std::fmt;
use std::hash::BuildHasher;

use crate::resources::ShaderDefines;
use crate::shader_gen::program::ProgramParameters;
use crate::shader_gen::sub_render_state::{ParamContext, SubRenderState};
use crate::utils::interner::{self, Symbol};

/// Per-sub-state content: type name plus the defines it emits.
pub type Signature = Vec<(Symbol, ShaderDefines)>;

#[derive(Default)]
pub struct RenderState {
    sub_states: Vec<Box<dyn SubRenderState>>,
    light_count: [u32; 3],
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a final state: sub states are ordered by execution order,
    /// keeping their relative order on ties.
    #[must_use]
    pub(crate) fn finalized(
        mut sub_states: Vec<Box<dyn SubRenderState>>,
        light_count: [u32; 3],
    ) -> Self {
        sub_states.sort_by_key(|s| s.execution_order());
        Self {
            sub_states,
            light_count,
        }
    }

    /// Adds a sub state, replacing one of the same type.
    pub fn add_sub_render_state(&mut self, sub_state: Box<dyn SubRenderState>) {
        match self
            .sub_states
            .iter_mut()
            .find(|s| s.type_name() == sub_state.type_name())
        {
            Some(slot) => *slot = sub_state,
            None => self.sub_states.push(sub_state),
        }
    }

    pub fn remove_sub_render_state(&mut self, type_name: &str) -> Option<Box<dyn SubRenderState>> {
        let idx = self
            .sub_states
            .iter()
            .position(|s| s.type_name() == type_name)?;
        Some(self.sub_states.remove(idx))
    }

    #[must_use]
    pub fn sub_render_state(&self, type_name: &str) -> Option<&dyn SubRenderState> {
        self.sub_states
            .iter()
            .find(|s| s.type_name() == type_name)
            .map(AsRef::as_ref)
    }

    pub fn sub_render_states(&self) -> impl Iterator<Item = &dyn SubRenderState> {
        self.sub_states.iter().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_states.is_empty()
    }

    pub fn clear(&mut self) {
        self.sub_states.clear();
    }

    #[inline]
    #[must_use]
    pub fn light_count(&self) -> [u32; 3] {
        self.light_count
    }

    pub fn set_light_count(&mut self, light_count: [u32; 3]) {
        self.light_count = light_count;
    }

    #[must_use]
    pub fn signature(&self) -> Signature {
        self.sub_states
            .iter()
            .map(|s| {
                let mut defines = ShaderDefines::new();
                s.write_defines(&mut defines);
                (interner::intern(s.type_name()), defines)
            })
            .collect()
    }

    /// 32-bit content hash used as the cache key.
    #[must_use]
    pub fn content_hash(&self) -> u32 {
        let wide = rustc_hash::FxBuildHasher.hash_one((&self.signature(), self.light_count));
        (wide ^ (wide >> 32)) as u32
    }

    /// Structural equality; hash equality alone is not enough to share.
    #[must_use]
    pub fn content_eq(&self, other: &RenderState) -> bool {
        self.light_count == other.light_count && self.signature() == other.signature()
    }

    /// All defines of all sub states merged, for template expansion.
    #[must_use]
    pub fn shader_defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::new();
        for s in &self.sub_states {
            s.write_defines(&mut defines);
        }
        defines
    }

    pub fn update_params(&self, ctx: &ParamContext<'_>, params: &mut ProgramParameters) {
        for s in &self.sub_states {
            s.update_params(ctx, params);
        }
    }
}

impl Clone for RenderState {
    fn clone(&self) -> Self {
        Self {
            sub_states: self.sub_states.iter().map(|s| s.duplicate()).collect(),
            light_count: self.light_count,
        }
    }
}

impl fmt::Debug for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderState")
            .field(
                "sub_states",
                &self.sub_states.iter().map(|s| s.type_name()).collect::<Vec<_>>(),
            )
            .field("light_count", &self.light_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_gen::ffp::{FfpFog, FfpTransform};

    #[test]
    fn finalized_orders_by_execution_order() {
        let state = RenderState::finalized(
            vec![Box::new(FfpFog::default()), Box::new(FfpTransform::default())],
            [0, 0, 0],
        );
        let names: Vec<_> = state.sub_render_states().map(|s| s.type_name().to_owned()).collect();
        assert_eq!(names, ["FFP_Transform", "FFP_Fog"]);
    }

    #[test]
    fn add_replaces_same_type() {
        let mut state = RenderState::new();
        state.add_sub_render_state(Box::new(FfpTransform::default()));
        state.add_sub_render_state(Box::new(FfpTransform::default()));
        assert_eq!(state.len(), 1);
        assert!(state.remove_sub_render_state("FFP_Transform").is_some());
        assert!(state.is_empty());
    }

    #[test]
    fn light_count_is_part_of_content() {
        let a = RenderState::finalized(vec![Box::new(FfpTransform::default())], [1, 0, 0]);
        let b = RenderState::finalized(vec![Box::new(FfpTransform::default())], [2, 0, 0]);
        assert!(!a.content_eq(&b));
        assert!(a.content_eq(&a.clone()));
        assert_eq!(a.content_hash(), a.clone().content_hash());
    }
}
