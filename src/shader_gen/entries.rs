//! Generator Entries
//!
//! Bookkeeping that pairs each source technique/pass with the destination
//! technique/pass generated for it. Entries live in arenas owned by the
//! generator; materials and schemes refer to techniques by key, techniques
//! refer to their passes by key.
//!
//! ```text
//! SgMaterial ──owns──▶ SgTechnique ──owns──▶ SgPass
//!                          ▲
//! SgScheme ───lists────────┘
//! ```

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

use crate::errors::{Result, ShaderGenError};
use crate::resources::{MaterialLibrary, PassHandle, TechniqueHandle};
use crate::shader_gen::cache::RenderStateCache;
use crate::shader_gen::program::{GpuProgramSet, ProgramManager, ProgramSettings};
use crate::shader_gen::render_state::RenderState;
use crate::shader_gen::sub_render_state::{BuildContext, FactoryRegistry, SubRenderState};

new_key_type! {
    pub struct TechniqueKey;
    pub struct PassKey;
}

/// Everything a build reads or writes besides the entries themselves.
pub(crate) struct BuildEnv<'a> {
    pub library: &'a mut MaterialLibrary,
    /// Global render state of the technique's destination scheme.
    pub global: &'a RenderState,
    pub factories: &'a FactoryRegistry,
    pub cache: &'a mut RenderStateCache,
    pub programs: &'a mut dyn ProgramManager,
    pub settings: &'a ProgramSettings,
    pub light_count: [u32; 3],
}

// ============================================================================
// Pass entry
// ============================================================================

#[derive(Debug)]
pub struct SgPass {
    technique: TechniqueKey,
    src: PassHandle,
    dst: PassHandle,
    custom: Option<RenderState>,
    final_state: Option<Arc<RenderState>>,
    programs: Option<Arc<GpuProgramSet>>,
    /// State and settings `programs` were acquired for.
    acquired_for: Option<(Arc<RenderState>, ProgramSettings)>,
}

impl SgPass {
    pub(crate) fn new(technique: TechniqueKey, src: PassHandle, dst: PassHandle) -> Self {
        Self {
            technique,
            src,
            dst,
            custom: None,
            final_state: None,
            programs: None,
            acquired_for: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn technique(&self) -> TechniqueKey {
        self.technique
    }

    #[inline]
    #[must_use]
    pub fn src(&self) -> PassHandle {
        self.src
    }

    #[inline]
    #[must_use]
    pub fn dst(&self) -> PassHandle {
        self.dst
    }

    #[must_use]
    pub fn custom_render_state(&self) -> Option<&RenderState> {
        self.custom.as_ref()
    }

    pub fn set_custom_render_state(&mut self, state: Option<RenderState>) {
        self.custom = state;
    }

    /// Merged result of the last successful build.
    #[must_use]
    pub fn final_render_state(&self) -> Option<&Arc<RenderState>> {
        self.final_state.as_ref()
    }

    #[must_use]
    pub fn programs(&self) -> Option<&Arc<GpuProgramSet>> {
        self.programs.as_ref()
    }

    /// Rebuilds the final state and the programs realizing it.
    ///
    /// Both are committed together: on error the pass keeps its previous
    /// state and programs untouched.
    pub(crate) fn build_render_state(&mut self, env: &mut BuildEnv<'_>) -> Result<()> {
        let state = self.merge_render_state(env)?;
        self.acquire_gpu_programs(state, env)?;
        Ok(())
    }

    /// Merges the scheme global state, the custom state and the factory output
    /// for this pass into a shared final state.
    ///
    /// On a later layer occupying the same execution order as an earlier one,
    /// the later layer wins; factory output only fills free slots.
    fn merge_render_state(&self, env: &mut BuildEnv<'_>) -> Result<Arc<RenderState>> {
        let library = &*env.library;
        let (Some(src_pass), Some(dst_pass)) = (library.pass(self.src), library.pass(self.dst))
        else {
            return Err(ShaderGenError::build_failure(
                "pass",
                "source or destination pass no longer exists in the material library",
            ));
        };
        let ctx = BuildContext {
            src_pass,
            dst_pass,
            light_count: env.light_count,
        };

        let mut slots: Vec<Box<dyn SubRenderState>> = Vec::new();
        for layer in [Some(env.global), self.custom.as_ref()].into_iter().flatten() {
            for sub_state in layer.sub_render_states() {
                let mut instance = sub_state.duplicate();
                if !instance.prepare(&ctx)? {
                    continue;
                }
                let order = instance.execution_order();
                match slots.iter_mut().find(|s| s.execution_order() == order) {
                    Some(slot) => *slot = instance,
                    None => slots.push(instance),
                }
            }
        }

        for factory in env.factories.iter() {
            let order = factory.create_instance().execution_order();
            if slots.iter().any(|s| s.execution_order() == order) {
                continue;
            }
            if let Some(instance) = factory.create_for_pass(&ctx)? {
                slots.push(instance);
            }
        }

        let state = RenderState::finalized(slots, env.light_count);
        let hash = state.content_hash();
        Ok(env.cache.insert_hashed(hash, state))
    }

    /// Realizes `state` as programs, attaches them to the destination pass
    /// and makes `state` the final state. Returns `false` when the current
    /// programs already match.
    fn acquire_gpu_programs(
        &mut self,
        state: Arc<RenderState>,
        env: &mut BuildEnv<'_>,
    ) -> Result<bool> {
        if self.programs.is_some()
            && let Some((acquired_state, acquired_settings)) = &self.acquired_for
            && Arc::ptr_eq(acquired_state, &state)
            && acquired_settings == env.settings
        {
            self.final_state = Some(state);
            return Ok(false);
        }

        let programs = env.programs.acquire(&state, env.settings)?;
        if let Some(pass) = env.library.pass_mut(self.dst) {
            pass.set_programs(Some(Arc::clone(&programs)));
        }
        if let Some(old) = self.programs.replace(programs) {
            env.programs.release(old);
        }
        self.acquired_for = Some((Arc::clone(&state), env.settings.clone()));
        self.final_state = Some(state);
        Ok(true)
    }

    /// Detaches programs from the destination pass and drops the built state.
    pub(crate) fn release(&mut self, library: &mut MaterialLibrary, programs: &mut dyn ProgramManager) {
        if let Some(pass) = library.pass_mut(self.dst) {
            pass.set_programs(None);
        }
        if let Some(set) = self.programs.take() {
            programs.release(set);
        }
        self.acquired_for = None;
        self.final_state = None;
    }
}

// ============================================================================
// Technique entry
// ============================================================================

#[derive(Debug)]
pub struct SgTechnique {
    material: String,
    src_scheme: String,
    dst_scheme: String,
    src: TechniqueHandle,
    dst: TechniqueHandle,
    passes: Vec<PassKey>,
    /// Destination technique needs rebuilding.
    dirty: bool,
}

impl SgTechnique {
    pub(crate) fn new(
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
        src: TechniqueHandle,
        dst: TechniqueHandle,
    ) -> Self {
        Self {
            material: material.to_owned(),
            src_scheme: src_scheme.to_owned(),
            dst_scheme: dst_scheme.to_owned(),
            src,
            dst,
            passes: Vec::new(),
            dirty: true,
        }
    }

    #[must_use]
    pub fn material(&self) -> &str {
        &self.material
    }

    #[must_use]
    pub fn src_scheme(&self) -> &str {
        &self.src_scheme
    }

    #[must_use]
    pub fn dst_scheme(&self) -> &str {
        &self.dst_scheme
    }

    #[inline]
    #[must_use]
    pub fn src(&self) -> TechniqueHandle {
        self.src
    }

    #[inline]
    #[must_use]
    pub fn dst(&self) -> TechniqueHandle {
        self.dst
    }

    /// Pass entries in source pass order.
    #[must_use]
    pub fn passes(&self) -> &[PassKey] {
        &self.passes
    }

    pub(crate) fn push_pass(&mut self, pass: PassKey) {
        self.passes.push(pass);
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Builds every pass in order, stopping at the first failure. Each pass
    /// updates as a unit: passes before the failing one are fully rebuilt,
    /// the failing one and those after it are left as they were.
    pub(crate) fn build_render_state(
        &mut self,
        passes: &mut SlotMap<PassKey, SgPass>,
        env: &mut BuildEnv<'_>,
    ) -> Result<()> {
        for &key in &self.passes {
            if let Some(pass) = passes.get_mut(key) {
                pass.build_render_state(env)?;
            }
        }
        self.dirty = false;
        Ok(())
    }
}

// ============================================================================
// Material entry
// ============================================================================

#[derive(Debug)]
pub struct SgMaterial {
    name: String,
    techniques: Vec<TechniqueKey>,
}

impl SgMaterial {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            techniques: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn techniques(&self) -> &[TechniqueKey] {
        &self.techniques
    }

    pub(crate) fn add_technique(&mut self, key: TechniqueKey) {
        self.techniques.push(key);
    }

    pub(crate) fn remove_technique(&mut self, key: TechniqueKey) {
        self.techniques.retain(|&k| k != key);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}
