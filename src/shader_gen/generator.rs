//! Shader Generator
//!
//! Orchestrates the conversion of fixed-function techniques into generated
//! shader-based techniques.
//!
//! # Flow
//!
//! 1. [`ShaderGenerator::create_shader_based_technique`] copies a source
//!    technique into a destination technique under another scheme and creates
//!    the matching entries (`SgMaterial` → `SgTechnique` → `SgPass`).
//! 2. [`ShaderGenerator::validate_scheme`] builds each pass: scheme global
//!    render state + custom state + factory output, deduplicated through the
//!    [`RenderStateCache`], then realized as programs by the
//!    [`ProgramManager`] and attached to the destination pass.
//! 3. While rendering, the per-object listener hands the generated programs
//!    and their parameters to the renderer. It never builds anything; stale
//!    schemes are validated from the per-viewport hook instead.
//!
//! The generator is an explicit context object. Clones share the same state,
//! guarded by a single mutex. Lock order is generator state first, then the
//! material library.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::errors::{Result, ShaderGenError};
use crate::renderer::{DrawOverride, ListenerId, RenderObjectEvent, SceneRenderer};
use crate::resources::{PassHandle, SharedMaterialLibrary, TechniqueHandle};
use crate::scene::Viewport;
use crate::shader_gen::cache::RenderStateCache;
use crate::shader_gen::entries::{BuildEnv, PassKey, SgMaterial, SgPass, SgTechnique, TechniqueKey};
use crate::shader_gen::ffp::builtin_factories;
use crate::shader_gen::program::{ProgramManager, ProgramParameters, TemplateProgramManager};
use crate::shader_gen::render_state::RenderState;
use crate::shader_gen::scheme::SgScheme;
use crate::shader_gen::settings::ShaderGeneratorSettings;
use crate::shader_gen::sub_render_state::{
    FactoryRegistry, ParamContext, SubRenderState, SubRenderStateFactory,
};
use crate::utils::interner;

/// Constructs the program manager on `initialize`.
pub type ProgramManagerFactory = Box<dyn Fn() -> Result<Box<dyn ProgramManager>> + Send>;

/// Mutable access to a scheme's global render state.
///
/// Holds the generator lock: drop it before calling back into the generator.
pub type RenderStateMut<'a> = MappedMutexGuard<'a, RenderState>;

struct AttachedRenderer {
    renderer: Arc<SceneRenderer>,
    listeners: [ListenerId; 2],
}

pub(crate) struct GeneratorState {
    library: SharedMaterialLibrary,
    settings: ShaderGeneratorSettings,
    initialized: bool,
    manager_factory: Option<ProgramManagerFactory>,
    program_manager: Option<Box<dyn ProgramManager>>,
    factories: FactoryRegistry,

    materials: FxHashMap<String, SgMaterial>,
    schemes: FxHashMap<String, SgScheme>,
    techniques: SlotMap<TechniqueKey, SgTechnique>,
    passes: SlotMap<PassKey, SgPass>,
    /// Destination pass → entry, for the per-object lookup.
    pass_index: FxHashMap<PassHandle, PassKey>,
    cache: RenderStateCache,

    renderer: Option<AttachedRenderer>,
    active_scheme: String,
    active_viewport_valid: bool,
}

#[derive(Clone)]
pub struct ShaderGenerator {
    state: Arc<Mutex<GeneratorState>>,
}

impl fmt::Debug for ShaderGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ShaderGenerator")
            .field("initialized", &state.initialized)
            .field("materials", &state.materials.len())
            .field("schemes", &state.schemes.len())
            .field("techniques", &state.techniques.len())
            .field("cached_render_states", &state.cache.len())
            .field("factories", &state.factories)
            .finish_non_exhaustive()
    }
}

impl ShaderGenerator {
    #[must_use]
    pub fn new(library: SharedMaterialLibrary, settings: ShaderGeneratorSettings) -> Self {
        Self {
            state: Arc::new(Mutex::new(GeneratorState {
                library,
                settings,
                initialized: false,
                manager_factory: None,
                program_manager: None,
                factories: FactoryRegistry::new(),
                materials: FxHashMap::default(),
                schemes: FxHashMap::default(),
                techniques: SlotMap::with_key(),
                passes: SlotMap::with_key(),
                pass_index: FxHashMap::default(),
                cache: RenderStateCache::new(),
                renderer: None,
                active_scheme: String::new(),
                active_viewport_valid: false,
            })),
        }
    }

    /// Replaces the default [`TemplateProgramManager`] with a custom one,
    /// constructed on every `initialize`.
    #[must_use]
    pub fn with_program_manager<F>(self, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn ProgramManager>> + Send + 'static,
    {
        self.state.lock().manager_factory = Some(Box::new(factory));
        self
    }

    #[must_use]
    pub fn library(&self) -> SharedMaterialLibrary {
        Arc::clone(&self.state.lock().library)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates the program manager and registers the built-in factories.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.initialized {
            return Err(ShaderGenError::AlreadyInitialized);
        }

        let mut manager = match &state.manager_factory {
            Some(factory) => factory(),
            None => TemplateProgramManager::new().map(|m| Box::new(m) as Box<dyn ProgramManager>),
        }
        .map_err(|e| ShaderGenError::InitializationFailed(e.to_string()))?;
        manager.set_cache_path(state.settings.shader_cache_path.as_deref());

        let mut factories = FactoryRegistry::new();
        for factory in builtin_factories() {
            factories.add(factory)?;
        }

        interner::preload_common_macros();
        state.program_manager = Some(manager);
        state.factories = factories;
        state.initialized = true;
        log::info!(
            "Shader generator initialized (language: {}, {} factories)",
            state.settings.shader_language,
            state.factories.len()
        );
        Ok(())
    }

    /// Releases every entry and detaches from the renderer. No-op when not
    /// initialized.
    pub fn finalize(&self) {
        let mut state = self.state.lock();
        if !state.initialized {
            return;
        }

        let keys: Vec<TechniqueKey> = state.techniques.keys().collect();
        for key in keys {
            state.destroy_technique(key);
        }
        state.materials.clear();
        state.schemes.clear();
        state.pass_index.clear();
        state.cache.clear();
        state.factories.clear();
        state.detach_renderer();
        state.program_manager = None;
        state.active_viewport_valid = false;
        state.initialized = false;
        log::info!("Shader generator finalized");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    // ========================================================================
    // Technique registration
    // ========================================================================

    /// Creates a shader based copy of the `src_scheme` technique of
    /// `material`, listed under `dst_scheme`.
    ///
    /// A source technique maps to at most one destination scheme. Nothing is
    /// built yet; the destination scheme is marked out of date.
    pub fn create_shader_based_technique(
        &self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_initialized()?;

        if let Some(entry) = state.materials.get(material)
            && let Some(existing) = entry
                .techniques()
                .iter()
                .filter_map(|&k| state.techniques.get(k))
                .find(|t| t.src_scheme() == src_scheme)
        {
            return Err(ShaderGenError::AlreadyRegistered {
                material: material.to_owned(),
                src_scheme: src_scheme.to_owned(),
                existing_dst_scheme: existing.dst_scheme().to_owned(),
            });
        }

        let (src, dst, pass_count) = {
            let mut library = state.library.write();
            let material_id = library
                .id_of(material)
                .ok_or_else(|| ShaderGenError::MaterialNotFound(material.to_owned()))?;
            let not_found = || ShaderGenError::TechniqueNotFound {
                material: material.to_owned(),
                scheme: src_scheme.to_owned(),
            };
            let source = library.get(material_id).ok_or_else(not_found)?;
            let src_id = source.find_technique(src_scheme).ok_or_else(not_found)?;
            let mut copy = source.technique(src_id).cloned().ok_or_else(not_found)?;

            copy.set_scheme(dst_scheme);
            for pass in copy.passes_mut() {
                pass.set_programs(None);
            }
            let pass_count = copy.passes().len();
            let dst_id = library
                .get_mut(material_id)
                .map(|m| m.add_technique(copy))
                .ok_or_else(not_found)?;

            (
                TechniqueHandle { material: material_id, technique: src_id },
                TechniqueHandle { material: material_id, technique: dst_id },
                pass_count,
            )
        };

        let key = state
            .techniques
            .insert(SgTechnique::new(material, src_scheme, dst_scheme, src, dst));
        for index in 0..pass_count {
            let dst_pass = PassHandle { technique: dst, index };
            let pass_key = state.passes.insert(SgPass::new(
                key,
                PassHandle { technique: src, index },
                dst_pass,
            ));
            state.pass_index.insert(dst_pass, pass_key);
            state.techniques[key].push_pass(pass_key);
        }

        state
            .materials
            .entry(material.to_owned())
            .or_insert_with(|| SgMaterial::new(material))
            .add_technique(key);
        state
            .schemes
            .entry(dst_scheme.to_owned())
            .or_insert_with(|| SgScheme::new(dst_scheme))
            .add_technique(key);

        log::debug!(
            "Registered shader based technique '{material}' ({src_scheme} -> {dst_scheme}, {pass_count} passes)"
        );
        Ok(())
    }

    /// Removes the technique created by
    /// [`create_shader_based_technique`](Self::create_shader_based_technique)
    /// together with its generated destination technique.
    pub fn remove_shader_based_technique(
        &self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let key = state
            .find_registered(material, src_scheme, dst_scheme)
            .ok_or_else(|| ShaderGenError::NotRegistered {
                material: material.to_owned(),
                src_scheme: src_scheme.to_owned(),
                dst_scheme: dst_scheme.to_owned(),
            })?;
        state.destroy_technique(key);
        log::debug!("Removed shader based technique '{material}' ({src_scheme} -> {dst_scheme})");
        Ok(())
    }

    #[must_use]
    pub fn has_shader_based_technique(
        &self,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> bool {
        self.state
            .lock()
            .find_registered(material, src_scheme, dst_scheme)
            .is_some()
    }

    // ========================================================================
    // Invalidation & validation
    // ========================================================================

    /// Marks the scheme and all of its techniques stale. Unknown schemes are
    /// ignored.
    pub fn invalidate_scheme(&self, name: &str) {
        self.state.lock().invalidate_scheme(name);
    }

    /// Rebuilds the scheme's techniques: all of them when the scheme is out
    /// of date, otherwise the dirty ones.
    ///
    /// A failing technique does not stop the others. The first error is
    /// returned and the scheme stays out of date.
    pub fn validate_scheme(&self, name: &str) -> Result<()> {
        self.state.lock().validate_scheme(name)
    }

    /// Marks one technique of the scheme dirty. Unknown pairs are ignored.
    pub fn invalidate_material(&self, scheme: &str, material: &str) {
        let mut state = self.state.lock();
        if let Some(key) = state.find_in_scheme(scheme, material) {
            state.touch_technique(key);
        }
    }

    /// Rebuilds one technique. Leaves the scheme's own state untouched.
    pub fn validate_material(&self, scheme: &str, material: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_initialized()?;
        let key = state
            .find_in_scheme(scheme, material)
            .ok_or_else(|| GeneratorState::not_registered_in(scheme, material))?;
        state.build_technique(key)
    }

    // ========================================================================
    // Render states
    // ========================================================================

    /// Global render state of `scheme`, creating the scheme if needed.
    ///
    /// Changes take effect after [`invalidate_scheme`](Self::invalidate_scheme).
    pub fn render_state(&self, scheme: &str) -> RenderStateMut<'_> {
        MutexGuard::map(self.state.lock(), |state| {
            state
                .schemes
                .entry(scheme.to_owned())
                .or_insert_with(|| SgScheme::new(scheme))
                .render_state_mut()
        })
    }

    /// Custom render states of every pass of a registered technique. Passes
    /// without one yield an empty state.
    pub fn render_state_list(&self, scheme: &str, material: &str) -> Result<Vec<RenderState>> {
        let state = self.state.lock();
        let key = state
            .find_in_scheme(scheme, material)
            .ok_or_else(|| GeneratorState::not_registered_in(scheme, material))?;
        Ok(state.techniques[key]
            .passes()
            .iter()
            .map(|&p| {
                state.passes[p]
                    .custom_render_state()
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Installs a per-pass render state layered over the scheme's global one.
    pub fn set_custom_render_state(
        &self,
        scheme: &str,
        material: &str,
        pass_index: usize,
        render_state: RenderState,
    ) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let key = state
            .find_in_scheme(scheme, material)
            .ok_or_else(|| GeneratorState::not_registered_in(scheme, material))?;
        let technique = &state.techniques[key];
        let pass_key = *technique.passes().get(pass_index).ok_or_else(|| {
            ShaderGenError::PassIndexOutOfBounds {
                context: format!("material '{material}' in scheme '{scheme}'"),
                index: pass_index,
            }
        })?;
        state.passes[pass_key].set_custom_render_state(Some(render_state));
        state.touch_technique(key);
        Ok(())
    }

    /// Final render state of one generated pass, once built.
    #[must_use]
    pub fn final_render_state(
        &self,
        scheme: &str,
        material: &str,
        pass_index: usize,
    ) -> Option<Arc<RenderState>> {
        let state = self.state.lock();
        let key = state.find_in_scheme(scheme, material)?;
        let pass_key = *state.techniques[key].passes().get(pass_index)?;
        state.passes[pass_key].final_render_state().cloned()
    }

    // ========================================================================
    // Sub render state factories
    // ========================================================================

    pub fn add_sub_render_state_factory(&self, factory: Arc<dyn SubRenderStateFactory>) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_initialized()?;
        state.factories.add(factory)
    }

    /// Instances created earlier stay valid.
    pub fn remove_sub_render_state_factory(&self, type_name: &str) -> bool {
        self.state.lock().factories.remove(type_name)
    }

    #[must_use]
    pub fn has_sub_render_state_factory(&self, type_name: &str) -> bool {
        self.state.lock().factories.contains(type_name)
    }

    pub fn create_sub_render_state(&self, type_name: &str) -> Result<Box<dyn SubRenderState>> {
        let state = self.state.lock();
        state.ensure_initialized()?;
        state.factories.create(type_name)
    }

    pub fn destroy_sub_render_state(&self, sub_state: Box<dyn SubRenderState>) {
        log::trace!("Destroying sub render state '{}'", sub_state.type_name());
        drop(sub_state);
    }

    // ========================================================================
    // Renderer binding
    // ========================================================================

    /// Observes `renderer` instead of the current one.
    pub fn set_scene_renderer(&self, renderer: Option<Arc<SceneRenderer>>) {
        let mut state = self.state.lock();
        state.detach_renderer();
        let Some(renderer) = renderer else {
            return;
        };

        let weak: Weak<Mutex<GeneratorState>> = Arc::downgrade(&self.state);
        let render_object = renderer.add_render_object_listener(move |event| {
            let state = weak.upgrade()?;
            let state = state.lock();
            state.notify_render_single_object(event)
        });

        let weak = Arc::downgrade(&self.state);
        let pre_find = renderer.add_pre_find_visible_listener(move |viewport| {
            if let Some(state) = weak.upgrade() {
                state.lock().pre_find_visible_objects(viewport);
            }
        });

        log::info!("Shader generator attached to scene renderer");
        state.renderer = Some(AttachedRenderer {
            renderer,
            listeners: [render_object, pre_find],
        });
    }

    #[must_use]
    pub fn scene_renderer(&self) -> Option<Arc<SceneRenderer>> {
        self.state
            .lock()
            .renderer
            .as_ref()
            .map(|attached| Arc::clone(&attached.renderer))
    }

    /// Resolves the active scheme for `viewport`, validating it if stale.
    pub fn pre_find_visible_objects(&self, viewport: &Viewport) {
        self.state.lock().pre_find_visible_objects(viewport);
    }

    /// Programs and parameters to draw `event` with, if its pass was generated
    /// for the active scheme.
    #[must_use]
    pub fn notify_render_single_object(&self, event: &RenderObjectEvent<'_>) -> Option<DrawOverride> {
        self.state.lock().notify_render_single_object(event)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> ShaderGeneratorSettings {
        self.state.lock().settings.clone()
    }

    pub fn set_shader_language(&self, language: &str) {
        let mut state = self.state.lock();
        if state.settings.shader_language != language {
            state.settings.shader_language = language.to_owned();
            state.invalidate_all();
        }
    }

    #[must_use]
    pub fn shader_language(&self) -> String {
        self.state.lock().settings.shader_language.clone()
    }

    pub fn set_vertex_shader_profiles(&self, profiles: &str) {
        let mut state = self.state.lock();
        if state.settings.vertex_profiles != profiles {
            state.settings.vertex_profiles = profiles.to_owned();
            state.invalidate_all();
        }
    }

    #[must_use]
    pub fn vertex_shader_profiles(&self) -> String {
        self.state.lock().settings.vertex_profiles.clone()
    }

    pub fn set_fragment_shader_profiles(&self, profiles: &str) {
        let mut state = self.state.lock();
        if state.settings.fragment_profiles != profiles {
            state.settings.fragment_profiles = profiles.to_owned();
            state.invalidate_all();
        }
    }

    #[must_use]
    pub fn fragment_shader_profiles(&self) -> String {
        self.state.lock().settings.fragment_profiles.clone()
    }

    pub fn set_shader_cache_path(&self, path: Option<PathBuf>) {
        let mut state = self.state.lock();
        if let Some(manager) = state.program_manager.as_mut() {
            manager.set_cache_path(path.as_deref());
        }
        state.settings.shader_cache_path = path;
    }

    #[must_use]
    pub fn shader_cache_path(&self) -> Option<PathBuf> {
        self.state.lock().settings.shader_cache_path.clone()
    }

    /// Lights per type handled by generated lighting: `[point, directional, spot]`.
    pub fn set_light_count(&self, light_count: [u32; 3]) {
        let mut state = self.state.lock();
        if state.settings.light_count != light_count {
            state.settings.light_count = light_count;
            state.invalidate_all();
        }
    }

    #[must_use]
    pub fn light_count(&self) -> [u32; 3] {
        self.state.lock().settings.light_count
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// True when the scheme exists and is not out of date.
    #[must_use]
    pub fn is_scheme_valid(&self, name: &str) -> bool {
        self.state
            .lock()
            .schemes
            .get(name)
            .is_some_and(|s| !s.is_out_of_date())
    }

    #[must_use]
    pub fn is_technique_dirty(&self, scheme: &str, material: &str) -> Option<bool> {
        let state = self.state.lock();
        let key = state.find_in_scheme(scheme, material)?;
        Some(state.techniques[key].is_dirty())
    }

    #[must_use]
    pub fn material_count(&self) -> usize {
        self.state.lock().materials.len()
    }

    #[must_use]
    pub fn scheme_count(&self) -> usize {
        self.state.lock().schemes.len()
    }

    #[must_use]
    pub fn technique_count(&self) -> usize {
        self.state.lock().techniques.len()
    }

    #[must_use]
    pub fn cached_render_state_count(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Program objects alive in the program manager.
    #[must_use]
    pub fn program_count(&self) -> usize {
        self.state
            .lock()
            .program_manager
            .as_ref()
            .map_or(0, |m| m.program_count())
    }
}

impl GeneratorState {
    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ShaderGenError::Uninitialized)
        }
    }

    fn find_registered(&self, material: &str, src_scheme: &str, dst_scheme: &str) -> Option<TechniqueKey> {
        self.materials.get(material)?.techniques().iter().copied().find(|&k| {
            self.techniques
                .get(k)
                .is_some_and(|t| t.src_scheme() == src_scheme && t.dst_scheme() == dst_scheme)
        })
    }

    fn find_in_scheme(&self, scheme: &str, material: &str) -> Option<TechniqueKey> {
        self.schemes.get(scheme)?.techniques().iter().copied().find(|&k| {
            self.techniques
                .get(k)
                .is_some_and(|t| t.material() == material)
        })
    }

    fn not_registered_in(scheme: &str, material: &str) -> ShaderGenError {
        ShaderGenError::NotRegistered {
            material: material.to_owned(),
            src_scheme: String::new(),
            dst_scheme: scheme.to_owned(),
        }
    }

    fn invalidate_scheme(&mut self, name: &str) {
        let Some(scheme) = self.schemes.get_mut(name) else {
            return;
        };
        scheme.invalidate();
        for &key in scheme.techniques() {
            if let Some(technique) = self.techniques.get_mut(key) {
                technique.mark_dirty();
            }
        }
    }

    fn invalidate_all(&mut self) {
        let names: Vec<String> = self.schemes.keys().cloned().collect();
        for name in names {
            self.invalidate_scheme(&name);
        }
    }

    fn validate_scheme(&mut self, name: &str) -> Result<()> {
        self.ensure_initialized()?;
        let scheme = self
            .schemes
            .get(name)
            .ok_or_else(|| ShaderGenError::SchemeNotFound(name.to_owned()))?;
        let rebuild_all = scheme.is_out_of_date();
        let keys: Vec<TechniqueKey> = scheme
            .techniques()
            .iter()
            .copied()
            .filter(|&k| rebuild_all || self.techniques.get(k).is_some_and(SgTechnique::is_dirty))
            .collect();

        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.build_technique(key) {
                log::warn!(
                    "Failed to build material '{}' for scheme '{name}', keeping previous state: {e}",
                    self.techniques[key].material()
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => {
                if let Some(scheme) = self.schemes.get_mut(name) {
                    scheme.mark_clean();
                }
                log::debug!("Scheme '{name}' validated");
                Ok(())
            }
            Some(e) => Err(e),
        }
    }

    fn build_technique(&mut self, key: TechniqueKey) -> Result<()> {
        let Self {
            library,
            settings,
            program_manager,
            factories,
            schemes,
            techniques,
            passes,
            cache,
            ..
        } = self;
        let programs = program_manager
            .as_deref_mut()
            .ok_or(ShaderGenError::Uninitialized)?;
        let Some(technique) = techniques.get_mut(key) else {
            return Ok(());
        };

        let empty = RenderState::new();
        let global = schemes
            .get(technique.dst_scheme())
            .map_or(&empty, SgScheme::render_state);
        let program_settings = settings.program_settings();
        let mut material_library = library.write();

        let mut env = BuildEnv {
            library: &mut *material_library,
            global,
            factories,
            cache: &mut *cache,
            programs,
            settings: &program_settings,
            light_count: settings.light_count,
        };
        let result = technique.build_render_state(passes, &mut env);
        if result.is_ok() {
            log::debug!(
                "Built material '{}' for scheme '{}'",
                technique.material(),
                technique.dst_scheme()
            );
        }
        cache.prune();
        result
    }

    fn destroy_technique(&mut self, key: TechniqueKey) {
        let Some(technique) = self.techniques.remove(key) else {
            return;
        };

        {
            let mut library = self.library.write();
            for &pass_key in technique.passes() {
                if let Some(mut pass) = self.passes.remove(pass_key) {
                    self.pass_index.remove(&pass.dst());
                    if let Some(manager) = self.program_manager.as_deref_mut() {
                        pass.release(&mut library, manager);
                    }
                }
            }
            let dst = technique.dst();
            if let Some(material) = library.get_mut(dst.material) {
                material.remove_technique(dst.technique);
            }
        }

        if let Some(scheme) = self.schemes.get_mut(technique.dst_scheme()) {
            scheme.remove_technique(key);
        }
        if let Some(material) = self.materials.get_mut(technique.material()) {
            material.remove_technique(key);
            if material.is_empty() {
                self.materials.remove(technique.material());
            }
        }
        self.cache.prune();
    }

    fn detach_renderer(&mut self) {
        if let Some(attached) = self.renderer.take() {
            for id in attached.listeners {
                attached.renderer.remove_listener(id);
            }
            log::info!("Shader generator detached from scene renderer");
        }
        self.active_viewport_valid = false;
    }

    fn pre_find_visible_objects(&mut self, viewport: &Viewport) {
        let scheme = viewport.material_scheme.as_str();
        if self.active_scheme != scheme {
            self.active_scheme = scheme.to_owned();
        }

        let wants_build = self.schemes.get(scheme).map(SgScheme::wants_lazy_build);
        self.active_viewport_valid = self.initialized && wants_build.is_some();
        if self.active_viewport_valid
            && wants_build == Some(true)
            && let Err(e) = self.validate_scheme(scheme)
        {
            // Passes that did build are still used.
            log::warn!(
                "Scheme '{scheme}' only partially generated, not retrying until it changes: {e}"
            );
            if let Some(entry) = self.schemes.get_mut(scheme) {
                entry.suspend_lazy_builds();
            }
        }
    }

    /// Marks a technique dirty and lets its scheme try a lazy build again.
    fn touch_technique(&mut self, key: TechniqueKey) {
        let Some(technique) = self.techniques.get_mut(key) else {
            return;
        };
        technique.mark_dirty();
        if let Some(scheme) = self.schemes.get_mut(technique.dst_scheme()) {
            scheme.resume_lazy_builds();
        }
    }

    fn notify_render_single_object(&self, event: &RenderObjectEvent<'_>) -> Option<DrawOverride> {
        if !self.active_viewport_valid {
            return None;
        }
        let &key = self.pass_index.get(&event.pass_handle)?;
        let pass = self.passes.get(key)?;
        if self.techniques.get(pass.technique())?.dst_scheme() != self.active_scheme {
            return None;
        }
        let render_state = pass.final_render_state()?;
        let programs = pass.programs()?;

        log::trace!("Supplying generated programs for '{}'", event.renderable.name);
        let mut params = ProgramParameters::new();
        if !event.suppress_render_state_changes {
            let ctx = ParamContext {
                renderable: event.renderable,
                pass: event.pass,
                lights: event.lights,
            };
            render_state.update_params(&ctx, &mut params);
        }
        Some(DrawOverride {
            programs: Arc::clone(programs),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FixedFunctionState, Material, MaterialLibrary, Pass, Technique};

    fn generator_with_wall() -> ShaderGenerator {
        let mut library = MaterialLibrary::new();
        let mut wall = Material::new("Wall");
        wall.add_technique(
            Technique::new("Default").with_pass(Pass::new("base", FixedFunctionState::default())),
        );
        library.add(wall);
        ShaderGenerator::new(library.into_shared(), ShaderGeneratorSettings::default())
    }

    #[test]
    fn operations_require_initialize() {
        let generator = generator_with_wall();
        let err = generator
            .create_shader_based_technique("Wall", "Default", "Shaders")
            .unwrap_err();
        assert!(matches!(err, ShaderGenError::Uninitialized));
        assert!(matches!(
            generator.create_sub_render_state("FFP_Transform"),
            Err(ShaderGenError::Uninitialized)
        ));
    }

    #[test]
    fn initialize_twice_fails() {
        let generator = generator_with_wall();
        generator.initialize().unwrap();
        assert!(matches!(
            generator.initialize(),
            Err(ShaderGenError::AlreadyInitialized)
        ));
    }

    #[test]
    fn failing_program_manager_aborts_initialize() {
        let generator = generator_with_wall()
            .with_program_manager(|| Err(ShaderGenError::UnsupportedLanguage("none".into())));
        assert!(matches!(
            generator.initialize(),
            Err(ShaderGenError::InitializationFailed(_))
        ));
        assert!(!generator.is_initialized());
    }

    #[test]
    fn render_state_creates_scheme() {
        let generator = generator_with_wall();
        assert_eq!(generator.scheme_count(), 0);
        assert!(generator.render_state("Shaders").is_empty());
        assert_eq!(generator.scheme_count(), 1);
        assert!(!generator.is_scheme_valid("Shaders"));
    }
}
