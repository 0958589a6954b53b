//! Scene Renderer
//!
//! The traversal side the shader generator plugs into. Observers register
//! plain closures:
//!
//! - pre-find-visible listeners run once per viewport per frame, before
//!   culling, and receive the viewport being rendered;
//! - render-object listeners run once per drawable per pass and may override
//!   the pass with generated programs.
//!
//! The material library lock is never held while listeners run.

use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{Result, ShaderGenError};
use crate::resources::{
    DEFAULT_MATERIAL_SCHEME, Pass, PassHandle, SharedMaterialLibrary, TechniqueHandle,
};
use crate::scene::{Light, Renderable, Viewport};
use crate::shader_gen::program::{GpuProgramSet, ProgramParameters};

new_key_type! {
    /// Handle returned when registering a listener.
    pub struct ListenerId;
}

/// One drawable about to be rendered with one pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderObjectEvent<'a> {
    pub renderable: &'a Renderable,
    pub pass_handle: PassHandle,
    pub pass: &'a Pass,
    pub lights: &'a [Light],
    /// The renderer keeps the currently bound state; parameters need not be
    /// refreshed.
    pub suppress_render_state_changes: bool,
}

/// Programs and constants a listener wants the draw to use.
#[derive(Debug, Clone)]
pub struct DrawOverride {
    pub programs: Arc<GpuProgramSet>,
    pub params: ProgramParameters,
}

/// How a drawable ended up being drawn.
#[derive(Debug, Clone)]
pub enum DrawBinding {
    /// The pass as stored in the material library.
    FixedFunction { pass: PassHandle },
    /// Programs supplied by a render-object listener.
    Generated {
        pass: PassHandle,
        programs: Arc<GpuProgramSet>,
        params: ProgramParameters,
    },
}

impl DrawBinding {
    #[must_use]
    pub fn pass(&self) -> PassHandle {
        match self {
            Self::FixedFunction { pass } | Self::Generated { pass, .. } => *pass,
        }
    }

    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated { .. })
    }
}

pub type RenderObjectCallback =
    Arc<dyn Fn(&RenderObjectEvent<'_>) -> Option<DrawOverride> + Send + Sync>;
pub type PreFindVisibleCallback = Arc<dyn Fn(&Viewport) + Send + Sync>;

#[derive(Clone)]
enum Listener {
    RenderObject(RenderObjectCallback),
    PreFindVisible(PreFindVisibleCallback),
}

pub struct SceneRenderer {
    library: SharedMaterialLibrary,
    listeners: RwLock<SlotMap<ListenerId, Listener>>,
    active_viewport: RwLock<Option<Viewport>>,
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("listeners", &self.listeners.read().len())
            .field("active_viewport", &*self.active_viewport.read())
            .finish_non_exhaustive()
    }
}

impl SceneRenderer {
    #[must_use]
    pub fn new(library: SharedMaterialLibrary) -> Self {
        Self {
            library,
            listeners: RwLock::new(SlotMap::with_key()),
            active_viewport: RwLock::new(None),
        }
    }

    pub fn add_render_object_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&RenderObjectEvent<'_>) -> Option<DrawOverride> + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .insert(Listener::RenderObject(Arc::new(callback)))
    }

    pub fn add_pre_find_visible_listener<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Viewport) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .insert(Listener::PreFindVisible(Arc::new(callback)))
    }

    /// Returns whether the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(id).is_some()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    #[must_use]
    pub fn active_viewport(&self) -> Option<Viewport> {
        self.active_viewport.read().clone()
    }

    /// Starts rendering `viewport`: makes it active and notifies the
    /// pre-find-visible listeners.
    pub fn find_visible_objects(&self, viewport: &Viewport) {
        *self.active_viewport.write() = Some(viewport.clone());

        let callbacks: Vec<PreFindVisibleCallback> = self
            .listeners
            .read()
            .values()
            .filter_map(|l| match l {
                Listener::PreFindVisible(cb) => Some(Arc::clone(cb)),
                Listener::RenderObject(_) => None,
            })
            .collect();
        for callback in callbacks {
            callback(viewport);
        }
    }

    /// Resolves pass `pass_index` of the technique `renderable`'s material
    /// uses under the active viewport's scheme, then lets the render-object
    /// listeners override it. The first override wins.
    pub fn render_single_object(
        &self,
        renderable: &Renderable,
        pass_index: usize,
        lights: &[Light],
        suppress_render_state_changes: bool,
    ) -> Result<DrawBinding> {
        let scheme = self
            .active_viewport
            .read()
            .as_ref()
            .map_or_else(|| DEFAULT_MATERIAL_SCHEME.to_owned(), |v| v.material_scheme.clone());

        let (pass_handle, pass) = {
            let library = self.library.read();
            let material_id = library
                .id_of(&renderable.material)
                .ok_or_else(|| ShaderGenError::MaterialNotFound(renderable.material.clone()))?;
            let technique = library
                .get(material_id)
                .and_then(|m| m.best_technique(&scheme))
                .ok_or_else(|| ShaderGenError::TechniqueNotFound {
                    material: renderable.material.clone(),
                    scheme: scheme.clone(),
                })?;
            let handle = PassHandle {
                technique: TechniqueHandle {
                    material: material_id,
                    technique,
                },
                index: pass_index,
            };
            let pass = library
                .pass(handle)
                .cloned()
                .ok_or_else(|| ShaderGenError::PassIndexOutOfBounds {
                    context: format!("material '{}'", renderable.material),
                    index: pass_index,
                })?;
            (handle, pass)
        };

        let event = RenderObjectEvent {
            renderable,
            pass_handle,
            pass: &pass,
            lights,
            suppress_render_state_changes,
        };
        for callback in self.render_object_callbacks() {
            if let Some(draw) = callback(&event) {
                return Ok(DrawBinding::Generated {
                    pass: pass_handle,
                    programs: draw.programs,
                    params: draw.params,
                });
            }
        }
        Ok(DrawBinding::FixedFunction { pass: pass_handle })
    }

    fn render_object_callbacks(&self) -> Vec<RenderObjectCallback> {
        self.listeners
            .read()
            .values()
            .filter_map(|l| match l {
                Listener::RenderObject(cb) => Some(Arc::clone(cb)),
                Listener::PreFindVisible(_) => None,
            })
            .collect()
    }
}
