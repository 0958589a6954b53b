//! Sub Render States
//!
//! A sub render state is one pluggable unit of shader generation (transform,
//! lighting model, texturing, ...). Instances are created through factories
//! registered by type name. During a build every contributing instance is
//! `prepare`d against the source pass and then describes itself as shader
//! defines, which drive both template expansion and render-state identity.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{Result, ShaderGenError};
use crate::resources::{Pass, ShaderDefines};
use crate::scene::{Light, Renderable};
use crate::shader_gen::program::ProgramParameters;

/// Inputs available while building the render state of one pass.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub src_pass: &'a Pass,
    pub dst_pass: &'a Pass,
    /// Lights per type: `[point, directional, spot]`.
    pub light_count: [u32; 3],
}

/// Inputs available when filling program constants for one draw.
#[derive(Debug, Clone, Copy)]
pub struct ParamContext<'a> {
    pub renderable: &'a Renderable,
    pub pass: &'a Pass,
    pub lights: &'a [Light],
}

pub trait SubRenderState: fmt::Debug + Send + Sync {
    /// Factory type name this instance belongs to.
    fn type_name(&self) -> &str;

    /// Position in the generated program; lower runs first. Two states with
    /// the same order occupy the same slot and cannot coexist in one build.
    fn execution_order(&self) -> i32;

    /// Copies this instance, including its configuration.
    fn duplicate(&self) -> Box<dyn SubRenderState>;

    /// Configures the instance from the pass being generated.
    ///
    /// `Ok(false)` means the state has nothing to contribute to this pass and
    /// is left out. Errors abort the build of the pass.
    fn prepare(&mut self, ctx: &BuildContext<'_>) -> Result<bool>;

    /// Describes the configured contribution as shader defines.
    fn write_defines(&self, defines: &mut ShaderDefines);

    /// Fills per-draw program constants.
    fn update_params(&self, _ctx: &ParamContext<'_>, _params: &mut ProgramParameters) {}
}

pub trait SubRenderStateFactory: Send + Sync {
    fn type_name(&self) -> &str;

    fn create_instance(&self) -> Box<dyn SubRenderState>;

    /// Contribution of this factory to the automatic conversion of a
    /// fixed-function pass. Factories whose states are only used on request
    /// keep the default and contribute nothing.
    fn create_for_pass(
        &self,
        _ctx: &BuildContext<'_>,
    ) -> Result<Option<Box<dyn SubRenderState>>> {
        Ok(None)
    }
}

/// Creates an instance and keeps it only if it applies to the pass.
pub(crate) fn prepared_instance(
    factory: &dyn SubRenderStateFactory,
    ctx: &BuildContext<'_>,
) -> Result<Option<Box<dyn SubRenderState>>> {
    let mut instance = factory.create_instance();
    Ok(instance.prepare(ctx)?.then_some(instance))
}

/// Factory lookup keyed by type name, iterated in registration order.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: FxHashMap<String, Arc<dyn SubRenderStateFactory>>,
    order: Vec<String>,
}

impl FactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory`; a second factory under the same name is rejected.
    pub fn add(&mut self, factory: Arc<dyn SubRenderStateFactory>) -> Result<()> {
        let name = factory.type_name().to_owned();
        if self.factories.contains_key(&name) {
            return Err(ShaderGenError::FactoryAlreadyRegistered(name));
        }
        self.order.push(name.clone());
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn remove(&mut self, type_name: &str) -> bool {
        if self.factories.remove(type_name).is_some() {
            self.order.retain(|n| n != type_name);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn create(&self, type_name: &str) -> Result<Box<dyn SubRenderState>> {
        self.factories
            .get(type_name)
            .map(|f| f.create_instance())
            .ok_or_else(|| ShaderGenError::UnknownSubRenderStateType(type_name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SubRenderStateFactory>> {
        self.order.iter().map(|n| &self.factories[n])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.factories.clear();
        self.order.clear();
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.order).finish()
    }
}
