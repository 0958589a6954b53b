//! Material System
//!
//! Materials own an ordered list of techniques; each technique belongs to a
//! material scheme and owns its passes. The shader generator only reads source
//! techniques, and creates/removes the destination techniques it generates.
//!
//! Techniques live in a per-material `SlotMap` so handles stay valid while
//! other techniques are added or removed.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::resources::fixed_function::FixedFunctionState;
use crate::shader_gen::program::GpuProgramSet;

/// Scheme used by techniques that were not assigned one explicitly.
pub const DEFAULT_MATERIAL_SCHEME: &str = "Default";

new_key_type! {
    pub struct MaterialId;
    pub struct TechniqueId;
}

/// Addresses one technique of one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TechniqueHandle {
    pub material: MaterialId,
    pub technique: TechniqueId,
}

/// Addresses one pass of one technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle {
    pub technique: TechniqueHandle,
    pub index: usize,
}

/// One draw submission of a technique.
#[derive(Debug, Clone, Default)]
pub struct Pass {
    pub name: String,
    pub fixed_function: FixedFunctionState,
    programs: Option<Arc<GpuProgramSet>>,
}

impl Pass {
    #[must_use]
    pub fn new(name: impl Into<String>, fixed_function: FixedFunctionState) -> Self {
        Self {
            name: name.into(),
            fixed_function,
            programs: None,
        }
    }

    /// True once generated programs are attached.
    #[inline]
    #[must_use]
    pub fn is_programmable(&self) -> bool {
        self.programs.is_some()
    }

    #[must_use]
    pub fn programs(&self) -> Option<&Arc<GpuProgramSet>> {
        self.programs.as_ref()
    }

    pub fn set_programs(&mut self, programs: Option<Arc<GpuProgramSet>>) {
        self.programs = programs;
    }
}

#[derive(Debug, Clone)]
pub struct Technique {
    pub name: String,
    scheme: String,
    passes: Vec<Pass>,
}

impl Technique {
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            scheme: scheme.into(),
            passes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn set_scheme(&mut self, scheme: impl Into<String>) {
        self.scheme = scheme.into();
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [Pass] {
        &mut self.passes
    }

    pub fn add_pass(&mut self, pass: Pass) -> usize {
        self.passes.push(pass);
        self.passes.len() - 1
    }

    /// A technique is "fixed-function pure" when none of its passes already
    /// carries programs.
    #[must_use]
    pub fn is_fixed_function(&self) -> bool {
        self.passes.iter().all(|p| !p.is_programmable())
    }
}

#[derive(Debug)]
pub struct Material {
    name: String,
    techniques: SlotMap<TechniqueId, Technique>,
    order: Vec<TechniqueId>,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            techniques: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_technique(&mut self, technique: Technique) -> TechniqueId {
        let id = self.techniques.insert(technique);
        self.order.push(id);
        id
    }

    pub fn remove_technique(&mut self, id: TechniqueId) -> Option<Technique> {
        self.order.retain(|&t| t != id);
        self.techniques.remove(id)
    }

    #[must_use]
    pub fn technique(&self, id: TechniqueId) -> Option<&Technique> {
        self.techniques.get(id)
    }

    pub fn technique_mut(&mut self, id: TechniqueId) -> Option<&mut Technique> {
        self.techniques.get_mut(id)
    }

    /// Techniques in insertion order.
    pub fn techniques(&self) -> impl Iterator<Item = (TechniqueId, &Technique)> {
        self.order.iter().map(|&id| (id, &self.techniques[id]))
    }

    #[must_use]
    pub fn technique_count(&self) -> usize {
        self.order.len()
    }

    /// First technique whose scheme is exactly `scheme`.
    #[must_use]
    pub fn find_technique(&self, scheme: &str) -> Option<TechniqueId> {
        self.techniques()
            .find(|(_, t)| t.scheme() == scheme)
            .map(|(id, _)| id)
    }

    /// Technique the renderer should use for `scheme`: an exact match, else
    /// the default-scheme technique, else the first one.
    #[must_use]
    pub fn best_technique(&self, scheme: &str) -> Option<TechniqueId> {
        self.find_technique(scheme)
            .or_else(|| self.find_technique(DEFAULT_MATERIAL_SCHEME))
            .or_else(|| self.order.first().copied())
    }
}

/// Name-addressable store of all materials.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: SlotMap<MaterialId, Material>,
    by_name: FxHashMap<String, MaterialId>,
}

/// Library handle shared between the content side and the shader generator.
pub type SharedMaterialLibrary = Arc<RwLock<MaterialLibrary>>;

impl MaterialLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_shared(self) -> SharedMaterialLibrary {
        Arc::new(RwLock::new(self))
    }

    /// Adds a material. A material with the same name is replaced.
    pub fn add(&mut self, material: Material) -> MaterialId {
        if let Some(old) = self.by_name.remove(material.name()) {
            log::warn!("Material '{}' replaced in library", material.name());
            self.materials.remove(old);
        }
        let name = material.name.clone();
        let id = self.materials.insert(material);
        self.by_name.insert(name, id);
        id
    }

    pub fn remove(&mut self, name: &str) -> Option<Material> {
        let id = self.by_name.remove(name)?;
        self.materials.remove(id)
    }

    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Material> {
        self.id_of(name).and_then(|id| self.materials.get(id))
    }

    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Material> {
        let id = self.id_of(name)?;
        self.materials.get_mut(id)
    }

    #[must_use]
    pub fn technique(&self, handle: TechniqueHandle) -> Option<&Technique> {
        self.materials.get(handle.material)?.technique(handle.technique)
    }

    pub fn technique_mut(&mut self, handle: TechniqueHandle) -> Option<&mut Technique> {
        self.materials
            .get_mut(handle.material)?
            .technique_mut(handle.technique)
    }

    #[must_use]
    pub fn pass(&self, handle: PassHandle) -> Option<&Pass> {
        self.technique(handle.technique)?.passes().get(handle.index)
    }

    pub fn pass_mut(&mut self, handle: PassHandle) -> Option<&mut Pass> {
        self.technique_mut(handle.technique)?
            .passes_mut()
            .get_mut(handle.index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Material {
        let mut material = Material::new("Wall");
        material.add_technique(
            Technique::new(DEFAULT_MATERIAL_SCHEME)
                .with_pass(Pass::new("base", FixedFunctionState::default())),
        );
        material
    }

    #[test]
    fn best_technique_falls_back_to_default_scheme() {
        let mut material = wall();
        let default_id = material.find_technique(DEFAULT_MATERIAL_SCHEME).unwrap();
        assert_eq!(material.best_technique("Shaders"), Some(default_id));

        let shader_id = material.add_technique(Technique::new("Shaders"));
        assert_eq!(material.best_technique("Shaders"), Some(shader_id));
    }

    #[test]
    fn remove_technique_keeps_other_handles_valid() {
        let mut material = wall();
        let a = material.add_technique(Technique::new("A"));
        let b = material.add_technique(Technique::new("B"));

        assert!(material.remove_technique(a).is_some());
        assert_eq!(material.technique(b).map(Technique::scheme), Some("B"));
        assert_eq!(material.technique_count(), 2);
    }

    #[test]
    fn library_replaces_by_name() {
        let mut library = MaterialLibrary::new();
        let first = library.add(wall());
        let second = library.add(wall());

        assert_ne!(first, second);
        assert!(library.get(first).is_none());
        assert_eq!(library.len(), 1);
        assert_eq!(library.id_of("Wall"), Some(second));
    }
}
