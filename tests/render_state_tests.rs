//! Render State Tests
//!
//! Tests for:
//! - Building user render states from sub render states
//! - Content equality and hashing
//! - Cache sharing and hash collision handling

use std::sync::Arc;

use myth_shadergen::errors::Result;
use myth_shadergen::resources::ShaderDefines;
use myth_shadergen::shader_gen::{
    BuildContext, RenderState, RenderStateCache, SubRenderState,
};

#[derive(Debug, Clone)]
struct Tint {
    strength: u32,
}

impl SubRenderState for Tint {
    fn type_name(&self) -> &str {
        "Tint"
    }

    fn execution_order(&self) -> i32 {
        250
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn prepare(&mut self, _ctx: &BuildContext<'_>) -> Result<bool> {
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.set_value("TINT_STRENGTH", self.strength);
    }
}

#[derive(Debug, Clone)]
struct Grain;

impl SubRenderState for Grain {
    fn type_name(&self) -> &str {
        "Grain"
    }

    fn execution_order(&self) -> i32 {
        700
    }

    fn duplicate(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn prepare(&mut self, _ctx: &BuildContext<'_>) -> Result<bool> {
        Ok(true)
    }

    fn write_defines(&self, defines: &mut ShaderDefines) {
        defines.enable("FILM_GRAIN");
    }
}

fn tinted(strength: u32) -> RenderState {
    let mut state = RenderState::new();
    state.add_sub_render_state(Box::new(Tint { strength }));
    state
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn adding_same_type_replaces_in_place() {
    let mut state = tinted(1);
    state.add_sub_render_state(Box::new(Grain));
    state.add_sub_render_state(Box::new(Tint { strength: 5 }));

    let names: Vec<_> = state.sub_render_states().map(|s| s.type_name().to_owned()).collect();
    assert_eq!(names, ["Tint", "Grain"]);
    assert_eq!(
        state.shader_defines().get("TINT_STRENGTH").as_deref(),
        Some("5")
    );
}

#[test]
fn remove_and_clear() {
    let mut state = tinted(1);
    state.add_sub_render_state(Box::new(Grain));

    assert!(state.remove_sub_render_state("Missing").is_none());
    let removed = state.remove_sub_render_state("Grain").unwrap();
    assert_eq!(removed.type_name(), "Grain");
    assert!(state.sub_render_state("Grain").is_none());

    state.clear();
    assert!(state.is_empty());
}

#[test]
fn clone_duplicates_configuration() {
    let original = tinted(3);
    let copy = original.clone();
    assert!(copy.content_eq(&original));
    assert_eq!(copy.len(), 1);
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn configuration_is_part_of_identity() {
    let a = tinted(1);
    let b = tinted(2);
    assert!(!a.content_eq(&b));
    assert!(a.content_eq(&tinted(1)));
    assert_eq!(a.content_hash(), tinted(1).content_hash());
}

#[test]
fn order_of_sub_states_matters() {
    let mut a = tinted(1);
    a.add_sub_render_state(Box::new(Grain));

    let mut b = RenderState::new();
    b.add_sub_render_state(Box::new(Grain));
    b.add_sub_render_state(Box::new(Tint { strength: 1 }));

    assert!(!a.content_eq(&b));
}

#[test]
fn light_count_is_part_of_identity() {
    let a = tinted(1);
    let mut b = tinted(1);
    b.set_light_count([1, 0, 0]);
    assert!(!a.content_eq(&b));
    assert_eq!(b.light_count(), [1, 0, 0]);
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn cache_shares_equal_states() {
    let mut cache = RenderStateCache::new();
    let a = cache.add(tinted(1));
    let b = cache.add(tinted(1));
    let c = cache.add(tinted(2));

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(cache.len(), 2);
}

#[test]
fn forced_collision_keeps_distinct_states() {
    let mut cache = RenderStateCache::new();
    let a = cache.insert_hashed(42, tinted(1));
    let b = cache.insert_hashed(42, tinted(2));
    let again = cache.insert_hashed(42, tinted(2));

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &again));
    assert_eq!(cache.len(), 2);
    assert!(cache.get(42, &tinted(3)).is_none());
}

#[test]
fn prune_drops_unreferenced_states() {
    let mut cache = RenderStateCache::new();
    let kept = cache.add(tinted(1));
    let dropped = cache.add(tinted(2));
    drop(dropped);

    assert_eq!(cache.prune(), 1);
    assert_eq!(cache.len(), 1);
    drop(kept);
    assert_eq!(cache.prune(), 1);
    assert!(cache.is_empty());
}
