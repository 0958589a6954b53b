//! Render State Cache
//!
//! Deduplicates final render states across every scheme and material. Passes
//! whose generation recipe is identical end up holding the same
//! `Arc<RenderState>`, so the program manager is asked for one program
//! permutation instead of many.
//!
//! Entries are bucketed by their 32-bit content hash; lookups compare content
//! inside the bucket so colliding states never alias each other.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::shader_gen::render_state::RenderState;

#[derive(Debug, Default)]
pub struct RenderStateCache {
    buckets: FxHashMap<u32, Vec<Arc<RenderState>>>,
}

impl RenderStateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached instance content-equal to `state`, if any.
    #[must_use]
    pub fn get(&self, hash: u32, state: &RenderState) -> Option<Arc<RenderState>> {
        self.buckets
            .get(&hash)?
            .iter()
            .find(|cached| cached.content_eq(state))
            .cloned()
    }

    /// Returns the shared instance for `state`, inserting it on a miss.
    pub fn add(&mut self, state: RenderState) -> Arc<RenderState> {
        let hash = state.content_hash();
        self.insert_hashed(hash, state)
    }

    /// Same as [`add`](Self::add) with a precomputed hash.
    pub fn insert_hashed(&mut self, hash: u32, state: RenderState) -> Arc<RenderState> {
        let bucket = self.buckets.entry(hash).or_default();
        if let Some(cached) = bucket.iter().find(|cached| cached.content_eq(&state)) {
            log::debug!("Render state cache hit (hash {hash:#010x})");
            return Arc::clone(cached);
        }
        if !bucket.is_empty() {
            log::debug!("Render state hash collision on {hash:#010x}, keeping both entries");
        }
        let shared = Arc::new(state);
        bucket.push(Arc::clone(&shared));
        shared
    }

    /// Drops entries no pass refers to any more.
    pub fn prune(&mut self) -> usize {
        let mut removed = 0;
        self.buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|s| Arc::strong_count(s) > 1);
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    /// Number of distinct cached states.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_gen::ffp::{FfpFog, FfpTransform};

    fn transform_only() -> RenderState {
        RenderState::finalized(vec![Box::new(FfpTransform::default())], [0, 0, 0])
    }

    #[test]
    fn equal_content_shares_instance() {
        let mut cache = RenderStateCache::new();
        let a = cache.add(transform_only());
        let b = cache.add(transform_only());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn colliding_hashes_are_kept_apart() {
        let mut cache = RenderStateCache::new();
        let other = RenderState::finalized(
            vec![Box::new(FfpTransform::default()), Box::new(FfpFog::default())],
            [0, 0, 0],
        );

        let a = cache.insert_hashed(7, transform_only());
        let b = cache.insert_hashed(7, other.clone());

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);

        let found_a = cache.get(7, &transform_only()).unwrap();
        let found_b = cache.get(7, &other).unwrap();
        assert!(Arc::ptr_eq(&found_a, &a));
        assert!(Arc::ptr_eq(&found_b, &b));
    }

    #[test]
    fn prune_follows_reference_count() {
        let mut cache = RenderStateCache::new();
        let kept = cache.add(transform_only());
        drop(cache.add(RenderState::finalized(vec![Box::new(FfpFog::default())], [0, 0, 0])));

        assert_eq!(cache.prune(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(kept.content_hash(), &kept).is_some());
    }
}
