//! Scheme entry: a named group of generated techniques sharing one global
//! render state.
//!
//! A scheme is either clean or out of date. New schemes start out of date;
//! [`invalidate`](SgScheme::invalidate) always makes them stale and only a
//! full validation in which every technique builds makes them clean again.
//!
//! A lazy build that fails suspends further lazy builds of the scheme until
//! it is invalidated or one of its techniques changes.

use crate::shader_gen::entries::TechniqueKey;
use crate::shader_gen::render_state::RenderState;

#[derive(Debug)]
pub struct SgScheme {
    name: String,
    techniques: Vec<TechniqueKey>,
    render_state: RenderState,
    out_of_date: bool,
    lazy_builds_suspended: bool,
}

impl SgScheme {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            techniques: Vec::new(),
            render_state: RenderState::new(),
            out_of_date: true,
            lazy_builds_suspended: false,
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
        self.invalidate();
    }

    pub(crate) fn remove_technique(&mut self, key: TechniqueKey) {
        self.techniques.retain(|&k| k != key);
    }

    #[must_use]
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub(crate) fn render_state_mut(&mut self) -> &mut RenderState {
        &mut self.render_state
    }

    #[inline]
    #[must_use]
    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date
    }

    pub(crate) fn invalidate(&mut self) {
        self.out_of_date = true;
        self.lazy_builds_suspended = false;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.out_of_date = false;
        self.lazy_builds_suspended = false;
    }

    /// Whether the pre-find hook should try to build this scheme.
    #[must_use]
    pub fn wants_lazy_build(&self) -> bool {
        self.out_of_date && !self.lazy_builds_suspended
    }

    pub(crate) fn suspend_lazy_builds(&mut self) {
        self.lazy_builds_suspended = true;
    }

    pub(crate) fn resume_lazy_builds(&mut self) {
        self.lazy_builds_suspended = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn new_scheme_is_out_of_date() {
        let mut scheme = SgScheme::new("Shaders");
        assert!(scheme.is_out_of_date());
        scheme.mark_clean();
        assert!(!scheme.is_out_of_date());

        let mut keys: SlotMap<TechniqueKey, ()> = SlotMap::with_key();
        scheme.add_technique(keys.insert(()));
        assert!(scheme.is_out_of_date());
    }

    #[test]
    fn suspended_lazy_builds_resume_on_invalidate() {
        let mut scheme = SgScheme::new("Shaders");
        assert!(scheme.wants_lazy_build());

        scheme.suspend_lazy_builds();
        assert!(scheme.is_out_of_date());
        assert!(!scheme.wants_lazy_build());

        scheme.invalidate();
        assert!(scheme.wants_lazy_build());

        scheme.suspend_lazy_builds();
        scheme.resume_lazy_builds();
        assert!(scheme.wants_lazy_build());

        scheme.mark_clean();
        assert!(!scheme.wants_lazy_build());
    }
}
