//! Shader Macro Definitions
//!
//! Every sub render state describes its contribution to a generated program as
//! a set of macro definitions (`FFP_LIGHTING = 1`, `TEXTURE_UNIT_COUNT = 2`,
//! ...). The same set drives both the template expansion and the content
//! identity of a [`RenderState`](crate::shader_gen::RenderState), so it has to
//! hash and compare identically regardless of insertion order.
//!
//! Keys and values are interned [`Symbol`]s kept sorted by symbol id, which
//! makes equality a slice comparison and hashing a single pass.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::utils::interner::{self, Symbol};

/// An ordered set of shader macro definitions.
#[derive(Debug, Clone, Default)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: &str) {
        self.set_symbol(interner::intern(key), interner::intern(value));
    }

    /// Sets `key` to `"1"`.
    pub fn enable(&mut self, key: &str) {
        self.set(key, "1");
    }

    /// Sets `key` to the display form of `value`.
    pub fn set_value(&mut self, key: &str, value: impl Display) {
        self.set(key, &value.to_string());
    }

    #[inline]
    pub fn set_symbol(&mut self, key: Symbol, value: Symbol) {
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.defines[idx].1 = value,
            Err(idx) => self.defines.insert(idx, (key, value)),
        }
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(key) = interner::get(key) else {
            return false;
        };
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => {
                self.defines.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key).is_some_and(|key| {
            self.defines
                .binary_search_by_key(&key, |&(k, _)| k)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Cow<'static, str>> {
        let key = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key, |&(k, _)| k)
            .ok()
            .map(|idx| Cow::Borrowed(interner::resolve(self.defines[idx].1)))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.defines.clear();
    }

    /// Iterates the definitions as resolved strings.
    pub fn iter_strings(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Converts to a name-ordered map, the shape the template engine consumes.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter_strings()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect()
    }

    /// Merges `other` into `self`; values from `other` win on conflict.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for &(key, value) in &other.defines {
            self.set_symbol(key, value);
        }
    }

    /// Content hash of the definition set.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        rustc_hash::FxBuildHasher.hash_one(self)
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[(Symbol, Symbol)] {
        &self.defines
    }
}

impl Hash for ShaderDefines {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.defines.hash(state);
    }
}

impl PartialEq for ShaderDefines {
    fn eq(&self, other: &Self) -> bool {
        self.defines == other.defines
    }
}

impl Eq for ShaderDefines {}

impl From<&[(&str, &str)]> for ShaderDefines {
    fn from(defines: &[(&str, &str)]) -> Self {
        let mut result = Self::new();
        for (k, v) in defines {
            result.set(k, v);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_and_remove() {
        let mut defines = ShaderDefines::new();
        defines.enable("FFP_LIGHTING");
        defines.set_value("TEXTURE_UNIT_COUNT", 2);

        assert!(defines.contains("FFP_LIGHTING"));
        assert_eq!(defines.get("TEXTURE_UNIT_COUNT").as_deref(), Some("2"));

        assert!(defines.remove("FFP_LIGHTING"));
        assert!(!defines.remove("FFP_LIGHTING"));
        assert!(!defines.contains("FFP_LIGHTING"));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut a = ShaderDefines::new();
        a.set("FOG_MODE", "LINEAR");
        a.enable("FFP_FOG");

        let mut b = ShaderDefines::new();
        b.enable("FFP_FOG");
        b.set("FOG_MODE", "LINEAR");

        assert_eq!(a, b);
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn merge_overrides() {
        let mut base = ShaderDefines::from(&[("POINT_LIGHT_COUNT", "1"), ("USE_SPECULAR", "1")][..]);
        let over = ShaderDefines::from(&[("POINT_LIGHT_COUNT", "4")][..]);

        base.merge(&over);

        assert_eq!(base.get("POINT_LIGHT_COUNT").as_deref(), Some("4"));
        assert_eq!(base.get("USE_SPECULAR").as_deref(), Some("1"));
        assert_eq!(base.len(), 2);
    }
}
