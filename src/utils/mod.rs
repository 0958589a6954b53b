//! Utility Module
//!
//! - [`interner`]: String interning for efficient symbol storage
//!
//! # String Interning
//!
//! Interned strings (Symbols) can be compared in O(1) time, which keeps the
//! render-state signatures cheap to hash and compare.
//!
//! ```rust,ignore
//! use myth_shadergen::utils::interner;
//!
//! let sym1 = interner::intern("FFP_LIGHTING");
//! let sym2 = interner::intern("FFP_LIGHTING");
//! assert_eq!(sym1, sym2);
//! ```

pub mod interner;

pub use interner::Symbol;
