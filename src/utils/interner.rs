//! Global String Interner
//!
//! Turns strings into compact integer [`Symbol`]s so shader macro sets can be
//! compared and hashed without touching the string data. This is the backing
//! store of [`ShaderDefines`](crate::resources::ShaderDefines).

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier of an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it is already known.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
///
/// # Panics
/// Panics if the symbol did not come from this interner.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the macro names emitted by the built-in sub render states so
/// the first build of a pass does not pay for them.
pub fn preload_common_macros() {
    let common = [
        // Transform
        "FFP_TRANSFORM",
        "VERTEX_NORMALS",
        "TEX_COORD_SETS",
        // Colour
        "FFP_COLOUR",
        "TRACK_VERTEX_AMBIENT",
        "TRACK_VERTEX_DIFFUSE",
        "TRACK_VERTEX_SPECULAR",
        "TRACK_VERTEX_EMISSIVE",
        "VERTEX_COLOUR_INPUT",
        // Lighting
        "FFP_LIGHTING",
        "PER_PIXEL_LIGHTING",
        "POINT_LIGHT_COUNT",
        "DIRECTIONAL_LIGHT_COUNT",
        "SPOT_LIGHT_COUNT",
        "LIGHT_TOTAL",
        "USE_SPECULAR",
        // Texturing
        "FFP_TEXTURING",
        "TEXTURE_UNIT_COUNT",
        // Fog
        "FFP_FOG",
        "FOG_MODE",
        // Common values
        "0",
        "1",
        "true",
    ];

    for name in common {
        intern(name);
    }
}
