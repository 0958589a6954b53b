//! Error Types
//!
//! This module defines the error types used throughout the shader generator.
//!
//! # Overview
//!
//! The main error type [`ShaderGenError`] covers all failure modes including:
//! - Lookup failures (materials, techniques, schemes, sub render state types)
//! - Duplicate registrations
//! - Shader build failures caused by unsupported fixed-function state
//! - Lifecycle misuse (calling into the generator before `initialize`)
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ShaderGenError>`.
//!
//! ```rust,ignore
//! use myth_shadergen::errors::{ShaderGenError, Result};
//!
//! fn register(generator: &ShaderGenerator) -> Result<()> {
//!     generator.create_shader_based_technique("Wall", "Default", "Shaders")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the shader generator.
#[derive(Error, Debug)]
pub enum ShaderGenError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// The material library has no material with this name.
    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    /// The material has no technique for the requested scheme.
    #[error("Material '{material}' has no technique for scheme '{scheme}'")]
    TechniqueNotFound {
        /// Material that was searched
        material: String,
        /// Scheme that was requested
        scheme: String,
    },

    /// No scheme entry with this name exists.
    #[error("Scheme not found: {0}")]
    SchemeNotFound(String),

    /// No shader based technique was registered for this mapping.
    #[error("No shader based technique registered for '{material}' ({src_scheme} -> {dst_scheme})")]
    NotRegistered {
        /// Material name
        material: String,
        /// Source technique scheme
        src_scheme: String,
        /// Destination technique scheme
        dst_scheme: String,
    },

    /// No sub render state factory is registered for this type.
    #[error("Unknown sub render state type: {0}")]
    UnknownSubRenderStateType(String),

    /// Pass index past the end of a technique.
    #[error("Pass index out of bounds: {context} (index: {index})")]
    PassIndexOutOfBounds {
        /// Description of what was being accessed
        context: String,
        /// The invalid index
        index: usize,
    },

    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// The source technique is already mapped to a destination scheme.
    #[error(
        "Material '{material}' scheme '{src_scheme}' is already mapped to scheme '{existing_dst_scheme}'"
    )]
    AlreadyRegistered {
        /// Material name
        material: String,
        /// Source technique scheme
        src_scheme: String,
        /// Destination scheme the source is currently mapped to
        existing_dst_scheme: String,
    },

    /// A factory with the same type name is already registered.
    #[error("Sub render state factory already registered: {0}")]
    FactoryAlreadyRegistered(String),

    // ========================================================================
    // Build Errors
    // ========================================================================
    /// A sub render state could not be generated for a pass.
    #[error("Failed to build sub render state '{sub_state}': {reason}")]
    BuildFailure {
        /// Type name of the failing sub render state
        sub_state: String,
        /// Human readable cause
        reason: String,
    },

    /// The configured output language has no templates.
    #[error("Unsupported shader language: {0}")]
    UnsupportedLanguage(String),

    /// Template lookup or rendering failed.
    #[error("Shader template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The generator has not been initialized (or was finalized).
    #[error("Shader generator is not initialized")]
    Uninitialized,

    /// `initialize` was called twice.
    #[error("Shader generator is already initialized")]
    AlreadyInitialized,

    /// A required collaborator could not be constructed.
    #[error("Shader generator initialization failed: {0}")]
    InitializationFailed(String),
}

impl ShaderGenError {
    /// Shorthand for [`ShaderGenError::BuildFailure`].
    pub fn build_failure(sub_state: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BuildFailure {
            sub_state: sub_state.into(),
            reason: reason.into(),
        }
    }

    /// True for every lookup failure.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MaterialNotFound(_)
                | Self::TechniqueNotFound { .. }
                | Self::SchemeNotFound(_)
                | Self::NotRegistered { .. }
                | Self::UnknownSubRenderStateType(_)
                | Self::PassIndexOutOfBounds { .. }
        )
    }

    #[inline]
    #[must_use]
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            Self::BuildFailure { .. } | Self::UnsupportedLanguage(_) | Self::TemplateError(_)
        )
    }
}

/// Alias for `Result<T, ShaderGenError>`.
pub type Result<T> = std::result::Result<T, ShaderGenError>;
