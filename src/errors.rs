//! Error Types
//!
//! This module defines the error types returned by the animation runtime.
//!
//! # Overview
//!
//! The main error type [`AnimationError`] covers every way a call into the
//! runtime can be rejected:
//! - Unknown state names passed to `play` / `cross_fade`
//! - Layer indices outside the animator's layer list
//! - Malformed controller definitions
//!
//! None of these are fatal. A rejected call leaves the animator exactly as it
//! was, so the frame loop can keep running.
//!
//! Data-integrity problems inside clips (unsorted keyframes, empty tracks, ...)
//! are not errors. They are reported once as [`ClipFault`](crate::animation::ClipFault)
//! diagnostics, and the affected tracks are sampled from their valid prefix.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kinema::errors::{AnimationError, Result};
//!
//! fn start(animator: &mut Animator) -> Result<()> {
//!     animator.play("idle")?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No state with this name exists in the searched layer(s).
    ///
    /// `layer` is `None` when the caller did not pin a layer and every layer
    /// was searched.
    #[error("Animator state not found: '{name}' (layer: {layer:?})")]
    StateNotFound {
        /// The requested state name
        name: String,
        /// The layer that was searched, if one was specified
        layer: Option<usize>,
    },

    /// Layer index out of bounds.
    #[error("Layer index out of range: {index} (layer count: {count})")]
    LayerOutOfRange {
        /// The invalid index
        index: usize,
        /// Number of layers on the animator
        count: usize,
    },

    // ========================================================================
    // Authoring Errors
    // ========================================================================
    /// Two states in one state machine share a name.
    #[error("Duplicate animator state name: '{0}'")]
    DuplicateState(String),

    /// The controller cannot be instantiated.
    #[error("Invalid animator controller: {0}")]
    InvalidController(String),
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
