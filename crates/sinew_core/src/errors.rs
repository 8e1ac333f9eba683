//! Error Types
//!
//! This module defines the error types used throughout Sinew.
//!
//! # Overview
//!
//! The main error type [`SinewError`] covers the recoverable failure modes
//! of building the read-only inputs of an evaluation chain:
//! - Skeleton topology validation
//! - Blend space grid construction
//! - Skeleton-to-skeleton retarget mapping
//! - Declarative configuration loading
//!
//! Blending itself never returns errors. Caller bugs (mismatched curve lists,
//! mismatched pose lengths) are debug assertions, and missing or degenerate
//! data degrades to the reference pose.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sinew_core::errors::{SinewError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for Sinew.
#[derive(Error, Debug)]
pub enum SinewError {
    // ========================================================================
    // Skeleton Errors
    // ========================================================================
    /// The bone list violates the topology invariants.
    #[error("Invalid skeleton '{skeleton}': {reason}")]
    InvalidSkeleton {
        /// Skeleton name
        skeleton: String,
        /// What was wrong
        reason: String,
    },

    /// A bone was referenced by name but does not exist.
    #[error("Unknown bone: {0}")]
    UnknownBone(String),

    /// A LOD level was requested that the skeleton does not define.
    #[error("LOD {lod} out of range (skeleton defines {available} levels)")]
    InvalidLod {
        /// Requested level
        lod: usize,
        /// Number of levels available
        available: usize,
    },

    // ========================================================================
    // Retargeting Errors
    // ========================================================================
    /// Two skeletons do not share a compatible bone hierarchy.
    #[error("Skeletons '{source_skeleton}' and '{target_skeleton}' are incompatible: {reason}")]
    IncompatibleSkeletons {
        /// Skeleton the animation was authored against
        source_skeleton: String,
        /// Skeleton the animation is played on
        target_skeleton: String,
        /// What was wrong
        reason: String,
    },

    // ========================================================================
    // Blend Space Errors
    // ========================================================================
    /// Blend space samples or axes cannot form a grid.
    #[error("Invalid blend space '{name}': {reason}")]
    InvalidBlendSpace {
        /// Blend space name
        name: String,
        /// What was wrong
        reason: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Reading a config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

// ============================================================================
// Convenient constructors
// ============================================================================

impl SinewError {
    #[must_use]
    pub fn skeleton(skeleton: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSkeleton {
            skeleton: skeleton.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn blend_space(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBlendSpace {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn incompatible(source: &str, target: &str, reason: impl Into<String>) -> Self {
        Self::IncompatibleSkeletons {
            source_skeleton: source.to_string(),
            target_skeleton: target.to_string(),
            reason: reason.into(),
        }
    }
}

/// Alias for `Result<T, SinewError>`.
pub type Result<T> = std::result::Result<T, SinewError>;
