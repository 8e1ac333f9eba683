//! Sinew core: bone transform math, numeric thresholds, error types and
//! version tracking shared by the animation crate.

pub mod errors;
pub mod math;
pub mod transform;
pub mod version;

pub use errors::{Result, SinewError};
pub use transform::BoneTransform;
pub use version::{ChangeTracker, MutGuard};

pub use glam;
