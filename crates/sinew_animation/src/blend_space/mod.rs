//! Blend spaces: animations placed on a 1D line or 2D grid and blended by
//! an input coordinate.
//!
//! [`BlendSpace`] holds the immutable sample layout (rebuilt on edit and
//! shareable between instances). [`BlendSpaceSampler`] carries one
//! instance's temporal state: input smoothing, target-weight interpolation
//! and play-rate compensation. [`BlendSpacePlayer`] adds a shared normalized
//! time and pose evaluation.

mod config;
mod filter;
mod grid;
mod player;
mod sample;
mod sampler;

pub use config::{BlendAxis, BlendSampleConfig, BlendSpaceConfig, FilterCurve};
pub use filter::InputFilter;
pub use grid::{BlendGrid, GridElement};
pub use player::{BlendSpacePlayer, PoseSource};
pub use sample::{BlendSample, SampleWeight, SampleWeights};
pub use sampler::{BlendSpace, BlendSpaceSampler, SamplerOutput};
