use glam::Vec2;
use smallvec::SmallVec;

/// One animation placed at a coordinate of a blend space.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSample {
    pub animation: String,
    /// Source animation length in seconds
    pub length: f32,
    /// Coordinate in axis units; `y` is ignored by 1D spaces
    pub position: Vec2,
    /// Playback rate of this sample relative to the blend space
    pub rate_scale: f32,
    // Normalized distance to the nearest other sample, refreshed on rebuild
    pub(crate) neighbor_radius: f32,
}

impl BlendSample {
    #[must_use]
    pub fn new(animation: &str, length: f32, position: Vec2) -> Self {
        Self {
            animation: animation.to_string(),
            length,
            position,
            rate_scale: 1.0,
            neighbor_radius: 1.0,
        }
    }

    #[must_use]
    pub fn with_rate_scale(mut self, rate_scale: f32) -> Self {
        self.rate_scale = rate_scale;
        self
    }

    /// Distance to the nearest other sample in normalized axis space.
    #[inline]
    #[must_use]
    pub fn neighbor_radius(&self) -> f32 {
        self.neighbor_radius
    }

    /// Wall-clock length once `rate_scale` is applied; 0 for a non-positive
    /// rate.
    #[inline]
    #[must_use]
    pub fn effective_length(&self) -> f32 {
        if self.rate_scale > 0.0 {
            self.length / self.rate_scale
        } else {
            0.0
        }
    }
}

/// Contribution of one sample to a blend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWeight {
    pub sample_index: usize,
    pub weight: f32,
}

impl SampleWeight {
    #[inline]
    #[must_use]
    pub fn new(sample_index: usize, weight: f32) -> Self {
        Self {
            sample_index,
            weight,
        }
    }
}

pub type SampleWeights = SmallVec<[SampleWeight; 8]>;
