use serde::{Deserialize, Serialize};

/// Weighting of history entries inside the input smoothing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterCurve {
    /// Every entry weighs the same
    #[default]
    Average,
    /// Weight grows linearly with recency
    Linear,
    /// Weight grows with the cube of recency
    Cubic,
}

impl FilterCurve {
    /// Weight of an entry at `recency` in `[0, 1]` (1 = newest).
    #[inline]
    #[must_use]
    pub fn weight(self, recency: f32) -> f32 {
        match self {
            Self::Average => 1.0,
            Self::Linear => recency,
            Self::Cubic => recency * recency * recency,
        }
    }
}

fn default_grid_divisions() -> u32 {
    4
}

fn default_rate_scale() -> f32 {
    1.0
}

/// One input axis of a blend space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendAxis {
    pub name: String,
    pub min: f32,
    pub max: f32,
    #[serde(default = "default_grid_divisions")]
    pub grid_divisions: u32,
    /// Input smoothing window in seconds; 0 disables smoothing
    #[serde(default)]
    pub smoothing_time: f32,
    #[serde(default)]
    pub smoothing_curve: FilterCurve,
    /// Compensate play rate when smoothing or clamping alter the input
    #[serde(default)]
    pub scale_play_rate: bool,
}

impl BlendAxis {
    #[must_use]
    pub fn new(name: &str, min: f32, max: f32) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
            grid_divisions: default_grid_divisions(),
            smoothing_time: 0.0,
            smoothing_curve: FilterCurve::Average,
            scale_play_rate: false,
        }
    }

    #[must_use]
    pub fn with_divisions(mut self, divisions: u32) -> Self {
        self.grid_divisions = divisions;
        self
    }

    #[must_use]
    pub fn with_smoothing(mut self, seconds: f32, curve: FilterCurve) -> Self {
        self.smoothing_time = seconds;
        self.smoothing_curve = curve;
        self
    }

    #[must_use]
    pub fn with_play_rate_scaling(mut self) -> Self {
        self.scale_play_rate = true;
        self
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> f32 {
        self.max - self.min
    }

    #[inline]
    #[must_use]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Maps a value inside the axis range to `[0, 1]`.
    #[inline]
    #[must_use]
    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.min) / self.range()
    }
}

/// A sample as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendSampleConfig {
    pub animation: String,
    /// Animation length in seconds
    #[serde(default)]
    pub length: f32,
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_rate_scale")]
    pub rate_scale: f32,
}

/// Declarative blend space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendSpaceConfig {
    pub name: String,
    /// One or two axes
    pub axes: Vec<BlendAxis>,
    pub samples: Vec<BlendSampleConfig>,
    /// Weight change per second; 0 snaps to the target weights
    #[serde(default)]
    pub target_weight_interpolation_speed: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_take_defaults() {
        let config: BlendSpaceConfig = serde_json::from_str(
            r#"{
                "name": "strafe",
                "axes": [{ "name": "x", "min": -1.0, "max": 1.0, "smoothing_curve": "Cubic" }],
                "samples": [{ "animation": "idle", "x": 0.0 }]
            }"#,
        )
        .unwrap();

        let axis = &config.axes[0];
        assert_eq!(axis.grid_divisions, 4);
        assert_eq!(axis.smoothing_curve, FilterCurve::Cubic);
        assert!(!axis.scale_play_rate);
        assert_eq!(config.samples[0].rate_scale, 1.0);
        assert_eq!(config.samples[0].y, 0.0);
        assert_eq!(config.target_weight_interpolation_speed, 0.0);
    }

    #[test]
    fn axis_normalizes_into_unit_range() {
        let axis = BlendAxis::new("speed", 2.0, 6.0);
        assert_eq!(axis.normalize(4.0), 0.5);
        assert_eq!(axis.clamp(9.0), 6.0);
    }
}
