use serde::{Deserialize, Serialize};

use super::values::Interpolatable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

const MAX_SCAN_OFFSET: usize = 3;

/// Last key interval a track was sampled at; makes forward playback O(1).
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyframeCursor {
    pub last_index: usize,
}

/// Why a track failed ingestion checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackDefect {
    /// A key time or value is NaN or infinite
    NonFiniteKey { key_index: usize },
    /// Key times decrease
    UnsortedTimes { key_index: usize },
    /// Value count does not match the key count for the interpolation mode
    MismatchedKeyCount { times: usize, values: usize },
}

#[derive(Debug, Clone)]
pub struct KeyframeTrack<T: Interpolatable> {
    pub times: Vec<f32>,
    /// Three values per key for CubicSpline
    pub values: Vec<T>,
    pub interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    #[must_use]
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Self {
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Single-key track.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self::new(vec![0.0], vec![value], InterpolationMode::Step)
    }

    #[must_use]
    pub fn linear(keys: &[(f32, T)]) -> Self {
        Self::new(
            keys.iter().map(|(t, _)| *t).collect(),
            keys.iter().map(|(_, v)| *v).collect(),
            InterpolationMode::Linear,
        )
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// First defect found, if any.
    #[must_use]
    pub fn validate(&self) -> Option<TrackDefect> {
        let expected = match self.interpolation {
            InterpolationMode::CubicSpline => self.times.len() * 3,
            _ => self.times.len(),
        };
        if self.values.len() != expected {
            return Some(TrackDefect::MismatchedKeyCount {
                times: self.times.len(),
                values: self.values.len(),
            });
        }

        for (key_index, time) in self.times.iter().enumerate() {
            if !time.is_finite() {
                return Some(TrackDefect::NonFiniteKey { key_index });
            }
            if key_index > 0 && *time < self.times[key_index - 1] {
                return Some(TrackDefect::UnsortedTimes { key_index });
            }
        }

        let stride = if self.interpolation == InterpolationMode::CubicSpline { 3 } else { 1 };
        self.values
            .iter()
            .position(|value| !value.is_finite())
            .map(|index| TrackDefect::NonFiniteKey {
                key_index: index / stride,
            })
    }

    /// Binary-search sampling; `None` for an empty track.
    #[must_use]
    pub fn sample(&self, time: f32) -> Option<T> {
        (!self.times.is_empty()).then(|| self.value_in_interval(self.interval_at(time), time))
    }

    /// Sampling with a cursor: a few keys are scanned around the last
    /// interval before falling back to binary search.
    pub fn sample_with_cursor(&self, time: f32, cursor: &mut KeyframeCursor) -> Option<T> {
        match self.times.len() {
            0 => None,
            1 => Some(self.key_value(0)),
            len => {
                // A cursor reused from a longer track may point past the end
                let start = cursor.last_index.min(len - 1);
                let interval = self
                    .scan_interval(start, time)
                    .unwrap_or_else(|| self.interval_at(time));
                cursor.last_index = interval;
                Some(self.value_in_interval(interval, time))
            }
        }
    }

    // Last key at or before `time`; key 0 when `time` precedes every key
    fn interval_at(&self, time: f32) -> usize {
        self.times.partition_point(|&t| t <= time).saturating_sub(1)
    }

    fn scan_interval(&self, start: usize, time: f32) -> Option<usize> {
        let last = self.times.len() - 1;
        if time >= self.times[start] {
            (start..=(start + MAX_SCAN_OFFSET).min(last)).find(|&key| key == last || time < self.times[key + 1])
        } else {
            (start.saturating_sub(MAX_SCAN_OFFSET)..start)
                .rev()
                .find(|&key| time >= self.times[key])
        }
    }

    // CubicSpline stores [in_tangent, value, out_tangent] per key
    fn key_value(&self, key: usize) -> T {
        match self.interpolation {
            InterpolationMode::CubicSpline => self.values[key * 3 + 1],
            _ => self.values[key],
        }
    }

    fn value_in_interval(&self, key: usize, time: f32) -> T {
        let Some(&next_time) = self.times.get(key + 1) else {
            return self.key_value(key);
        };
        let key_time = self.times[key];
        let span = next_time - key_time;
        let alpha = if span > 1e-6 {
            ((time - key_time) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        match self.interpolation {
            InterpolationMode::Step => self.key_value(key),
            InterpolationMode::Linear => T::interpolate_linear(self.key_value(key), self.key_value(key + 1), alpha),
            InterpolationMode::CubicSpline => {
                let from = key * 3;
                let to = from + 3;
                T::interpolate_cubic(
                    self.values[from + 1],
                    self.values[from + 2],
                    self.values[to],
                    self.values[to + 1],
                    alpha,
                    span,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_matches_binary_search() {
        let track = KeyframeTrack::linear(&[(0.0, 0.0_f32), (1.0, 10.0), (2.0, 0.0), (3.0, 5.0)]);
        let mut cursor = KeyframeCursor::default();

        for time in [0.0, 0.5, 1.5, 2.9, 3.5, 0.25, 2.0] {
            assert_eq!(track.sample_with_cursor(time, &mut cursor), track.sample(time));
        }
    }

    #[test]
    fn time_before_first_key_clamps() {
        let track = KeyframeTrack::linear(&[(1.0, 4.0_f32), (2.0, 8.0)]);
        assert_eq!(track.sample(0.0), Some(4.0));
        assert_eq!(track.sample(5.0), Some(8.0));
    }

    #[test]
    fn nan_value_is_reported_with_key_index() {
        let track = KeyframeTrack::linear(&[(0.0, 1.0_f32), (1.0, f32::NAN)]);
        assert_eq!(track.validate(), Some(TrackDefect::NonFiniteKey { key_index: 1 }));
    }

    #[test]
    fn empty_track_samples_nothing() {
        let track: KeyframeTrack<f32> = KeyframeTrack::new(Vec::new(), Vec::new(), InterpolationMode::Linear);
        assert!(track.sample(0.0).is_none());
        assert!(track.validate().is_none());
    }
}
