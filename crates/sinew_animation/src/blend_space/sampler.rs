use glam::Vec2;
use sinew_core::math::{KINDA_SMALL_NUMBER, ZERO_ANIM_WEIGHT_THRESH, interp_constant_to};
use sinew_core::{Result, SinewError};
use smallvec::SmallVec;

use super::config::{BlendAxis, BlendSpaceConfig};
use super::filter::InputFilter;
use super::grid::BlendGrid;
use super::sample::{BlendSample, SampleWeight, SampleWeights};

/// Samples arranged over one or two input axes.
///
/// Immutable while sampled; editing samples rebuilds the lookup structures
/// and requires `&mut self`.
#[derive(Debug, Clone)]
pub struct BlendSpace {
    name: String,
    axes: SmallVec<[BlendAxis; 2]>,
    samples: Vec<BlendSample>,
    target_weight_interpolation_speed: f32,

    // === Derived ===
    // 1D: sample indices sorted by coordinate
    sorted: Vec<usize>,
    // 2D only
    grid: Option<BlendGrid>,
}

impl BlendSpace {
    pub fn new(name: &str, axes: Vec<BlendAxis>, samples: Vec<BlendSample>) -> Result<Self> {
        let mut space = Self {
            name: name.to_string(),
            axes: SmallVec::from_vec(axes),
            samples,
            target_weight_interpolation_speed: 0.0,
            sorted: Vec::new(),
            grid: None,
        };
        space.rebuild()?;
        Ok(space)
    }

    pub fn from_config(config: &BlendSpaceConfig) -> Result<Self> {
        let samples = config
            .samples
            .iter()
            .map(|sample| {
                BlendSample::new(
                    &sample.animation,
                    sample.length,
                    Vec2::new(sample.x, sample.y),
                )
                .with_rate_scale(sample.rate_scale)
            })
            .collect();

        let mut space = Self::new(&config.name, config.axes.clone(), samples)?;
        space.target_weight_interpolation_speed = config.target_weight_interpolation_speed;
        Ok(space)
    }

    #[must_use]
    pub fn with_target_weight_interpolation(mut self, speed_per_second: f32) -> Self {
        self.target_weight_interpolation_speed = speed_per_second;
        self
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Adds a sample; on validation failure the space is left unchanged.
    pub fn add_sample(&mut self, sample: BlendSample) -> Result<usize> {
        self.samples.push(sample);
        if let Err(err) = self.rebuild() {
            self.samples.pop();
            self.rebuild()?;
            return Err(err);
        }
        Ok(self.samples.len() - 1)
    }

    pub fn remove_sample(&mut self, index: usize) -> Result<BlendSample> {
        if index >= self.samples.len() {
            return Err(SinewError::blend_space(
                &self.name,
                format!("no sample at index {index}"),
            ));
        }
        let removed = self.samples.remove(index);
        if let Err(err) = self.rebuild() {
            self.samples.insert(index, removed);
            self.rebuild()?;
            return Err(err);
        }
        Ok(removed)
    }

    /// Moves a sample; on validation failure the old position is restored.
    pub fn set_sample_position(&mut self, index: usize, position: Vec2) -> Result<()> {
        let Some(sample) = self.samples.get_mut(index) else {
            return Err(SinewError::blend_space(
                &self.name,
                format!("no sample at index {index}"),
            ));
        };
        let previous = std::mem::replace(&mut sample.position, position);
        if let Err(err) = self.rebuild() {
            self.samples[index].position = previous;
            self.rebuild()?;
            return Err(err);
        }
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.validate()?;

        let positions: Vec<Vec2> = self
            .samples
            .iter()
            .map(|s| self.normalized_position(s.position))
            .collect();

        // Neighbor radius: normalized distance to the closest other sample
        for (i, sample) in self.samples.iter_mut().enumerate() {
            let nearest = positions
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| p.distance(positions[i]))
                .fold(f32::INFINITY, f32::min);
            sample.neighbor_radius = if nearest.is_finite() { nearest } else { 1.0 };
        }

        if self.dimensions() == 1 {
            self.sorted = (0..self.samples.len()).collect();
            self.sorted
                .sort_by(|&a, &b| positions[a].x.total_cmp(&positions[b].x));
            self.grid = None;
        } else {
            let radii: Vec<f32> = self.samples.iter().map(|s| s.neighbor_radius).collect();
            let divisions = [self.axes[0].grid_divisions, self.axes[1].grid_divisions];
            self.grid = Some(BlendGrid::build(divisions, &positions, &radii));
            self.sorted.clear();
        }

        log::debug!(
            "Blend space '{}' rebuilt: {} samples, {}D",
            self.name,
            self.samples.len(),
            self.dimensions()
        );
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(SinewError::blend_space(&self.name, reason));

        if self.axes.is_empty() || self.axes.len() > 2 {
            return invalid(format!("expected 1 or 2 axes, got {}", self.axes.len()));
        }
        for axis in &self.axes {
            if !axis.min.is_finite() || !axis.max.is_finite() || axis.range() <= KINDA_SMALL_NUMBER {
                return invalid(format!(
                    "axis '{}' has a degenerate range [{}, {}]",
                    axis.name, axis.min, axis.max
                ));
            }
            if axis.grid_divisions == 0 {
                return invalid(format!("axis '{}' has zero grid divisions", axis.name));
            }
        }
        if self.samples.is_empty() {
            return invalid("no samples".to_string());
        }

        for (i, sample) in self.samples.iter().enumerate() {
            let position = self.active_position(sample.position);
            if !position.is_finite() {
                return invalid(format!("sample '{}' has a non-finite coordinate", sample.animation));
            }
            for (axis_index, axis) in self.axes.iter().enumerate() {
                let value = position[axis_index];
                if value < axis.min || value > axis.max {
                    return invalid(format!(
                        "sample '{}' lies outside axis '{}'",
                        sample.animation, axis.name
                    ));
                }
            }
            let normalized = self.normalized_position(sample.position);
            for other in &self.samples[i + 1..] {
                if self.normalized_position(other.position).distance(normalized) <= KINDA_SMALL_NUMBER {
                    return invalid(format!(
                        "samples '{}' and '{}' share a coordinate",
                        sample.animation, other.animation
                    ));
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    #[must_use]
    pub fn axes(&self) -> &[BlendAxis] {
        &self.axes
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[BlendSample] {
        &self.samples
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> Option<&BlendGrid> {
        self.grid.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn target_weight_interpolation_speed(&self) -> f32 {
        self.target_weight_interpolation_speed
    }

    // Drops the unused axis of 1D spaces
    fn active_position(&self, position: Vec2) -> Vec2 {
        if self.dimensions() == 1 {
            Vec2::new(position.x, 0.0)
        } else {
            position
        }
    }

    fn normalized_position(&self, position: Vec2) -> Vec2 {
        let x = self.axes[0].normalize(position.x);
        let y = self.axes.get(1).map_or(0.0, |axis| axis.normalize(position.y));
        Vec2::new(x, y)
    }

    /// Clamps an input coordinate to the axis ranges.
    #[must_use]
    pub fn clamp_input(&self, input: Vec2) -> Vec2 {
        let x = self.axes[0].clamp(input.x);
        let y = self.axes.get(1).map_or(0.0, |axis| axis.clamp(input.y));
        Vec2::new(x, y)
    }

    /// Normalized sample weights for an input coordinate.
    ///
    /// The result is consolidated (one entry per sample and per animation),
    /// sorted by descending weight, truncated at the first negligible entry
    /// and renormalized to sum to one.
    #[must_use]
    pub fn sample_weights(&self, input: Vec2) -> SampleWeights {
        let mut raw = SampleWeights::new();

        if self.samples.len() == 1 {
            raw.push(SampleWeight::new(0, 1.0));
            return raw;
        }

        let normalized = self.normalized_position(self.clamp_input(input));
        match &self.grid {
            Some(grid) => grid.sample(normalized, &mut raw),
            None => self.sample_1d(normalized.x, &mut raw),
        }

        self.consolidate(raw)
    }

    fn sample_1d(&self, x: f32, out: &mut SampleWeights) {
        let position = |index: usize| self.axes[0].normalize(self.samples[index].position.x);

        let upper = self.sorted.partition_point(|&index| position(index) <= x);
        if upper == 0 {
            out.push(SampleWeight::new(self.sorted[0], 1.0));
        } else if upper == self.sorted.len() {
            out.push(SampleWeight::new(self.sorted[upper - 1], 1.0));
        } else {
            let lo = self.sorted[upper - 1];
            let hi = self.sorted[upper];
            let alpha = (x - position(lo)) / (position(hi) - position(lo));
            out.push(SampleWeight::new(lo, 1.0 - alpha));
            out.push(SampleWeight::new(hi, alpha));
        }
    }

    fn consolidate(&self, raw: SampleWeights) -> SampleWeights {
        let mut merged = SampleWeights::new();
        for entry in raw {
            let animation = &self.samples[entry.sample_index].animation;
            match merged.iter_mut().find(|m| {
                m.sample_index == entry.sample_index
                    || self.samples[m.sample_index].animation == *animation
            }) {
                Some(existing) => existing.weight += entry.weight,
                None => merged.push(entry),
            }
        }

        merged.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        if let Some(cut) = merged
            .iter()
            .position(|entry| entry.weight <= ZERO_ANIM_WEIGHT_THRESH)
        {
            merged.truncate(cut);
        }
        normalize_weights(&mut merged);
        merged
    }

    /// Weighted wall-clock length of a blend: `Σ weight · length / rate_scale`.
    #[must_use]
    pub fn animation_length(&self, weights: &[SampleWeight]) -> f32 {
        weights
            .iter()
            .filter(|entry| entry.weight > ZERO_ANIM_WEIGHT_THRESH)
            .map(|entry| self.samples[entry.sample_index].effective_length() * entry.weight)
            .sum()
    }
}

fn normalize_weights(weights: &mut SampleWeights) {
    let total: f32 = weights.iter().map(|entry| entry.weight).sum();
    if total > ZERO_ANIM_WEIGHT_THRESH {
        for entry in weights.iter_mut() {
            entry.weight /= total;
        }
    }
}

// ============================================================================
// Temporal sampler
// ============================================================================

/// Result of one sampler tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerOutput {
    /// Normalized weights, sorted by descending weight
    pub weights: SampleWeights,
    /// Recommended play-rate multiplier
    pub play_rate: f32,
    /// Length of the weights the sampler is heading to, before interpolation
    pub target_length: f32,
    /// Input after smoothing and clamping
    pub input: Vec2,
}

/// Per-instance temporal state of a blend space: input smoothing, weight
/// interpolation and play-rate compensation.
#[derive(Debug, Clone)]
pub struct BlendSpaceSampler {
    filters: SmallVec<[InputFilter; 2]>,
    weights: SampleWeights,
    initialized: bool,
}

impl BlendSpaceSampler {
    #[must_use]
    pub fn new(space: &BlendSpace) -> Self {
        Self {
            filters: space
                .axes()
                .iter()
                .map(|axis| InputFilter::new(axis.smoothing_time, axis.smoothing_curve))
                .collect(),
            weights: SampleWeights::new(),
            initialized: false,
        }
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
        self.weights.clear();
        self.initialized = false;
    }

    /// Current (possibly interpolating) weights.
    #[must_use]
    pub fn weights(&self) -> &[SampleWeight] {
        &self.weights
    }

    pub fn update(&mut self, space: &BlendSpace, raw_input: Vec2, delta_time: f32) -> SamplerOutput {
        let mut filtered = raw_input;
        for (axis, filter) in self.filters.iter_mut().enumerate() {
            filtered[axis] = filter.filter(raw_input[axis], delta_time);
        }
        let clamped = space.clamp_input(filtered);

        let target = space.sample_weights(clamped);
        let target_length = space.animation_length(&target);
        let speed = space.target_weight_interpolation_speed();
        let mut play_rate = 1.0;

        if speed > 0.0 && self.initialized {
            interpolate_weights(&mut self.weights, &target, speed, delta_time);
            let interpolated_length = space.animation_length(&self.weights);
            // Both lengths must be usable before rescaling
            if target_length > ZERO_ANIM_WEIGHT_THRESH && interpolated_length > ZERO_ANIM_WEIGHT_THRESH {
                play_rate *= target_length / interpolated_length;
            }
        } else {
            self.weights.clone_from(&target);
        }
        self.initialized = true;

        for (axis_index, axis) in space.axes().iter().enumerate() {
            if !axis.scale_play_rate {
                continue;
            }
            let raw = raw_input[axis_index];
            let smooth = filtered[axis_index];
            let limited = clamped[axis_index];

            if smooth != 0.0 && raw != smooth {
                play_rate *= raw / smooth;
            }
            if limited != smooth && limited != 0.0 {
                play_rate *= smooth / limited;
            }
        }

        SamplerOutput {
            weights: self.weights.clone(),
            play_rate,
            target_length,
            input: clamped,
        }
    }
}

/// Moves each weight toward its target at `speed` per second.
///
/// Samples absent from `target` head to zero and are dropped once negligible;
/// new samples start from zero. The result is re-sorted by descending weight.
/// Falls back to `target` if nothing survives.
fn interpolate_weights(current: &mut SampleWeights, target: &[SampleWeight], speed: f32, delta_time: f32) {
    let mut next = SampleWeights::new();

    for entry in current.iter() {
        let goal = target
            .iter()
            .find(|t| t.sample_index == entry.sample_index)
            .map_or(0.0, |t| t.weight);
        let weight = interp_constant_to(entry.weight, goal, delta_time, speed);
        if weight > ZERO_ANIM_WEIGHT_THRESH {
            next.push(SampleWeight::new(entry.sample_index, weight));
        }
    }
    for entry in target {
        if current.iter().any(|c| c.sample_index == entry.sample_index) {
            continue;
        }
        let weight = interp_constant_to(0.0, entry.weight, delta_time, speed);
        if weight > ZERO_ANIM_WEIGHT_THRESH {
            next.push(SampleWeight::new(entry.sample_index, weight));
        }
    }

    let total: f32 = next.iter().map(|entry| entry.weight).sum();
    if total > ZERO_ANIM_WEIGHT_THRESH {
        normalize_weights(&mut next);
        next.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        *current = next;
    } else {
        current.clear();
        current.extend_from_slice(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> BlendSpace {
        BlendSpace::new(
            "line",
            vec![BlendAxis::new("speed", 0.0, 10.0)],
            vec![
                BlendSample::new("idle", 1.0, Vec2::new(0.0, 0.0)),
                BlendSample::new("run", 2.0, Vec2::new(10.0, 0.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn out_of_range_input_clamps_to_end_sample() {
        let space = line();
        let weights = space.sample_weights(Vec2::new(25.0, 0.0));
        assert_eq!(weights.as_slice(), &[SampleWeight::new(1, 1.0)]);
    }

    #[test]
    fn duplicate_coordinates_are_rejected() {
        let mut space = line();
        let err = space
            .add_sample(BlendSample::new("walk", 1.0, Vec2::new(10.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, SinewError::InvalidBlendSpace { .. }));
        assert_eq!(space.samples().len(), 2);
    }

    #[test]
    fn truncation_drops_negligible_tail() {
        let space = line();
        let weights = space.sample_weights(Vec2::new(10.0 - 1e-4, 0.0));
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].sample_index, 1);
        assert_eq!(weights[0].weight, 1.0);
    }

    #[test]
    fn interpolation_moves_at_bounded_rate() {
        let space = line().with_target_weight_interpolation(1.0);
        let mut sampler = BlendSpaceSampler::new(&space);

        sampler.update(&space, Vec2::ZERO, 0.1);
        assert_eq!(sampler.weights(), &[SampleWeight::new(0, 1.0)]);

        let output = sampler.update(&space, Vec2::new(10.0, 0.0), 0.25);
        let run = output.weights.iter().find(|w| w.sample_index == 1).unwrap();
        assert!((run.weight - 0.25 / 1.0).abs() < 1e-3, "{:?}", output.weights);
        let total: f32 = output.weights.iter().map(|w| w.weight).sum();
        assert!((total - 1.0).abs() < 1e-5);
        // Target is all "run" (length 2), interpolated mix is shorter
        assert!(output.play_rate > 1.0);
    }

    #[test]
    fn interpolated_weights_stay_sorted() {
        let space = line().with_target_weight_interpolation(1.0);
        let mut sampler = BlendSpaceSampler::new(&space);

        sampler.update(&space, Vec2::ZERO, 0.1);
        // "run" enters after "idle" but overtakes it within one tick
        let output = sampler.update(&space, Vec2::new(10.0, 0.0), 0.75);

        assert_eq!(output.weights[0].sample_index, 1);
        assert!(output.weights.windows(2).all(|pair| pair[0].weight >= pair[1].weight));
    }
}
