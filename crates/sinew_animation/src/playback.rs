use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sinew_core::BoneTransform;

use crate::bone_container::BoneContainer;
use crate::curve::CurveBuffer;
use crate::retarget::Retargeter;
use crate::sequence::{AnimationSequence, SequenceCursors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    Once,
    #[default]
    Loop,
    PingPong,
}

/// Outcome of [`advance_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    /// Time moved inside `[0, length]`
    Default,
    /// Time wrapped around at least once
    Looped,
    /// Time hit an end and was clamped
    Finished,
}

/// Moves `time` by `delta` inside `[0, length]`.
///
/// Looping wraps with a floating-point modulo (negative deltas wrap from the
/// end); otherwise the time is clamped and [`AdvanceResult::Finished`] is
/// reported once it leaves the range.
pub fn advance_time(looping: bool, delta: f32, time: &mut f32, length: f32) -> AdvanceResult {
    if delta == 0.0 {
        return AdvanceResult::Default;
    }

    let mut new_time = *time + delta;
    let mut result = AdvanceResult::Default;

    if new_time < 0.0 || new_time > length {
        if looping {
            if length > 0.0 {
                new_time %= length;
                if new_time < 0.0 {
                    new_time += length;
                }
            } else {
                new_time = 0.0;
            }
            result = AdvanceResult::Looped;
        } else {
            new_time = new_time.clamp(0.0, length.max(0.0));
            result = AdvanceResult::Finished;
        }
    }

    *time = new_time;
    result
}

/// Ramps `weight` linearly toward `desired` so it arrives when
/// `blend_time_remaining` runs out. A zero remaining time snaps.
pub fn tick_blend_weight(delta_time: f32, desired: f32, weight: &mut f32, blend_time_remaining: &mut f32) {
    let desired = desired.clamp(0.0, 1.0);
    if *weight == desired {
        return;
    }

    if *blend_time_remaining <= 0.0 {
        *weight = desired;
        return;
    }

    let change_per_second = (desired - *weight) / *blend_time_remaining;
    *weight += change_per_second * delta_time;

    // Never overshoot the target
    *weight = if change_per_second >= 0.0 {
        weight.clamp(0.0, desired)
    } else {
        weight.clamp(desired, 1.0)
    };

    *blend_time_remaining = (*blend_time_remaining - delta_time).max(0.0);
}

/// Plays one sequence: time, rate and loop handling.
#[derive(Debug, Clone)]
pub struct SequencePlayer {
    sequence: Arc<AnimationSequence>,

    pub time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    pub paused: bool,

    cursors: SequenceCursors,
}

impl SequencePlayer {
    #[must_use]
    pub fn new(sequence: Arc<AnimationSequence>) -> Self {
        let cursors = SequenceCursors::for_sequence(&sequence);
        Self {
            sequence,
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Loop,
            paused: false,
            cursors,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> &Arc<AnimationSequence> {
        &self.sequence
    }

    /// Advances time; `Once` pauses the player at either end.
    pub fn update(&mut self, dt: f32) -> AdvanceResult {
        if self.paused {
            return AdvanceResult::Default;
        }

        let duration = self.sequence.length();
        if duration <= 0.0 {
            return AdvanceResult::Default;
        }

        let delta = dt * self.time_scale;
        match self.loop_mode {
            LoopMode::Once => {
                let result = advance_time(false, delta, &mut self.time, duration);
                if result == AdvanceResult::Finished {
                    self.paused = true;
                }
                result
            }
            LoopMode::Loop => advance_time(true, delta, &mut self.time, duration),
            LoopMode::PingPong => {
                // Phase runs over [0, 2 * duration); the second half plays backwards
                let double_duration = duration * 2.0;
                let mut phase = self.time + delta;
                let wrapped = phase < 0.0 || phase >= double_duration;
                phase %= double_duration;
                if phase < 0.0 {
                    phase += double_duration;
                }
                self.time = if phase > duration {
                    double_duration - phase
                } else {
                    phase
                };
                if wrapped {
                    AdvanceResult::Looped
                } else {
                    AdvanceResult::Default
                }
            }
        }
    }

    /// Samples the sequence at the current time.
    pub fn evaluate(
        &mut self,
        container: &BoneContainer,
        retargeter: Option<&Retargeter>,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    ) {
        self.sequence.sample_with_cursors(
            self.time,
            &mut self.cursors,
            container,
            retargeter,
            out_pose,
            out_curves,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_wraps_and_clamps() {
        let mut time = 0.8;
        assert_eq!(advance_time(true, 0.5, &mut time, 1.0), AdvanceResult::Looped);
        assert!((time - 0.3).abs() < 1e-6);

        let mut time = 0.2;
        assert_eq!(advance_time(true, -0.5, &mut time, 1.0), AdvanceResult::Looped);
        assert!((time - 0.7).abs() < 1e-6);

        let mut time = 0.8;
        assert_eq!(advance_time(false, 0.5, &mut time, 1.0), AdvanceResult::Finished);
        assert_eq!(time, 1.0);

        let mut time = 0.1;
        assert_eq!(advance_time(false, 0.2, &mut time, 1.0), AdvanceResult::Default);
    }

    #[test]
    fn blend_weight_ramps_linearly() {
        let mut weight = 0.0;
        let mut remaining = 0.4;
        tick_blend_weight(0.1, 1.0, &mut weight, &mut remaining);
        assert!((weight - 0.25).abs() < 1e-6);
        tick_blend_weight(0.1, 1.0, &mut weight, &mut remaining);
        assert!((weight - 0.5).abs() < 1e-6);
        tick_blend_weight(1.0, 1.0, &mut weight, &mut remaining);
        assert_eq!(weight, 1.0);
        assert_eq!(remaining, 0.0);
    }

    #[test]
    fn blend_weight_target_is_clamped_to_unit_range() {
        let mut weight = 0.5;
        let mut remaining = 0.2;
        tick_blend_weight(0.1, 2.0, &mut weight, &mut remaining);
        assert!((weight - 0.75).abs() < 1e-6);

        tick_blend_weight(0.1, -1.0, &mut weight, &mut remaining);
        assert!(weight.abs() < 1e-6);
        assert_eq!(remaining, 0.0);
    }
}
