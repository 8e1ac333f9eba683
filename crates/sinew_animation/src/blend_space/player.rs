use glam::Vec2;
use sinew_core::BoneTransform;
use sinew_core::math::ZERO_ANIM_WEIGHT_THRESH;

use super::sample::{SampleWeight, SampleWeights};
use super::sampler::{BlendSpace, BlendSpaceSampler};
use crate::arena::EvaluationArena;
use crate::blend::{blend_many, blend_many_curves};
use crate::bone_container::BoneContainer;
use crate::curve::CurveBuffer;
use crate::playback::{AdvanceResult, advance_time};

/// Produces the pose of a named animation at a time.
pub trait PoseSource {
    /// Writes the local pose of `animation` at `time` seconds into
    /// `out_pose`, and its curves into `out_curves`. Unknown animations
    /// yield the reference pose.
    fn evaluate(
        &self,
        animation: &str,
        time: f32,
        container: &BoneContainer,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    );
}

/// Plays a blend space: samples share one normalized time, so feet stay in
/// phase across differently sized cycles.
#[derive(Debug, Clone)]
pub struct BlendSpacePlayer {
    sampler: BlendSpaceSampler,
    weights: SampleWeights,
    normalized_time: f32,
    pub play_rate: f32,
    pub looping: bool,
}

impl BlendSpacePlayer {
    #[must_use]
    pub fn new(space: &BlendSpace) -> Self {
        Self {
            sampler: BlendSpaceSampler::new(space),
            weights: SampleWeights::new(),
            normalized_time: 0.0,
            play_rate: 1.0,
            looping: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn normalized_time(&self) -> f32 {
        self.normalized_time
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[SampleWeight] {
        &self.weights
    }

    /// Time in seconds of a sample at the shared normalized time.
    #[must_use]
    pub fn sample_time(&self, space: &BlendSpace, sample_index: usize) -> f32 {
        self.normalized_time * space.samples()[sample_index].length
    }

    /// Samples the space and advances the shared normalized time.
    pub fn update(&mut self, space: &BlendSpace, input: Vec2, delta_time: f32) -> AdvanceResult {
        let output = self.sampler.update(space, input, delta_time);
        self.weights = output.weights;

        if output.target_length <= ZERO_ANIM_WEIGHT_THRESH {
            return AdvanceResult::Default;
        }

        let delta = delta_time * self.play_rate * output.play_rate / output.target_length;
        advance_time(self.looping, delta, &mut self.normalized_time, 1.0)
    }

    /// Evaluates every weighted sample into arena scratch poses and blends
    /// them into `out_pose` / `out_curves`.
    pub fn evaluate<S: PoseSource + ?Sized>(
        &self,
        space: &BlendSpace,
        source: &S,
        container: &BoneContainer,
        arena: &EvaluationArena,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
    ) {
        if self.weights.is_empty() {
            out_pose.copy_from_slice(container.ref_pose());
            out_curves.reset();
            return;
        }

        let mut poses: Vec<&[BoneTransform]> = Vec::with_capacity(self.weights.len());
        let mut curves = Vec::with_capacity(self.weights.len());
        let mut weights = Vec::with_capacity(self.weights.len());

        for entry in &self.weights {
            let sample = &space.samples()[entry.sample_index];
            let pose = arena.alloc_pose(container.num_bones());
            let mut sample_curves = CurveBuffer::new(out_curves.uids().clone());

            source.evaluate(
                &sample.animation,
                self.sample_time(space, entry.sample_index),
                container,
                pose,
                &mut sample_curves,
            );

            poses.push(pose);
            curves.push(sample_curves);
            weights.push(entry.weight);
        }

        blend_many(&poses, &weights, out_pose);
        let curve_refs: Vec<&CurveBuffer> = curves.iter().collect();
        blend_many_curves(&curve_refs, &weights, out_curves);
    }
}
