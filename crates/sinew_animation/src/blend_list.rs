//! Blend lists: cross-fading between children by selection.
//!
//! What picks the active child (a bool, an index, an enum value) is a
//! [`ActiveChildSelector`] policy; [`BlendList`] only owns the weights and
//! their ramps.

use sinew_core::BoneTransform;
use sinew_core::math::is_weight_relevant;
use smallvec::SmallVec;

use crate::arena::EvaluationArena;
use crate::blend::{blend_many, blend_many_curves};
use crate::bone_container::BoneContainer;
use crate::curve::CurveBuffer;
use crate::playback::tick_blend_weight;

/// Picks which child of a blend list is active.
pub trait ActiveChildSelector {
    /// Index of the active child; values past the end are clamped.
    fn active_child(&self, child_count: usize) -> usize;
}

/// `true` selects child 0, `false` child 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolSelector {
    pub value: bool,
}

impl ActiveChildSelector for BoolSelector {
    fn active_child(&self, _child_count: usize) -> usize {
        usize::from(!self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSelector {
    pub index: usize,
}

impl ActiveChildSelector for IndexSelector {
    fn active_child(&self, _child_count: usize) -> usize {
        self.index
    }
}

/// Selects the child at the enum value's discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumSelector<E> {
    pub value: E,
}

impl<E: Copy + Into<usize>> ActiveChildSelector for EnumSelector<E> {
    fn active_child(&self, _child_count: usize) -> usize {
        self.value.into()
    }
}

/// Per-child weights ramping toward the selected child.
#[derive(Debug, Clone)]
pub struct BlendList {
    weights: Vec<f32>,
    remaining: Vec<f32>,
    blend_times: Vec<f32>,
    active: Option<usize>,
}

impl BlendList {
    /// One child per blend time: the seconds it takes that child to fade in.
    #[must_use]
    pub fn new(blend_times: Vec<f32>) -> Self {
        let count = blend_times.len();
        Self {
            weights: vec![0.0; count],
            remaining: vec![0.0; count],
            blend_times,
            active: None,
        }
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.blend_times.len()
    }

    #[must_use]
    pub fn active_child(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Reads the selector and advances the ramps by `delta_time`.
    ///
    /// The first update snaps to the selected child. A later change starts a
    /// cross-fade lasting the new child's blend time.
    pub fn update<S: ActiveChildSelector + ?Sized>(&mut self, selector: &S, delta_time: f32) {
        let count = self.child_count();
        if count == 0 {
            return;
        }
        let active = selector.active_child(count).min(count - 1);

        match self.active {
            None => {
                self.weights.fill(0.0);
                self.weights[active] = 1.0;
                self.remaining.fill(0.0);
                self.active = Some(active);
                return;
            }
            Some(previous) if previous != active => {
                log::debug!("Blend list switched from child {previous} to {active}");
                self.remaining.fill(self.blend_times[active]);
                self.active = Some(active);
            }
            Some(_) => {}
        }

        for (child, (weight, remaining)) in self
            .weights
            .iter_mut()
            .zip(self.remaining.iter_mut())
            .enumerate()
        {
            let desired = if child == active { 1.0 } else { 0.0 };
            tick_blend_weight(delta_time, desired, weight, remaining);
        }
    }

    /// Children above the weight threshold, weights renormalized to sum to 1.
    #[must_use]
    pub fn relevant_children(&self) -> SmallVec<[(usize, f32); 4]> {
        let mut relevant: SmallVec<[(usize, f32); 4]> = self
            .weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| is_weight_relevant(w))
            .map(|(i, &w)| (i, w))
            .collect();

        let total: f32 = relevant.iter().map(|&(_, w)| w).sum();
        if total > 0.0 {
            for (_, weight) in &mut relevant {
                *weight /= total;
            }
        }
        relevant
    }

    /// Blends already evaluated child poses (one per child).
    pub fn evaluate(&self, children: &[&[BoneTransform]], out: &mut [BoneTransform]) {
        debug_assert_eq!(children.len(), self.child_count(), "one pose per child");

        let relevant = self.relevant_children();
        if relevant.is_empty() {
            if let Some(first) = children.first() {
                out.copy_from_slice(first);
            }
            return;
        }

        let poses: SmallVec<[&[BoneTransform]; 4]> = relevant.iter().map(|&(i, _)| children[i]).collect();
        let weights: SmallVec<[f32; 4]> = relevant.iter().map(|&(_, w)| w).collect();
        blend_many(&poses, &weights, out);
    }

    /// Evaluates only the relevant children through `evaluate_child` into
    /// arena scratch poses, then blends them.
    pub fn evaluate_with<F>(
        &self,
        container: &BoneContainer,
        arena: &EvaluationArena,
        out_pose: &mut [BoneTransform],
        out_curves: &mut CurveBuffer,
        mut evaluate_child: F,
    ) where
        F: FnMut(usize, &mut [BoneTransform], &mut CurveBuffer),
    {
        let relevant = self.relevant_children();
        if relevant.is_empty() {
            out_pose.copy_from_slice(container.ref_pose());
            out_curves.reset();
            return;
        }

        let mut poses: SmallVec<[&[BoneTransform]; 4]> = SmallVec::new();
        let mut curves: SmallVec<[CurveBuffer; 4]> = SmallVec::new();
        let mut weights: SmallVec<[f32; 4]> = SmallVec::new();

        for &(child, weight) in &relevant {
            let pose = arena.alloc_ref_pose(container);
            let mut child_curves = CurveBuffer::new(out_curves.uids().clone());
            evaluate_child(child, &mut *pose, &mut child_curves);

            poses.push(pose);
            curves.push(child_curves);
            weights.push(weight);
        }

        blend_many(&poses, &weights, out_pose);
        let curve_refs: SmallVec<[&CurveBuffer; 4]> = curves.iter().collect();
        blend_many_curves(&curve_refs, &weights, out_curves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Stance {
        Standing,
        Crouching,
    }

    impl From<Stance> for usize {
        fn from(stance: Stance) -> Self {
            stance as usize
        }
    }

    #[test]
    fn first_update_snaps() {
        let mut list = BlendList::new(vec![0.2, 0.2]);
        list.update(&BoolSelector { value: false }, 0.016);
        assert_eq!(list.weights(), &[0.0, 1.0]);
    }

    #[test]
    fn switch_ramps_over_blend_time() {
        let mut list = BlendList::new(vec![0.5, 0.5]);
        let mut selector = EnumSelector { value: Stance::Standing };
        list.update(&selector, 0.0);

        selector.value = Stance::Crouching;
        list.update(&selector, 0.25);
        assert!((list.weights()[1] - 0.5).abs() < 1e-5);
        assert!((list.weights()[0] - 0.5).abs() < 1e-5);

        list.update(&selector, 0.25);
        assert_eq!(list.weights(), &[0.0, 1.0]);
        assert_eq!(list.relevant_children().as_slice(), &[(1, 1.0)]);
    }

    #[test]
    fn index_is_clamped() {
        let mut list = BlendList::new(vec![0.0; 3]);
        list.update(&IndexSelector { index: 7 }, 0.1);
        assert_eq!(list.active_child(), Some(2));
    }
}
