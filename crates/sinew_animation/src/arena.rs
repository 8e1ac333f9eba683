use bumpalo::Bump;
use glam::Quat;
use sinew_core::BoneTransform;

use crate::bone_container::BoneContainer;

/// Scratch memory for one evaluation chain.
///
/// Intermediate poses of a tick are bump-allocated here and released all at
/// once by [`reset`](Self::reset). The arena is owned by whoever drives the
/// chain and passed down explicitly; it is not `Sync`, so two chains can never
/// share one.
#[derive(Debug, Default)]
pub struct EvaluationArena {
    bump: Bump,
}

impl EvaluationArena {
    #[must_use]
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: Bump::with_capacity(bytes),
        }
    }

    /// Identity-filled scratch pose.
    pub fn alloc_pose(&self, len: usize) -> &mut [BoneTransform] {
        self.bump.alloc_slice_fill_copy(len, BoneTransform::IDENTITY)
    }

    /// Scratch copy of the container's reference pose.
    pub fn alloc_ref_pose(&self, container: &BoneContainer) -> &mut [BoneTransform] {
        self.bump.alloc_slice_copy(container.ref_pose())
    }

    pub fn alloc_copy(&self, pose: &[BoneTransform]) -> &mut [BoneTransform] {
        self.bump.alloc_slice_copy(pose)
    }

    /// Identity-filled scratch rotations.
    pub fn alloc_rotations(&self, len: usize) -> &mut [Quat] {
        self.bump.alloc_slice_fill_copy(len, Quat::IDENTITY)
    }

    /// Scratch weights, zero-filled.
    pub fn alloc_weights(&self, len: usize) -> &mut [f32] {
        self.bump.alloc_slice_fill_copy(len, 0.0)
    }

    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Releases every scratch allocation; call between ticks.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}
