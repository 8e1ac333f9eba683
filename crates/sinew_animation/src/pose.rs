use std::ops::{Deref, DerefMut};

use sinew_core::BoneTransform;

use crate::bone_container::BoneContainer;

/// Local-space transforms, one per compact bone of a [`BoneContainer`].
///
/// Dereferences to `[BoneTransform]`; every blend routine works on plain
/// slices so arena-allocated scratch poses and owned poses mix freely.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompactPose {
    bones: Vec<BoneTransform>,
}

impl CompactPose {
    /// Reference pose of the container.
    #[must_use]
    pub fn from_ref_pose(container: &BoneContainer) -> Self {
        Self {
            bones: container.ref_pose().to_vec(),
        }
    }

    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            bones: vec![BoneTransform::IDENTITY; len],
        }
    }

    #[must_use]
    pub fn from_transforms(bones: Vec<BoneTransform>) -> Self {
        Self { bones }
    }

    pub fn reset_to_ref_pose(&mut self, container: &BoneContainer) {
        self.bones.clear();
        self.bones.extend_from_slice(container.ref_pose());
    }

    pub fn reset_to_identity(&mut self) {
        self.bones.fill(BoneTransform::IDENTITY);
    }

    pub fn normalize_rotations(&mut self) {
        for bone in &mut self.bones {
            bone.normalize_rotation();
        }
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.bones.iter().all(BoneTransform::is_rotation_normalized)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.bones.iter().all(BoneTransform::is_finite)
    }

    #[must_use]
    pub fn into_transforms(self) -> Vec<BoneTransform> {
        self.bones
    }
}

impl Deref for CompactPose {
    type Target = [BoneTransform];

    fn deref(&self) -> &Self::Target {
        &self.bones
    }
}

impl DerefMut for CompactPose {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bones
    }
}

impl From<Vec<BoneTransform>> for CompactPose {
    fn from(bones: Vec<BoneTransform>) -> Self {
        Self { bones }
    }
}
