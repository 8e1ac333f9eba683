//! Conversions between local (parent-relative) and component space.

use glam::Affine3A;
use serde::{Deserialize, Serialize};
use sinew_core::BoneTransform;
use sinew_core::math::{is_weight_full, is_weight_zero};

use crate::bone_container::BoneContainer;
use crate::pose::CompactPose;

/// Frame a bone-controller transform is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoneSpace {
    /// Relative to the bone's own component transform
    Local,
    /// The whole skeleton's frame
    #[default]
    Component,
    /// Relative to the parent bone's component transform
    ParentBone,
}

/// Composes a local pose down the hierarchy into `out`.
pub fn fill_component_space(
    pose: &[BoneTransform],
    container: &BoneContainer,
    out: &mut [BoneTransform],
) {
    debug_assert_eq!(pose.len(), container.num_bones(), "pose does not match container");
    debug_assert_eq!(pose.len(), out.len(), "output does not match pose");

    for (bone, local) in pose.iter().enumerate() {
        out[bone] = match container.parent(bone) {
            Some(parent) => out[parent].mul_transform(local),
            None => *local,
        };
    }
}

/// Component-space transforms for the skinning collaborator.
#[must_use]
pub fn component_space_transforms(
    pose: &[BoneTransform],
    container: &BoneContainer,
) -> Vec<BoneTransform> {
    let mut out = vec![BoneTransform::IDENTITY; pose.len()];
    fill_component_space(pose, container, &mut out);
    out
}

/// Component-space matrices, one per compact bone.
#[must_use]
pub fn component_space_matrices(pose: &[BoneTransform], container: &BoneContainer) -> Vec<Affine3A> {
    component_space_transforms(pose, container)
        .iter()
        .map(BoneTransform::to_affine)
        .collect()
}

/// Expresses `transform`, given in `space` relative to `bone`, in component
/// space.
pub fn convert_to_component_space(
    cs_pose: &mut ComponentSpacePose<'_>,
    transform: &BoneTransform,
    bone: usize,
    space: BoneSpace,
) -> BoneTransform {
    match space {
        BoneSpace::Component => *transform,
        BoneSpace::Local => cs_pose.component_transform(bone).mul_transform(transform),
        BoneSpace::ParentBone => match cs_pose.container.parent(bone) {
            Some(parent) => cs_pose.component_transform(parent).mul_transform(transform),
            None => *transform,
        },
    }
}

/// Inverse of [`convert_to_component_space`].
pub fn convert_from_component_space(
    cs_pose: &mut ComponentSpacePose<'_>,
    transform: &BoneTransform,
    bone: usize,
    space: BoneSpace,
) -> BoneTransform {
    match space {
        BoneSpace::Component => *transform,
        BoneSpace::Local => transform.relative_to(&cs_pose.component_transform(bone)),
        BoneSpace::ParentBone => match cs_pose.container.parent(bone) {
            Some(parent) => transform.relative_to(&cs_pose.component_transform(parent)),
            None => *transform,
        },
    }
}

/// Local pose with lazily computed component-space transforms.
///
/// Component transforms are computed on first request and cached per bone.
/// Writing a bone invalidates the cached transforms of its descendants.
#[derive(Debug, Clone)]
pub struct ComponentSpacePose<'c> {
    container: &'c BoneContainer,
    local: CompactPose,
    component: Vec<BoneTransform>,
    computed: Vec<bool>,
}

impl<'c> ComponentSpacePose<'c> {
    #[must_use]
    pub fn new(container: &'c BoneContainer, local: CompactPose) -> Self {
        debug_assert_eq!(local.len(), container.num_bones(), "pose does not match container");
        let len = local.len();
        Self {
            container,
            local,
            component: vec![BoneTransform::IDENTITY; len],
            computed: vec![false; len],
        }
    }

    #[inline]
    #[must_use]
    pub fn container(&self) -> &'c BoneContainer {
        self.container
    }

    #[inline]
    #[must_use]
    pub fn local_pose(&self) -> &CompactPose {
        &self.local
    }

    #[must_use]
    pub fn to_local_pose(self) -> CompactPose {
        self.local
    }

    #[inline]
    #[must_use]
    pub fn local_transform(&self, bone: usize) -> BoneTransform {
        self.local[bone]
    }

    pub fn component_transform(&mut self, bone: usize) -> BoneTransform {
        if !self.computed[bone] {
            // Walk up to the nearest computed ancestor, then compose down
            let mut chain = Vec::new();
            let mut current = Some(bone);
            while let Some(b) = current {
                if self.computed[b] {
                    break;
                }
                chain.push(b);
                current = self.container.parent(b);
            }
            for &b in chain.iter().rev() {
                self.component[b] = match self.container.parent(b) {
                    Some(parent) => self.component[parent].mul_transform(&self.local[b]),
                    None => self.local[b],
                };
                self.computed[b] = true;
            }
        }
        self.component[bone]
    }

    /// Every component transform, computing the missing ones.
    pub fn component_transforms(&mut self) -> &[BoneTransform] {
        for bone in 0..self.local.len() {
            if !self.computed[bone] {
                self.component[bone] = match self.container.parent(bone) {
                    Some(parent) => self.component[parent].mul_transform(&self.local[bone]),
                    None => self.local[bone],
                };
                self.computed[bone] = true;
            }
        }
        &self.component
    }

    pub fn set_local(&mut self, bone: usize, transform: BoneTransform) {
        self.local[bone] = transform;
        self.invalidate_from(bone);
    }

    /// Sets `bone`'s component transform; descendants keep their local
    /// transforms and follow it.
    pub fn set_component_space(&mut self, bone: usize, transform: BoneTransform) {
        let local = match self.container.parent(bone) {
            Some(parent) => transform.relative_to(&self.component_transform(parent)),
            None => transform,
        };
        self.local[bone] = local;
        self.invalidate_from(bone);
        self.component[bone] = transform;
        self.computed[bone] = true;
    }

    /// Sets several component transforms at once.
    ///
    /// Entries are applied in ascending bone order, so a listed child is
    /// re-localized against its listed parent's new transform.
    pub fn safe_set_cs_transforms(&mut self, transforms: &[(usize, BoneTransform)]) {
        let mut sorted = transforms.to_vec();
        sorted.sort_by_key(|(bone, _)| *bone);
        for (bone, transform) in sorted {
            self.set_component_space(bone, transform);
        }
    }

    /// Blends component-space targets into the pose in local space.
    ///
    /// Each target is first localized against its parent's target (when the
    /// parent is listed too) or current component transform, then blended
    /// with the existing local transform by `alpha`.
    pub fn local_blend_cs_transforms(&mut self, transforms: &[(usize, BoneTransform)], alpha: f32) {
        if is_weight_zero(alpha) {
            return;
        }
        if is_weight_full(alpha) {
            self.safe_set_cs_transforms(transforms);
            return;
        }

        let mut sorted = transforms.to_vec();
        sorted.sort_by_key(|(bone, _)| *bone);

        let mut locals = Vec::with_capacity(sorted.len());
        for &(bone, transform) in &sorted {
            let local = match self.container.parent(bone) {
                Some(parent) => {
                    let parent_cs = sorted
                        .iter()
                        .find(|(b, _)| *b == parent)
                        .map_or_else(|| self.component_transform(parent), |(_, t)| *t);
                    transform.relative_to(&parent_cs)
                }
                None => transform,
            };
            locals.push((bone, local));
        }

        for (bone, local) in locals {
            let blended = self.local[bone].blend(&local, alpha);
            self.set_local(bone, blended);
        }
    }

    fn invalidate_from(&mut self, bone: usize) {
        self.computed[bone] = false;
        for b in bone + 1..self.local.len() {
            // Ascending order: an invalidated parent is always seen first
            if let Some(parent) = self.container.parent(b)
                && !self.computed[parent]
            {
                self.computed[b] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{BoneDesc, Skeleton};
    use glam::{Quat, Vec3};
    use std::sync::Arc;

    fn container() -> BoneContainer {
        let skeleton = Skeleton::from_bones(
            "arm",
            vec![
                BoneDesc::new("root", None, BoneTransform::IDENTITY),
                BoneDesc::new("upper", Some(0), BoneTransform::from_translation(Vec3::X)),
                BoneDesc::new("lower", Some(1), BoneTransform::from_translation(Vec3::X)),
                BoneDesc::new("side", Some(0), BoneTransform::from_translation(Vec3::Z)),
            ],
        )
        .unwrap();
        BoneContainer::full(Arc::new(skeleton))
    }

    #[test]
    fn lazy_component_matches_eager() {
        let container = container();
        let pose = CompactPose::from_ref_pose(&container);
        let eager = component_space_transforms(&pose, &container);

        let mut cs = ComponentSpacePose::new(&container, pose);
        assert_eq!(cs.component_transform(2), eager[2]);
        assert_eq!(cs.component_transforms(), eager.as_slice());
    }

    #[test]
    fn children_follow_parent_set_in_component_space() {
        let container = container();
        let mut cs = ComponentSpacePose::new(&container, CompactPose::from_ref_pose(&container));

        let lifted = BoneTransform::from_translation(Vec3::new(1.0, 5.0, 0.0));
        cs.set_component_space(1, lifted);

        let lower = cs.component_transform(2);
        assert!((lower.translation - Vec3::new(2.0, 5.0, 0.0)).length() < 1e-5);
        // Sibling branch untouched
        assert_eq!(cs.component_transform(3).translation, Vec3::Z);
    }

    #[test]
    fn space_conversions_round_trip() {
        let container = container();
        let mut cs = ComponentSpacePose::new(&container, CompactPose::from_ref_pose(&container));
        let offset = BoneTransform::from_rotation(Quat::from_rotation_y(0.5));

        for space in [BoneSpace::Local, BoneSpace::Component, BoneSpace::ParentBone] {
            let component = convert_to_component_space(&mut cs, &offset, 2, space);
            let back = convert_from_component_space(&mut cs, &component, 2, space);
            assert!(back.approx_eq(&offset, 1e-5), "{space:?}");
        }
    }

    #[test]
    fn local_blend_half_way() {
        let container = container();
        let mut cs = ComponentSpacePose::new(&container, CompactPose::from_ref_pose(&container));
        let target = BoneTransform::from_translation(Vec3::new(3.0, 0.0, 0.0));

        cs.local_blend_cs_transforms(&[(1, target)], 0.5);
        let local = cs.local_transform(1);
        assert!((local.translation - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }
}
