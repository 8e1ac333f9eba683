//! Retargeting: playing a pose authored on one skeleton on another.
//!
//! Bones are matched by name. Rotations are corrected in component space by
//! the difference between both reference poses; translations follow a
//! per-bone [`TranslationRetargetMode`].

use std::sync::Arc;

use glam::Quat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sinew_core::math::KINDA_SMALL_NUMBER;
use sinew_core::transform::{normalize_quat, safe_scale_reciprocal};
use sinew_core::{BoneTransform, Result, SinewError};

use crate::bone_container::BoneContainer;
use crate::curve::{CurveBuffer, CurveUid};
use crate::skeleton::Skeleton;
use crate::space::fill_component_space;

/// How a target bone's translation is derived from the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TranslationRetargetMode {
    /// Animated translation as authored
    #[default]
    Animation,
    /// Target skeleton's reference translation
    Skeleton,
    /// Animated translation scaled by the ratio of reference bone lengths
    AnimationScaled,
    /// Animated offset from the source reference, applied to the target
    /// reference (rotation, translation and scale)
    AnimationRelative,
}

/// Per-bone translation policies of a target skeleton.
///
/// A mode set on a bone applies to its whole branch unless a descendant
/// overrides it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetargetProfile {
    #[serde(default)]
    pub bone_modes: FxHashMap<String, TranslationRetargetMode>,
}

impl RetargetProfile {
    #[must_use]
    pub fn with_mode(mut self, bone_name: &str, mode: TranslationRetargetMode) -> Self {
        self.bone_modes.insert(bone_name.to_string(), mode);
        self
    }

    /// Resolved mode of every bone of `skeleton`, inheritance applied.
    #[must_use]
    pub fn resolve(&self, skeleton: &Skeleton) -> Vec<TranslationRetargetMode> {
        for name in self.bone_modes.keys() {
            if skeleton.find_bone(name).is_none() {
                log::warn!(
                    "Retarget profile names bone '{name}' missing from skeleton '{}'",
                    skeleton.name()
                );
            }
        }

        let mut modes: Vec<TranslationRetargetMode> = Vec::with_capacity(skeleton.num_bones());
        for bone in 0..skeleton.num_bones() {
            let inherited = skeleton.parent(bone).map(|p| modes[p]).unwrap_or_default();
            let mode = self
                .bone_modes
                .get(skeleton.bone_name(bone))
                .copied()
                .unwrap_or(inherited);
            modes.push(mode);
        }
        modes
    }
}

/// Name-based bone index translation between two skeletons.
#[derive(Debug, Clone)]
pub struct BoneMapping {
    source_to_target: Vec<Option<usize>>,
    target_to_source: Vec<Option<usize>>,
}

impl BoneMapping {
    /// Matches bones by name.
    ///
    /// Every shared bone must have the same parent name on both sides (roots
    /// on both sides), and at least one bone must be shared.
    pub fn between(source: &Skeleton, target: &Skeleton) -> Result<Self> {
        let mut source_to_target = vec![None; source.num_bones()];
        let mut target_to_source = vec![None; target.num_bones()];
        let mut mapped = 0;

        for bone in 0..source.num_bones() {
            let name = source.bone_name(bone);
            let Some(target_bone) = target.find_bone(name) else {
                continue;
            };

            let source_parent = source.parent(bone).map(|p| source.bone_name(p));
            let target_parent = target.parent(target_bone).map(|p| target.bone_name(p));
            if source_parent != target_parent {
                return Err(SinewError::incompatible(
                    source.name(),
                    target.name(),
                    format!(
                        "bone '{name}' has parent {} on the source and {} on the target",
                        describe_parent(source_parent),
                        describe_parent(target_parent)
                    ),
                ));
            }

            source_to_target[bone] = Some(target_bone);
            target_to_source[target_bone] = Some(bone);
            mapped += 1;
        }

        if mapped == 0 {
            return Err(SinewError::incompatible(
                source.name(),
                target.name(),
                "no bone names in common",
            ));
        }

        Ok(Self {
            source_to_target,
            target_to_source,
        })
    }

    #[inline]
    #[must_use]
    pub fn target_bone(&self, source_bone: usize) -> Option<usize> {
        self.source_to_target.get(source_bone).copied().flatten()
    }

    #[inline]
    #[must_use]
    pub fn source_bone(&self, target_bone: usize) -> Option<usize> {
        self.target_to_source.get(target_bone).copied().flatten()
    }

    /// Number of bones present on both sides.
    #[must_use]
    pub fn mapped_count(&self) -> usize {
        self.target_to_source.iter().filter(|b| b.is_some()).count()
    }
}

fn describe_parent(parent: Option<&str>) -> String {
    parent.map_or_else(|| "<root>".to_string(), |name| format!("'{name}'"))
}

/// Converts poses of a source skeleton to a target skeleton.
///
/// Immutable after construction; share one per skeleton pair.
#[derive(Debug)]
pub struct Retargeter {
    source: Arc<Skeleton>,
    target: Arc<Skeleton>,
    source_container: BoneContainer,
    mapping: BoneMapping,

    // Per target skeleton bone
    modes: Vec<TranslationRetargetMode>,
    rotation_offsets: Vec<Quat>,

    // Indexed by source curve uid
    curve_map: Vec<Option<CurveUid>>,
}

impl Retargeter {
    pub fn new(source: Arc<Skeleton>, target: Arc<Skeleton>, profile: &RetargetProfile) -> Result<Self> {
        let mapping = BoneMapping::between(&source, &target)?;
        let modes = profile.resolve(&target);

        let rotation_offsets = (0..target.num_bones())
            .map(|target_bone| match mapping.source_bone(target_bone) {
                Some(source_bone) => {
                    let source_cs = source.component_ref_pose()[source_bone].rotation;
                    let target_cs = target.component_ref_pose()[target_bone].rotation;
                    normalize_quat(source_cs.inverse() * target_cs)
                }
                None => Quat::IDENTITY,
            })
            .collect();

        let curve_map = source
            .curves()
            .uids()
            .iter()
            .map(|&uid| {
                source
                    .curves()
                    .name(uid)
                    .and_then(|name| target.curves().uid(name))
            })
            .collect();

        log::debug!(
            "Retargeter '{}' -> '{}': {} of {} target bones mapped",
            source.name(),
            target.name(),
            mapping.mapped_count(),
            target.num_bones()
        );

        Ok(Self {
            source_container: BoneContainer::full(Arc::clone(&source)),
            source,
            target,
            mapping,
            modes,
            rotation_offsets,
            curve_map,
        })
    }

    #[must_use]
    pub fn source(&self) -> &Arc<Skeleton> {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &Arc<Skeleton> {
        &self.target
    }

    /// Full-skeleton container of the source, for sampling source poses.
    #[must_use]
    pub fn source_container(&self) -> &BoneContainer {
        &self.source_container
    }

    #[must_use]
    pub fn mapping(&self) -> &BoneMapping {
        &self.mapping
    }

    #[must_use]
    pub fn mode(&self, target_bone: usize) -> TranslationRetargetMode {
        self.modes.get(target_bone).copied().unwrap_or_default()
    }

    /// Applies the translation and scale policy of `target_bone` to one
    /// animated source transform.
    ///
    /// `AnimationRelative` also corrects the rotation. For the other modes
    /// the rotation is returned as animated; [`retarget_pose`](Self::retarget_pose)
    /// corrects it in component space.
    #[must_use]
    pub fn retarget_transform(&self, target_bone: usize, animated: &BoneTransform) -> BoneTransform {
        let Some(source_bone) = self.mapping.source_bone(target_bone) else {
            return self.target.ref_pose()[target_bone];
        };
        let source_ref = &self.source.ref_pose()[source_bone];
        let target_ref = &self.target.ref_pose()[target_bone];

        let mut result = *animated;
        match self.mode(target_bone) {
            TranslationRetargetMode::Animation => {}
            TranslationRetargetMode::Skeleton => {
                result.translation = target_ref.translation;
            }
            TranslationRetargetMode::AnimationScaled => {
                let source_length = source_ref.translation.length();
                if source_length > KINDA_SMALL_NUMBER {
                    result.translation *= target_ref.translation.length() / source_length;
                }
            }
            TranslationRetargetMode::AnimationRelative => {
                result.rotation =
                    normalize_quat(animated.rotation * source_ref.rotation.inverse() * target_ref.rotation);
                result.translation =
                    animated.translation + (target_ref.translation - source_ref.translation);
                result.scale = animated.scale * target_ref.scale * safe_scale_reciprocal(source_ref.scale);
            }
        }
        result
    }

    /// Retargets a source pose onto the target container's bones.
    ///
    /// Target bones without a source counterpart, or whose source bone is
    /// not in `source_container`, take the target reference pose.
    pub fn retarget_pose(
        &self,
        source_pose: &[BoneTransform],
        source_container: &BoneContainer,
        target_container: &BoneContainer,
        out: &mut [BoneTransform],
    ) {
        debug_assert_eq!(
            source_container.skeleton().id(),
            self.source.id(),
            "source container belongs to another skeleton"
        );
        debug_assert_eq!(
            target_container.skeleton().id(),
            self.target.id(),
            "target container belongs to another skeleton"
        );
        debug_assert_eq!(out.len(), target_container.num_bones(), "output does not match container");

        let mut source_cs = vec![BoneTransform::IDENTITY; source_pose.len()];
        fill_component_space(source_pose, source_container, &mut source_cs);

        // Component rotations of the output, built parent first
        let mut out_cs_rotations = vec![Quat::IDENTITY; out.len()];

        for compact in 0..out.len() {
            let target_bone = target_container.skeleton_index(compact);
            let parent_cs = target_container
                .parent(compact)
                .map_or(Quat::IDENTITY, |parent| out_cs_rotations[parent]);

            let source_compact = self
                .mapping
                .source_bone(target_bone)
                .and_then(|source_bone| source_container.compact_index(source_bone));

            let local = match source_compact {
                None => target_container.ref_pose()[compact],
                Some(source_compact) => {
                    let mut local = self.retarget_transform(target_bone, &source_pose[source_compact]);
                    if self.mode(target_bone) != TranslationRetargetMode::AnimationRelative {
                        let cs_rotation =
                            source_cs[source_compact].rotation * self.rotation_offsets[target_bone];
                        local.rotation = normalize_quat(parent_cs.inverse() * cs_rotation);
                    }
                    local
                }
            };

            out_cs_rotations[compact] = parent_cs * local.rotation;
            out[compact] = local;
        }
    }

    /// Copies curves whose name exists on the target; others are dropped.
    pub fn retarget_curves(&self, source: &CurveBuffer, out: &mut CurveBuffer) {
        out.reset();
        for (index, uid) in source.uids().iter().enumerate() {
            if let Some(Some(target_uid)) = self.curve_map.get(uid.0 as usize) {
                out.set(*target_uid, source.values()[index], source.flags()[index]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::skeleton::BoneDesc;

    fn skeleton(name: &str, bones: &[(&str, Option<usize>, Vec3)]) -> Arc<Skeleton> {
        let descs = bones
            .iter()
            .map(|(bone, parent, t)| BoneDesc::new(bone, *parent, BoneTransform::from_translation(*t)))
            .collect();
        Arc::new(Skeleton::from_bones(name, descs).unwrap())
    }

    #[test]
    fn profile_modes_are_inherited() {
        let target = skeleton(
            "b",
            &[
                ("root", None, Vec3::ZERO),
                ("hips", Some(0), Vec3::Y),
                ("spine", Some(1), Vec3::Y),
            ],
        );
        let profile = RetargetProfile::default()
            .with_mode("hips", TranslationRetargetMode::Skeleton)
            .with_mode("spine", TranslationRetargetMode::AnimationScaled);
        let modes = profile.resolve(&target);
        assert_eq!(modes[0], TranslationRetargetMode::Animation);
        assert_eq!(modes[1], TranslationRetargetMode::Skeleton);
        assert_eq!(modes[2], TranslationRetargetMode::AnimationScaled);
    }

    #[test]
    fn mismatched_parents_are_incompatible() {
        let a = skeleton("a", &[("root", None, Vec3::ZERO), ("arm", Some(0), Vec3::X)]);
        let b = skeleton(
            "b",
            &[
                ("root", None, Vec3::ZERO),
                ("spine", Some(0), Vec3::Y),
                ("arm", Some(1), Vec3::X),
            ],
        );
        assert!(matches!(
            BoneMapping::between(&a, &b),
            Err(SinewError::IncompatibleSkeletons { .. })
        ));
    }

    #[test]
    fn scaled_translation_uses_reference_lengths() {
        let a = skeleton("a", &[("root", None, Vec3::ZERO), ("leg", Some(0), Vec3::new(0.0, 2.0, 0.0))]);
        let b = skeleton("b", &[("root", None, Vec3::ZERO), ("leg", Some(0), Vec3::new(0.0, 3.0, 0.0))]);
        let profile = RetargetProfile::default().with_mode("leg", TranslationRetargetMode::AnimationScaled);
        let retargeter = Retargeter::new(a, b, &profile).unwrap();

        let animated = BoneTransform::from_translation(Vec3::new(0.0, 4.0, 0.0));
        let result = retargeter.retarget_transform(1, &animated);
        assert!((result.translation.y - 6.0).abs() < 1e-5);
    }
}
