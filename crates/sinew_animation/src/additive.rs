//! Additive poses: deltas extracted from a base pose and layered back onto
//! arbitrary bases at a weight.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use sinew_core::BoneTransform;
use sinew_core::math::is_weight_zero;
use sinew_core::transform::{normalize_quat, quat_fast_lerp, safe_scale_reciprocal};

use crate::bone_container::BoneContainer;
use crate::curve::CurveBuffer;
use crate::pose::CompactPose;

/// How an additive rotation delta is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdditiveMode {
    /// Delta relative to each bone's local rotation
    #[default]
    LocalSpace,
    /// Delta is a component-space rotation offset
    MeshSpaceRotation,
}

/// Pose whose every bone is the identity delta.
#[must_use]
pub fn identity_additive(len: usize) -> CompactPose {
    CompactPose::identity(len)
}

/// Local-space delta turning `base` into `target`.
///
/// Translation is a difference, rotation `base⁻¹ ⊗ target`, scale a
/// per-component ratio (a near-zero base scale counts as 1).
pub fn to_additive(target: &[BoneTransform], base: &[BoneTransform], out: &mut [BoneTransform]) {
    debug_assert_eq!(target.len(), base.len(), "additive inputs differ in length");
    debug_assert_eq!(target.len(), out.len(), "additive output differs in length");

    for ((dst, t), b) in out.iter_mut().zip(target).zip(base) {
        *dst = BoneTransform {
            translation: t.translation - b.translation,
            rotation: normalize_quat(b.rotation.inverse() * t.rotation),
            scale: t.scale * safe_scale_reciprocal(b.scale),
        };
    }
}

/// Delta whose rotations are component-space offsets
/// (`target_cs ⊗ base_cs⁻¹`), for [`AdditiveMode::MeshSpaceRotation`].
/// Translation and scale are local, as in [`to_additive`].
pub fn to_mesh_rotation_additive(
    target: &[BoneTransform],
    base: &[BoneTransform],
    container: &BoneContainer,
    out: &mut [BoneTransform],
) {
    to_additive(target, base, out);

    let target_cs = component_rotations(target, container);
    let base_cs = component_rotations(base, container);
    for ((dst, t), b) in out.iter_mut().zip(&target_cs).zip(&base_cs) {
        dst.rotation = normalize_quat(*t * b.inverse());
    }
}

/// Layers `delta` onto `base` in place.
///
/// A weight at or below the zero-weight threshold leaves `base` untouched.
pub fn accumulate_additive(
    base: &mut [BoneTransform],
    delta: &[BoneTransform],
    weight: f32,
    mode: AdditiveMode,
    container: &BoneContainer,
) {
    debug_assert_eq!(base.len(), delta.len(), "additive inputs differ in length");

    if is_weight_zero(weight) {
        return;
    }

    match mode {
        AdditiveMode::LocalSpace => {
            for (b, d) in base.iter_mut().zip(delta) {
                let rotation = quat_fast_lerp(Quat::IDENTITY, d.rotation, weight);
                b.rotation = normalize_quat(b.rotation * normalize_quat(rotation));
                accumulate_translation_scale(b, d, weight);
            }
        }
        AdditiveMode::MeshSpaceRotation => {
            let base_cs = component_rotations(base, container);
            let mut result_cs = vec![Quat::IDENTITY; base.len()];

            for (bone, (b, d)) in base.iter_mut().zip(delta).enumerate() {
                let offset = normalize_quat(quat_fast_lerp(Quat::IDENTITY, d.rotation, weight));
                result_cs[bone] = normalize_quat(offset * base_cs[bone]);

                b.rotation = match container.parent(bone) {
                    Some(parent) => result_cs[parent].inverse() * result_cs[bone],
                    None => result_cs[bone],
                };
                accumulate_translation_scale(b, d, weight);
            }

            for b in base.iter_mut() {
                b.normalize_rotation();
            }
        }
    }
}

fn accumulate_translation_scale(base: &mut BoneTransform, delta: &BoneTransform, weight: f32) {
    base.translation += delta.translation * weight;
    base.scale *= Vec3::ONE.lerp(delta.scale, weight);
}

fn component_rotations(pose: &[BoneTransform], container: &BoneContainer) -> Vec<Quat> {
    let mut rotations: Vec<Quat> = Vec::with_capacity(pose.len());
    for (bone, local) in pose.iter().enumerate() {
        let rotation = match container.parent(bone) {
            Some(parent) => rotations[parent] * local.rotation,
            None => local.rotation,
        };
        rotations.push(rotation);
    }
    rotations
}

// ============================================================================
// Curves
// ============================================================================

/// `out = target - base` per curve.
pub fn to_additive_curves(target: &CurveBuffer, base: &CurveBuffer, out: &mut CurveBuffer) {
    debug_assert!(target.shares_uids(base), "curve UID lists differ");
    out.set_scaled(target, 1.0);
    out.accumulate(base, -1.0);
}

/// `base += delta * weight`; no-op below the zero-weight threshold.
pub fn accumulate_additive_curves(base: &mut CurveBuffer, delta: &CurveBuffer, weight: f32) {
    if is_weight_zero(weight) {
        return;
    }
    base.accumulate(delta, weight);
}
