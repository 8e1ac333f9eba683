//! Weighted pose and curve blending.
//!
//! Rotations are averaged as weighted quaternion sums with hemisphere
//! correction and renormalized once at the end, never slerped. Two-way blends
//! copy an input verbatim when alpha is within [`ZERO_ANIM_WEIGHT_THRESH`] of
//! either end.
//!
//! Input lengths and curve UID lists are caller contracts checked with
//! `debug_assert!`; nothing here resizes a mismatched buffer.
//!
//! [`ZERO_ANIM_WEIGHT_THRESH`]: sinew_core::math::ZERO_ANIM_WEIGHT_THRESH

use sinew_core::BoneTransform;
use sinew_core::math::{is_weight_full, is_weight_zero};

use crate::curve::CurveBuffer;

// ============================================================================
// Poses
// ============================================================================

/// `out = lerp(a, b, alpha)` per bone.
pub fn blend_two(a: &[BoneTransform], b: &[BoneTransform], alpha: f32, out: &mut [BoneTransform]) {
    debug_assert_eq!(a.len(), b.len(), "blend inputs differ in length");
    debug_assert_eq!(a.len(), out.len(), "blend output differs in length");

    if is_weight_zero(alpha) {
        out.copy_from_slice(a);
    } else if is_weight_full(alpha) {
        out.copy_from_slice(b);
    } else {
        for ((dst, a), b) in out.iter_mut().zip(a).zip(b) {
            *dst = a.blend(b, alpha);
        }
    }
}

/// Blends `other` into `pose` in place.
pub fn lerp_in_place(pose: &mut [BoneTransform], other: &[BoneTransform], alpha: f32) {
    debug_assert_eq!(pose.len(), other.len(), "blend inputs differ in length");

    if is_weight_zero(alpha) {
        return;
    }
    if is_weight_full(alpha) {
        pose.copy_from_slice(other);
        return;
    }
    for (dst, src) in pose.iter_mut().zip(other) {
        *dst = dst.blend(src, alpha);
    }
}

/// Weighted sum of `poses`.
///
/// The first input overwrites `out` scaled by its weight, the others
/// accumulate onto it. Weights are used as given: callers pass weights that
/// already sum to one. Rotations are renormalized when more than one pose
/// contributes.
pub fn blend_many(poses: &[&[BoneTransform]], weights: &[f32], out: &mut [BoneTransform]) {
    debug_assert!(!poses.is_empty(), "blend_many needs at least one input");
    debug_assert_eq!(poses.len(), weights.len(), "one weight per pose");

    let Some((first, rest)) = poses.split_first() else {
        return;
    };
    debug_assert_eq!(first.len(), out.len(), "blend output differs in length");

    for (dst, src) in out.iter_mut().zip(first.iter()) {
        *dst = src.scaled(weights[0]);
    }
    for (pose, &weight) in rest.iter().zip(&weights[1..]) {
        accumulate(pose, weight, out);
    }
    if poses.len() > 1 {
        normalize_rotations(out);
    }
}

/// `into += pose * weight` without renormalizing.
pub fn accumulate(pose: &[BoneTransform], weight: f32, into: &mut [BoneTransform]) {
    debug_assert_eq!(pose.len(), into.len(), "blend inputs differ in length");
    for (dst, src) in into.iter_mut().zip(pose) {
        dst.accumulate_with_shortest_rotation(src, weight);
    }
}

pub fn normalize_rotations(pose: &mut [BoneTransform]) {
    for bone in pose {
        bone.normalize_rotation();
    }
}

// ============================================================================
// Curves
// ============================================================================

/// Per-UID linear interpolation, flags OR-combined.
pub fn blend_two_curves(a: &CurveBuffer, b: &CurveBuffer, alpha: f32, out: &mut CurveBuffer) {
    debug_assert!(a.shares_uids(b), "curve UID lists differ");
    debug_assert!(a.shares_uids(out), "curve UID lists differ");

    if is_weight_zero(alpha) {
        out.copy_from(a);
    } else if is_weight_full(alpha) {
        out.copy_from(b);
    } else {
        out.set_scaled(a, 1.0 - alpha);
        out.accumulate(b, alpha);
    }
}

/// Weighted sum of curve buffers, flags OR-combined.
pub fn blend_many_curves(curves: &[&CurveBuffer], weights: &[f32], out: &mut CurveBuffer) {
    debug_assert!(!curves.is_empty(), "blend_many_curves needs at least one input");
    debug_assert_eq!(curves.len(), weights.len(), "one weight per curve buffer");

    let Some((first, rest)) = curves.split_first() else {
        return;
    };
    out.set_scaled(first, weights[0]);
    for (curve, &weight) in rest.iter().zip(&weights[1..]) {
        out.accumulate(curve, weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn blend_two_fast_paths_copy_inputs() {
        let a = [BoneTransform::from_rotation(Quat::from_rotation_x(0.4))];
        let b = [BoneTransform::from_translation(Vec3::ONE)];
        let mut out = [BoneTransform::IDENTITY];

        blend_two(&a, &b, 0.0, &mut out);
        assert_eq!(out, a);
        blend_two(&a, &b, 1.0, &mut out);
        assert_eq!(out, b);
    }

    #[test]
    fn blend_many_single_input_is_not_normalized() {
        let a = [BoneTransform::from_translation(Vec3::X)];
        let mut out = [BoneTransform::IDENTITY];
        blend_many(&[&a], &[0.5], &mut out);
        assert_eq!(out[0].translation, Vec3::new(0.5, 0.0, 0.0));
        assert!((out[0].rotation.length() - 0.5).abs() < 1e-6);
    }
}
