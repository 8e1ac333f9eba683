use glam::{Affine3A, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{SMALL_NUMBER, safe_reciprocal};

/// Rigid bone transform (translation, unit rotation, non-uniform scale).
///
/// Composition follows glam's column convention: `parent.mul_transform(&local)`
/// yields the child's transform in the parent's space. Poses store transforms
/// local to the parent bone unless explicitly converted to component space.
///
/// Unlike a matrix, the quaternion part may temporarily be un-normalized
/// while a weighted sum is being accumulated; call
/// [`normalize_rotation`](Self::normalize_rotation) once accumulation ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY, Vec3::ONE)
    }

    #[must_use]
    pub const fn from_rotation(rotation: Quat) -> Self {
        Self::new(Vec3::ZERO, rotation, Vec3::ONE)
    }

    #[must_use]
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self::new(translation, rotation, Vec3::ONE)
    }

    /// Affine matrix for the rendering collaborator.
    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    #[inline]
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    // ========================================================================
    // Weighted accumulation
    // ========================================================================

    /// Every component multiplied by `weight` (the "overwrite" step of an
    /// N-way blend). The rotation is left un-normalized.
    #[inline]
    #[must_use]
    pub fn scaled(&self, weight: f32) -> Self {
        Self {
            translation: self.translation * weight,
            rotation: self.rotation * weight,
            scale: self.scale * weight,
        }
    }

    /// `self += other * weight`, flipping `other`'s rotation onto the same
    /// hemisphere as the running sum. The rotation is left un-normalized.
    #[inline]
    pub fn accumulate_with_shortest_rotation(&mut self, other: &Self, weight: f32) {
        let blend_rotation = other.rotation * weight;
        if self.rotation.dot(blend_rotation) >= 0.0 {
            self.rotation = self.rotation + blend_rotation;
        } else {
            self.rotation = self.rotation - blend_rotation;
        }
        self.translation += other.translation * weight;
        self.scale += other.scale * weight;
    }

    /// Linear blend toward `other` with a renormalized quaternion sum.
    #[must_use]
    pub fn blend(&self, other: &Self, alpha: f32) -> Self {
        let mut result = self.scaled(1.0 - alpha);
        result.accumulate_with_shortest_rotation(other, alpha);
        result.normalize_rotation();
        result
    }

    /// Renormalizes the rotation; a degenerate quaternion becomes identity.
    #[inline]
    pub fn normalize_rotation(&mut self) {
        self.rotation = normalize_quat(self.rotation);
    }

    #[inline]
    #[must_use]
    pub fn is_rotation_normalized(&self) -> bool {
        (self.rotation.length_squared() - 1.0).abs() < 1.0e-3
    }

    // ========================================================================
    // Space composition
    // ========================================================================

    /// Composes `self` (parent) with `local` (child relative to parent).
    #[must_use]
    pub fn mul_transform(&self, local: &Self) -> Self {
        Self {
            translation: self.rotation * (self.scale * local.translation) + self.translation,
            rotation: self.rotation * local.rotation,
            scale: self.scale * local.scale,
        }
    }

    /// The transform `x` such that `parent.mul_transform(&x) == self`.
    ///
    /// Near-zero parent scale components are treated as 1.0.
    #[must_use]
    pub fn relative_to(&self, parent: &Self) -> Self {
        let inv_scale = safe_scale_reciprocal(parent.scale);
        let inv_rotation = parent.rotation.inverse();
        Self {
            translation: (inv_rotation * (self.translation - parent.translation)) * inv_scale,
            rotation: inv_rotation * self.rotation,
            scale: self.scale * inv_scale,
        }
    }

    /// Inverse transform (exact for uniform scale).
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self::IDENTITY.relative_to(self)
    }

    #[inline]
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * (self.scale * point) + self.translation
    }

    #[inline]
    pub fn scale_translation(&mut self, factor: f32) {
        self.translation *= factor;
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    #[must_use]
    pub fn contains_nan(&self) -> bool {
        self.translation.is_nan() || self.rotation.is_nan() || self.scale.is_nan()
    }

    /// Component-wise comparison; rotations compare as orientations
    /// (`q` and `-q` are equal).
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
            && (self.rotation.abs_diff_eq(other.rotation, tolerance)
                || self.rotation.abs_diff_eq(-other.rotation, tolerance))
    }
}

/// Per-component `1 / scale` with a near-zero guard (1.0 for degenerate axes).
#[inline]
#[must_use]
pub fn safe_scale_reciprocal(scale: Vec3) -> Vec3 {
    Vec3::new(
        safe_reciprocal(scale.x),
        safe_reciprocal(scale.y),
        safe_reciprocal(scale.z),
    )
}

/// Normalizes a quaternion, falling back to identity when it has collapsed.
#[inline]
#[must_use]
pub fn normalize_quat(q: Quat) -> Quat {
    let len_sq = q.length_squared();
    if len_sq <= SMALL_NUMBER || !len_sq.is_finite() {
        Quat::IDENTITY
    } else {
        q * len_sq.sqrt().recip()
    }
}

/// Shortest-path linear quaternion interpolation without normalization.
#[inline]
#[must_use]
pub fn quat_fast_lerp(a: Quat, b: Quat, alpha: f32) -> Quat {
    let bias = if a.dot(b) >= 0.0 { 1.0 } else { -1.0 };
    b * (alpha * bias) + a * (1.0 - alpha)
}
