//! Numeric thresholds and scalar helpers shared by every blend operation.
//!
//! The thresholds are part of the evaluation contract: two-way blends select
//! their copy fast paths with [`ZERO_ANIM_WEIGHT_THRESH`] on both ends, so
//! changing the value changes which inputs produce bit-exact copies.

/// A blend input at or below this weight is treated as absent, and one at or
/// above `1.0 - ZERO_ANIM_WEIGHT_THRESH` as fully dominant.
pub const ZERO_ANIM_WEIGHT_THRESH: f32 = 1.0e-4;

/// Guard for lengths and ratios (bone lengths, retarget ratios).
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// Guard for divisions and normalizations.
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Returns `true` when `weight` selects the "first input only" fast path.
#[inline]
#[must_use]
pub fn is_weight_zero(weight: f32) -> bool {
    weight <= ZERO_ANIM_WEIGHT_THRESH
}

/// Returns `true` when `weight` selects the "second input only" fast path.
#[inline]
#[must_use]
pub fn is_weight_full(weight: f32) -> bool {
    weight >= 1.0 - ZERO_ANIM_WEIGHT_THRESH
}

/// Returns `true` when the weight is strictly between both fast paths.
#[inline]
#[must_use]
pub fn is_weight_relevant(weight: f32) -> bool {
    weight > ZERO_ANIM_WEIGHT_THRESH
}

/// Moves `current` toward `target` at a constant `speed` (units per second).
///
/// Snaps to `target` once the remaining distance is negligible. A
/// non-positive speed jumps straight to `target`.
#[must_use]
pub fn interp_constant_to(current: f32, target: f32, delta_time: f32, speed: f32) -> f32 {
    if speed <= 0.0 {
        return target;
    }

    let dist = target - current;
    if dist * dist < SMALL_NUMBER {
        return target;
    }

    let step = speed * delta_time;
    current + dist.clamp(-step, step)
}

/// `1 / value` with the near-zero guard used for scale ratios.
#[inline]
#[must_use]
pub fn safe_reciprocal(value: f32) -> f32 {
    if value.abs() <= SMALL_NUMBER {
        1.0
    } else {
        1.0 / value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_thresholds_are_symmetric() {
        assert!(is_weight_zero(0.0));
        assert!(is_weight_zero(ZERO_ANIM_WEIGHT_THRESH));
        assert!(!is_weight_zero(0.01));
        assert!(is_weight_full(1.0));
        assert!(is_weight_full(1.0 - ZERO_ANIM_WEIGHT_THRESH));
        assert!(!is_weight_full(0.99));
    }

    #[test]
    fn interp_constant_to_is_rate_limited() {
        let v = interp_constant_to(0.0, 1.0, 0.1, 2.0);
        assert!((v - 0.2).abs() < 1e-6);

        let v = interp_constant_to(1.0, 0.0, 0.1, 2.0);
        assert!((v - 0.8).abs() < 1e-6);

        // Overshoot clamps to the target
        assert_eq!(interp_constant_to(0.9, 1.0, 1.0, 2.0), 1.0);
        assert_eq!(interp_constant_to(0.3, 0.7, 0.1, 0.0), 0.7);
    }

    #[test]
    fn safe_reciprocal_guards_zero() {
        assert_eq!(safe_reciprocal(0.0), 1.0);
        assert_eq!(safe_reciprocal(2.0), 0.5);
    }
}
