//! Precision policies.
//!
//! Deterministic float ordering for sorting and keys, plus the clamping helper
//! every viewport setter goes through.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Clamp `v` into `[min, max]`, returning `None` for non-finite input.
///
/// Callers treat `None` as "keep the previous value"; out-of-range finite
/// values never fail.
pub fn clamp_finite(v: f64, min: f64, max: f64) -> Option<f64> {
    if !v.is_finite() {
        return None;
    }
    Some(canonical_f64(v.clamp(min, max)))
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, clamp_finite, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert!(canonical_f64(-0.0).is_sign_positive());
    }

    #[test]
    fn stable_cmp_is_total_and_deterministic() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
    }

    #[test]
    fn clamp_rejects_non_finite() {
        assert_eq!(clamp_finite(f64::NAN, 0.0, 1.0), None);
        assert_eq!(clamp_finite(f64::INFINITY, 0.0, 1.0), None);
        assert_eq!(clamp_finite(5.0, 0.0, 1.0), Some(1.0));
        assert_eq!(clamp_finite(-5.0, 0.0, 1.0), Some(0.0));
    }
}
