/// Normalize an angle in degrees into `[0, 360)`.
///
/// Returns `None` for non-finite input.
pub fn wrap_degrees(deg: f64) -> Option<f64> {
    if !deg.is_finite() {
        return None;
    }
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { Some(0.0) } else { Some(wrapped + 0.0) }
}

#[cfg(test)]
mod tests {
    use super::wrap_degrees;

    #[test]
    fn wraps_both_directions() {
        assert_eq!(wrap_degrees(370.0), Some(10.0));
        assert_eq!(wrap_degrees(-15.0), Some(345.0));
        assert_eq!(wrap_degrees(360.0), Some(0.0));
        assert_eq!(wrap_degrees(0.0), Some(0.0));
    }

    #[test]
    fn tiny_negative_stays_below_360() {
        let w = wrap_degrees(-1e-17).unwrap();
        assert!((0.0..360.0).contains(&w));
    }

    #[test]
    fn rejects_nan() {
        assert_eq!(wrap_degrees(f64::NAN), None);
    }
}
