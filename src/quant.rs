//! Normalisation helpers used for coordinate scaling and for squeezing
//! point attributes into payload bytes.

/// Scale a value between 0 and 1, clamping outside `[lo, hi]`.
///
/// The high test comes first, so a degenerate range (`lo == hi`) maps
/// everything to 1 instead of dividing by zero.
pub fn normalize(v: f64, lo: f64, hi: f64) -> f64 {
    if v >= hi {
        1.
    } else if v <= lo {
        0.
    } else {
        (v - lo) / (hi - lo)
    }
}

/// Element-wise [normalize] with the same clamp semantics.
pub fn normalize_all(vals: &[f64], lo: f64, hi: f64) -> Vec<f64> {
    vals.iter().map(|&v| normalize(v, lo, hi)).collect()
}

/// Map a value into a payload byte, 0 at `lo` and 255 at `hi`.
pub fn to_byte(v: f64, lo: f64, hi: f64) -> u8 {
    (normalize(v, lo, hi) * 255.).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_both_ends() {
        assert_eq!(normalize(-1., 0., 10.), 0.);
        assert_eq!(normalize(0., 0., 10.), 0.);
        assert_eq!(normalize(10., 0., 10.), 1.);
        assert_eq!(normalize(11., 0., 10.), 1.);
        assert_eq!(normalize(2.5, 0., 10.), 0.25);
    }

    #[test]
    fn degenerate_range_maps_to_one() {
        assert_eq!(normalize(5., 5., 5.), 1.);
        assert_eq!(normalize(4., 5., 5.), 0.);
    }

    #[test]
    fn normalize_all_matches_scalar() {
        let vals = [-2., 0., 5., 10., 12.];
        let normed = normalize_all(&vals, 0., 10.);
        for (v, n) in vals.iter().zip(&normed) {
            assert_eq!(*n, normalize(*v, 0., 10.));
        }
    }

    #[test]
    fn byte_quantisation() {
        assert_eq!(to_byte(0., 0., 1.), 0);
        assert_eq!(to_byte(1., 0., 1.), 255);
        assert_eq!(to_byte(0.5, 0., 1.), 128);
        assert_eq!(to_byte(-3., 0., 1.), 0);
    }
}
