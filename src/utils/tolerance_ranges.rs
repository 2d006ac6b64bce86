use std::cmp::Ordering;
use std::ops::{Range, RangeInclusive};

/// Half-open window `[center - width / 2, center + width / 2)`.
pub fn centered_range(center: f64, width: f64) -> Range<f64> {
    let half = width / 2.0;
    (center - half)..(center + half)
}

/// Closed window `[center - width / 2, center + width / 2]`.
pub fn centered_range_inclusive(center: f64, width: f64) -> RangeInclusive<f64> {
    let half = width / 2.0;
    (center - half)..=(center + half)
}

/// Where `value` lies relative to the half-open window around `center`.
///
/// `Equal` means inside; `Less` means below the window, `Greater` above it.
///
/// ```
/// use std::cmp::Ordering;
/// use chromextract::utils::tolerance_ranges::position_in_window;
///
/// assert_eq!(position_in_window(500.0, 500.1, 1.0), Ordering::Equal);
/// assert_eq!(position_in_window(499.6, 500.1, 1.0), Ordering::Equal);
/// assert_eq!(position_in_window(500.6, 500.1, 1.0), Ordering::Greater);
/// assert_eq!(position_in_window(499.0, 500.1, 1.0), Ordering::Less);
/// ```
pub fn position_in_window(value: f64, center: f64, width: f64) -> Ordering {
    let range = centered_range(center, width);
    if value < range.start {
        Ordering::Less
    } else if value >= range.end {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Mass error of `observed` against `expected`, in parts per million.
pub fn ppm_error(observed: f64, expected: f64) -> f64 {
    (observed - expected) / expected * 1e6
}

/// Inclusive bounds check where either bound may be absent. NaN is never within.
pub fn within_optional_bounds(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    if value.is_nan() {
        return false;
    }
    if let Some(min) = min {
        if value < min {
            return false;
        }
    }
    if let Some(max) = max {
        if value > max {
            return false;
        }
    }
    true
}
