//! Fixed-point scale selection and the 8-byte scale header.

/// Largest value a scaled Linear integer may take.
const LINEAR_INT_LIMIT: f64 = 0x7FFF_FFFF as f64;
/// Largest value a Slof code may take.
const SLOF_INT_LIMIT: f64 = 0xFFFF as f64;

pub const HEADER_LEN: usize = 8;

/// Writes `fixed_point` as a big-endian IEEE-754 double.
pub fn encode_fixed_point(fixed_point: f64, out: &mut Vec<u8>) {
    out.extend_from_slice(&fixed_point.to_be_bytes());
}

/// Reads the header written by [`encode_fixed_point`], if there are enough bytes.
pub fn decode_fixed_point(data: &[u8]) -> Option<f64> {
    let header: [u8; HEADER_LEN] = data.get(..HEADER_LEN)?.try_into().ok()?;
    Some(f64::from_be_bytes(header))
}

/// Largest scale for which every linear-prediction residual of `data`
/// still fits in a signed 32 bit integer.
///
/// ```
/// use chromextract::codecs::fixed_point::optimal_linear_fixed_point;
///
/// assert_eq!(optimal_linear_fixed_point(&[]), 0.0);
/// assert_eq!(optimal_linear_fixed_point(&[2.0]), (0x7FFF_FFFF as f64 / 2.0).floor());
/// ```
pub fn optimal_linear_fixed_point(data: &[f64]) -> f64 {
    match data {
        [] => 0.0,
        [only] => (LINEAR_INT_LIMIT / only).floor(),
        [first, second, ..] => {
            let max_double = data.windows(3).fold(first.max(*second), |acc, w| {
                let extrapolated = w[1] + (w[1] - w[0]);
                let diff = w[2] - extrapolated;
                acc.max((diff.abs() + 1.0).ceil())
            });
            (LINEAR_INT_LIMIT / max_double).floor()
        }
    }
}

/// Scale that keeps the Linear rounding error under `mass_accuracy`.
///
/// Returns `None` when that scale would overflow the 32 bit residuals,
/// i.e. the requested accuracy cannot be met for this array. Arrays with
/// fewer than three values store their values verbatim and report `0.0`.
pub fn optimal_linear_fixed_point_mass(data: &[f64], mass_accuracy: f64) -> Option<f64> {
    if data.len() < 3 {
        return Some(0.0);
    }
    let wanted = 0.5 / mass_accuracy;
    let overflow_limit = optimal_linear_fixed_point(data);
    if wanted > overflow_limit {
        None
    } else {
        Some(wanted)
    }
}

/// Scale mapping the largest `ln(v + 1)` of `data` onto the full 16 bit range.
pub fn optimal_slof_fixed_point(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let max_double = data
        .iter()
        .map(|x| (x + 1.0).ln())
        .fold(1.0_f64, f64::max);
    (SLOF_INT_LIMIT / max_double).floor()
}
