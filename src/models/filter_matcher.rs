//! Finds the filter groups whose precursor m/z falls inside an isolation window.

use std::cmp::Ordering;

use tracing::debug;

use crate::utils::tolerance_ranges::position_in_window;

/// Largest tie-break epsilon, in m/z.
pub const MAX_TIE_BREAK_EPSILON: f64 = 0.0001;

/// Fraction of epsilon absorbing float noise in distance differences.
const RELATIVE_SLOP: f64 = 1e-6;

/// Groups sorted ascending by precursor m/z, built once per request.
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    /// (precursor m/z, index of the group in request order)
    sorted: Vec<(f64, usize)>,
}

impl FilterMatcher {
    pub fn new(precursor_mzs: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted: Vec<(f64, usize)> = precursor_mzs
            .into_iter()
            .enumerate()
            .map(|(i, mz)| (mz, i))
            .collect();
        // Stable, so groups sharing an m/z keep request order.
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { sorted }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Precursor m/z values in matching order.
    pub fn sorted_mzs(&self) -> impl Iterator<Item = f64> + '_ {
        self.sorted.iter().map(|(mz, _)| *mz)
    }

    /// Sorted position of the first group inside the window, if any.
    fn first_in_window(&self, center: f64, width: f64) -> Option<usize> {
        let mut low = 0_usize;
        let mut high = self.sorted.len();
        let mut hit = None;
        // [low, high) still unexplored
        while low < high {
            let mid = low + (high - low) / 2;
            match position_in_window(self.sorted[mid].0, center, width) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => {
                    hit = Some(mid);
                    break;
                }
            }
        }

        let mut first = hit?;
        while first > 0
            && position_in_window(self.sorted[first - 1].0, center, width) == Ordering::Equal
        {
            first -= 1;
        }
        Some(first)
    }

    fn dia_candidates(&self, center: f64, width: f64) -> &[(f64, usize)] {
        let Some(first) = self.first_in_window(center, width) else {
            return &[];
        };
        let len = self.sorted[first..]
            .iter()
            .take_while(|(mz, _)| position_in_window(*mz, center, width) == Ordering::Equal)
            .count();
        &self.sorted[first..first + len]
    }

    /// Group indices whose precursor m/z lies in `[center - width/2, center + width/2)`,
    /// in ascending m/z order.
    pub fn match_dia(&self, center: f64, width: f64) -> Vec<usize> {
        if !(center.is_finite() && width.is_finite()) {
            debug!("Non-finite window {} +/- {}, matching nothing", center, width / 2.0);
            return Vec::new();
        }
        self.dia_candidates(center, width)
            .iter()
            .map(|(_, idx)| *idx)
            .collect()
    }

    /// Closest groups to `target` within `tolerance`.
    ///
    /// Every group whose distance is within epsilon of the best distance is
    /// kept, where epsilon is `min(tolerance, 0.0001)`. A candidate exactly
    /// epsilon away from the best is dropped. Results are in ascending m/z order.
    pub fn match_targeted(&self, target: f64, tolerance: f64) -> Vec<usize> {
        if !target.is_finite() {
            return Vec::new();
        }
        let epsilon = tolerance.min(MAX_TIE_BREAK_EPSILON);
        let slop = epsilon * RELATIVE_SLOP;
        // Exact ties always stay, however small the tolerance.
        let close_enough =
            |delta_from_best: f64| delta_from_best <= 0.0 || delta_from_best < epsilon - slop;

        let mut best = f64::MAX;
        let mut kept: Vec<(f64, usize)> = Vec::new();
        for &(mz, idx) in self.dia_candidates(target, tolerance * 2.0) {
            let delta = (target - mz).abs();
            if delta < best {
                best = delta;
                kept.retain(|(kept_mz, _)| close_enough((target - kept_mz).abs() - best));
                kept.push((mz, idx));
            } else if close_enough(delta - best) {
                kept.push((mz, idx));
            }
        }
        if kept.len() > 1 {
            debug!(
                "Targeted m/z {} matched {} groups within {} of the best",
                target,
                kept.len(),
                epsilon
            );
        }
        kept.into_iter().map(|(_, idx)| idx).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_scan(mzs: &[f64], center: f64, width: f64) -> Vec<usize> {
        let mut pairs: Vec<(f64, usize)> = mzs.iter().copied().zip(0..).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (lo, hi) = (center - width / 2.0, center + width / 2.0);
        pairs
            .into_iter()
            .filter(|(mz, _)| lo <= *mz && *mz < hi)
            .map(|(_, i)| i)
            .collect()
    }

    #[test]
    fn test_dia_matches_linear_scan() {
        let mzs = [
            450.2, 500.0, 500.0, 499.5, 500.49, 500.5, 501.0, 300.0, 499.49, 700.0, 500.25,
        ];
        let matcher = FilterMatcher::new(mzs);
        let queries = [
            (500.0, 1.0),
            (500.0, 0.0),
            (450.0, 1.0),
            (100.0, 5.0),
            (800.0, 5.0),
            (500.0, 1000.0),
            (499.75, 0.5),
            (300.0, 0.01),
        ];
        for (center, width) in queries {
            assert_eq!(
                matcher.match_dia(center, width),
                linear_scan(&mzs, center, width),
                "Mismatch for window {} +/- {}",
                center,
                width / 2.0
            );
        }
    }

    #[test]
    fn test_dia_upper_bound_is_exclusive() {
        let matcher = FilterMatcher::new([499.5, 500.5]);
        assert_eq!(matcher.match_dia(500.0, 1.0), vec![0]);
    }

    #[test]
    fn test_duplicates_are_all_returned_in_request_order() {
        let matcher = FilterMatcher::new([600.0, 500.0, 500.0, 500.0, 400.0]);
        assert_eq!(matcher.match_dia(500.0, 0.1), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_matcher() {
        let matcher = FilterMatcher::new(std::iter::empty());
        assert!(matcher.is_empty());
        assert!(matcher.match_dia(500.0, 10.0).is_empty());
        assert!(matcher.match_targeted(500.0, 0.1).is_empty());
    }

    #[test]
    fn test_targeted_tie_break_epsilon_boundary() {
        let matcher = FilterMatcher::new([500.00005, 500.00008, 500.00015]);
        // epsilon = min(0.0002, 0.0001)
        assert_eq!(matcher.match_targeted(500.0, 0.0002), vec![0, 1]);
    }

    #[test]
    fn test_targeted_prunes_when_better_match_arrives() {
        // 499.99985 is seen first, then pruned by the closer 500.00005.
        let matcher = FilterMatcher::new([500.00005, 499.99985, 500.00008]);
        assert_eq!(matcher.match_targeted(500.0, 0.0002), vec![0, 2]);
    }

    #[test]
    fn test_targeted_single_best() {
        let matcher = FilterMatcher::new([499.99, 500.003, 500.02]);
        assert_eq!(matcher.match_targeted(500.0, 0.01), vec![1]);
        assert!(matcher.match_targeted(510.0, 0.01).is_empty());
    }

    #[test]
    fn test_targeted_keeps_exact_ties_below_float_noise() {
        let matcher = FilterMatcher::new([500.0, 500.0]);
        assert_eq!(matcher.match_targeted(500.0, 5e-10), vec![0, 1]);
        assert_eq!(matcher.match_targeted(500.0, 0.0), vec![0, 1]);
    }

    #[test]
    fn test_non_finite_queries_match_nothing() {
        let matcher = FilterMatcher::new([300.0, 500.0, 900.0]);
        assert!(matcher.match_dia(f64::NAN, 1.0).is_empty());
        assert!(matcher.match_dia(500.0, f64::NAN).is_empty());
        assert!(matcher.match_dia(500.0, f64::INFINITY).is_empty());
        assert!(matcher.match_targeted(f64::NAN, 0.01).is_empty());
    }

    #[test]
    fn test_targeted_equidistant_groups() {
        let matcher = FilterMatcher::new([499.995, 500.005]);
        assert_eq!(matcher.match_targeted(500.0, 0.01), vec![0, 1]);
    }
}
