//! Pulls per-transition values out of a single spectrum.

use crate::models::request::{ChromExtractor, Transition};
use crate::models::spectrum::Spectrum;
use crate::utils::streaming_calculators::RunningMeanCalculator;
use crate::utils::tolerance_ranges::{centered_range_inclusive, ppm_error};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedValues {
    pub values: Vec<f32>,
    pub mass_errors: Option<Vec<f32>>,
}

/// Index range of peaks with m/z inside `[product - window/2, product + window/2]`.
///
/// Relies on the spectrum's m/z array being ascending.
fn peak_range(mzs: &[f64], transition: &Transition) -> std::ops::Range<usize> {
    let range = centered_range_inclusive(transition.product_mz, transition.mz_window);
    let start = mzs.partition_point(|mz| mz < range.start());
    let end = start + mzs[start..].partition_point(|mz| mz <= range.end());
    start..end
}

fn extract_one(
    spectrum: &Spectrum,
    transition: &Transition,
    extractor: ChromExtractor,
) -> (f32, f32) {
    let range = peak_range(&spectrum.mzs, transition);
    let mzs = &spectrum.mzs[range.clone()];
    let intensities = &spectrum.intensities[range];

    match extractor {
        ChromExtractor::Summed => {
            let mut error_calc = RunningMeanCalculator::new();
            let mut total = 0.0_f64;
            for (mz, intensity) in mzs.iter().zip(intensities.iter()) {
                total += *intensity;
                error_calc.add(ppm_error(*mz, transition.product_mz), *intensity);
            }
            (total as f32, error_calc.mean().unwrap_or(0.0) as f32)
        }
        ChromExtractor::BasePeak => {
            let base = mzs
                .iter()
                .zip(intensities.iter())
                .max_by(|a, b| a.1.total_cmp(b.1));
            match base {
                Some((mz, intensity)) => (
                    *intensity as f32,
                    ppm_error(*mz, transition.product_mz) as f32,
                ),
                None => (0.0, 0.0),
            }
        }
    }
}

/// Extracts one value per transition, plus mass errors when requested.
pub fn extract_transitions(
    spectrum: &Spectrum,
    transitions: &[Transition],
    extractor: ChromExtractor,
    with_mass_errors: bool,
) -> ExtractedValues {
    let mut values = Vec::with_capacity(transitions.len());
    let mut mass_errors = Vec::with_capacity(if with_mass_errors {
        transitions.len()
    } else {
        0
    });
    for transition in transitions {
        let (value, error) = extract_one(spectrum, transition, extractor);
        values.push(value);
        if with_mass_errors {
            mass_errors.push(error);
        }
    }
    ExtractedValues {
        values,
        mass_errors: with_mass_errors.then_some(mass_errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> Spectrum {
        Spectrum::new(
            0,
            2,
            Some(1.0),
            vec![199.9, 200.0, 200.001, 200.2, 300.0],
            vec![5.0, 100.0, 300.0, 7.0, 50.0],
        )
        .unwrap()
    }

    fn transition(product_mz: f64, mz_window: f64) -> Transition {
        Transition {
            product_mz,
            mz_window,
        }
    }

    #[test]
    fn test_summed_extraction() {
        let out = extract_transitions(
            &spectrum(),
            &[transition(200.0, 0.01), transition(250.0, 0.01)],
            ChromExtractor::Summed,
            false,
        );
        assert_eq!(out.values, vec![400.0, 0.0]);
        assert_eq!(out.mass_errors, None);
    }

    #[test]
    fn test_window_edges_are_inclusive() {
        // [200.0, 200.5]
        let out = extract_transitions(
            &spectrum(),
            &[transition(200.25, 0.5)],
            ChromExtractor::Summed,
            false,
        );
        assert_eq!(out.values, vec![407.0]);
    }

    #[test]
    fn test_base_peak_extraction() {
        let out = extract_transitions(
            &spectrum(),
            &[transition(200.0, 0.01)],
            ChromExtractor::BasePeak,
            true,
        );
        assert_eq!(out.values, vec![300.0]);
        let errors = out.mass_errors.unwrap();
        // 200.001 vs 200.0 is 5 ppm
        assert!((errors[0] - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_summed_mass_error_is_intensity_weighted() {
        let out = extract_transitions(
            &spectrum(),
            &[transition(200.0, 0.01), transition(250.0, 0.01)],
            ChromExtractor::Summed,
            true,
        );
        let errors = out.mass_errors.unwrap();
        // (100 * 0 + 300 * 5) / 400
        assert!((errors[0] - 3.75).abs() < 1e-3);
        assert_eq!(errors[1], 0.0);
    }
}
