//! The chromatogram request document: what to extract and how MS/MS
//! isolation is interpreted.

use serde::{Deserialize, Serialize};

use crate::errors::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMethod {
    /// MS/MS spectra contribute to no group.
    None,
    Targeted,
    #[default]
    Dia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromExtractor {
    #[default]
    Summed,
    BasePeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromSource {
    Ms1,
    Ms2,
    Sim,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub product_mz: f64,
    /// Full width of the extraction window around `product_mz`.
    pub mz_window: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramGroup {
    pub precursor_mz: f64,
    #[serde(default)]
    pub modified_sequence: Option<String>,
    #[serde(default)]
    pub min_time: Option<f64>,
    #[serde(default)]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub extractor: ChromExtractor,
    #[serde(default)]
    pub source: ChromSource,
    #[serde(default)]
    pub mass_errors: bool,
    #[serde(default)]
    pub drift_time: Option<f64>,
    #[serde(default)]
    pub drift_time_window: Option<f64>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl ChromatogramGroup {
    pub fn new(precursor_mz: f64) -> Self {
        Self {
            precursor_mz,
            modified_sequence: None,
            min_time: None,
            max_time: None,
            extractor: ChromExtractor::default(),
            source: ChromSource::default(),
            mass_errors: false,
            drift_time: None,
            drift_time_window: None,
            transitions: Vec::new(),
        }
    }

    pub fn with_transition(mut self, product_mz: f64, mz_window: f64) -> Self {
        self.transitions.push(Transition {
            product_mz,
            mz_window,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationWindow {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub start_margin: Option<f64>,
    #[serde(default)]
    pub end_margin: Option<f64>,
}

impl IsolationWindow {
    pub fn new(start: f64, end: f64, target: Option<f64>) -> Self {
        Self {
            start,
            end,
            target,
            start_margin: None,
            end_margin: None,
        }
    }

    /// `[start, end)`
    pub fn contains(&self, mz: f64) -> bool {
        self.start <= mz && mz < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IsolationScheme {
    #[serde(default)]
    pub precursor_filter: Option<f64>,
    #[serde(default)]
    pub precursor_right_filter: Option<f64>,
    #[serde(default)]
    pub isolation_windows: Vec<IsolationWindow>,
    #[serde(default)]
    pub special_handling: Option<String>,
    #[serde(default)]
    pub windows_per_scan: Option<u32>,
}

/// An isolation scheme reduced to the single representation it uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedIsolationScheme {
    PrecursorFilter {
        filter: f64,
        right_filter: Option<f64>,
    },
    Windows {
        windows: Vec<IsolationWindow>,
        has_targets: bool,
    },
    /// Only the instrument-reported isolation width can be used.
    InstrumentOnly,
}

fn check_positive(field: &str, value: f64) -> Result<f64, RequestError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(RequestError::invalid(field, value))
    }
}

fn check_finite(field: &str, value: f64) -> Result<f64, RequestError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RequestError::invalid(field, value))
    }
}

impl IsolationScheme {
    pub fn resolve(&self) -> Result<ResolvedIsolationScheme, RequestError> {
        match (self.precursor_filter, self.isolation_windows.is_empty()) {
            (Some(_), false) => Err(RequestError::ConflictingIsolationScheme),
            (Some(filter), true) => {
                let filter = check_positive("precursor_filter", filter)?;
                let right_filter = self
                    .precursor_right_filter
                    .map(|x| check_positive("precursor_right_filter", x))
                    .transpose()?;
                Ok(ResolvedIsolationScheme::PrecursorFilter {
                    filter,
                    right_filter,
                })
            }
            (None, false) => {
                if self.precursor_right_filter.is_some() {
                    return Err(RequestError::ConflictingIsolationScheme);
                }
                let has_targets = self.isolation_windows[0].target.is_some();
                for (i, window) in self.isolation_windows.iter().enumerate() {
                    check_finite("isolation_windows.start", window.start)?;
                    check_finite("isolation_windows.end", window.end)?;
                    if window.start >= window.end {
                        return Err(RequestError::invalid(
                            format!("isolation_windows[{}]", i),
                            format!("start {} is not below end {}", window.start, window.end),
                        ));
                    }
                    match window.target {
                        Some(target) => {
                            check_finite("isolation_windows.target", target)?;
                            if !has_targets {
                                // The first window decides; it is the one missing a target.
                                return Err(RequestError::MissingTargetValue { window_index: 0 });
                            }
                        }
                        None if has_targets => {
                            return Err(RequestError::MissingTargetValue { window_index: i });
                        }
                        None => {}
                    }
                }
                Ok(ResolvedIsolationScheme::Windows {
                    windows: self.isolation_windows.clone(),
                    has_targets,
                })
            }
            (None, true) => {
                if self.precursor_right_filter.is_some() {
                    return Err(RequestError::invalid(
                        "precursor_right_filter",
                        "set without precursor_filter",
                    ));
                }
                Ok(ResolvedIsolationScheme::InstrumentOnly)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramRequest {
    #[serde(default)]
    pub min_time: Option<f64>,
    #[serde(default)]
    pub max_time: Option<f64>,
    pub mz_match_tolerance: f64,
    #[serde(default)]
    pub acquisition_method: AcquisitionMethod,
    #[serde(default)]
    pub isolation_scheme: Option<IsolationScheme>,
    #[serde(default)]
    pub chromatogram_groups: Vec<ChromatogramGroup>,
}

impl ChromatogramRequest {
    pub fn new(mz_match_tolerance: f64, acquisition_method: AcquisitionMethod) -> Self {
        Self {
            min_time: None,
            max_time: None,
            mz_match_tolerance,
            acquisition_method,
            isolation_scheme: None,
            chromatogram_groups: Vec::new(),
        }
    }

    /// Checks every field and returns the isolation scheme in resolved form.
    ///
    /// A missing scheme behaves like an empty one.
    pub fn validate(&self) -> Result<ResolvedIsolationScheme, RequestError> {
        check_positive("mz_match_tolerance", self.mz_match_tolerance)?;
        if let Some(min_time) = self.min_time {
            check_finite("min_time", min_time)?;
        }
        if let Some(max_time) = self.max_time {
            check_finite("max_time", max_time)?;
        }
        if let (Some(min_time), Some(max_time)) = (self.min_time, self.max_time) {
            if min_time > max_time {
                return Err(RequestError::invalid(
                    "min_time",
                    format!("{} is after max_time {}", min_time, max_time),
                ));
            }
        }

        for (i, group) in self.chromatogram_groups.iter().enumerate() {
            check_finite(&format!("chromatogram_groups[{}].precursor_mz", i), group.precursor_mz)?;
            for transition in group.transitions.iter() {
                check_finite(
                    &format!("chromatogram_groups[{}].product_mz", i),
                    transition.product_mz,
                )?;
                if !(transition.mz_window.is_finite() && transition.mz_window >= 0.0) {
                    return Err(RequestError::invalid(
                        format!("chromatogram_groups[{}].mz_window", i),
                        transition.mz_window,
                    ));
                }
            }
            if let Some(window) = group.drift_time_window {
                check_positive(&format!("chromatogram_groups[{}].drift_time_window", i), window)?;
            }
        }

        match &self.isolation_scheme {
            Some(scheme) => scheme.resolve(),
            None => Ok(ResolvedIsolationScheme::InstrumentOnly),
        }
    }
}
