use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::SpectrumError;
use crate::sort_vecs_by_first_f64;
use crate::utils::sorting::is_sorted_ascending;

/// Isolation settings the instrument reported for one precursor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Precursor {
    pub isolation_mz: Option<f64>,
    pub lower_offset: Option<f64>,
    pub upper_offset: Option<f64>,
}

impl Precursor {
    pub fn new(isolation_mz: f64, lower_offset: f64, upper_offset: f64) -> Self {
        Self {
            isolation_mz: Some(isolation_mz),
            lower_offset: Some(lower_offset),
            upper_offset: Some(upper_offset),
        }
    }

    /// Full isolation width, defined only when both offsets are positive and finite.
    pub fn isolation_width(&self) -> Option<f64> {
        let usable = |offset: f64| offset > 0.0 && offset.is_finite();
        match (self.lower_offset, self.upper_offset) {
            (Some(lower), Some(upper)) if usable(lower) && usable(upper) => Some(lower + upper),
            _ => None,
        }
    }
}

/// One scan as produced by a spectrum reader.
///
/// The m/z array is always ascending and paired index-wise with the
/// intensities; [`Spectrum::new`] enforces both.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub index: usize,
    pub id: Option<String>,
    pub ms_level: u8,
    /// Minutes.
    pub retention_time: Option<f64>,
    pub mzs: Vec<f64>,
    pub intensities: Vec<f64>,
    pub precursors: Vec<Precursor>,
    pub drift_time: Option<f64>,
}

impl Spectrum {
    pub fn new(
        index: usize,
        ms_level: u8,
        retention_time: Option<f64>,
        mzs: Vec<f64>,
        intensities: Vec<f64>,
    ) -> Result<Self, SpectrumError> {
        if mzs.len() != intensities.len() {
            return Err(SpectrumError::ArrayLengthMismatch {
                index,
                mz_len: mzs.len(),
                intensity_len: intensities.len(),
            });
        }
        if ms_level == 0 {
            return Err(SpectrumError::InvalidMsLevel { index });
        }
        if retention_time.is_some_and(|rt| !rt.is_finite()) {
            return Err(SpectrumError::NonFiniteValue {
                index,
                field: "retention_time",
            });
        }

        let (mzs, intensities) = if is_sorted_ascending(&mzs) {
            (mzs, intensities)
        } else {
            warn!("Spectrum {} has unsorted m/z values, sorting", index);
            sort_vecs_by_first_f64!(&mzs, &intensities)
        };

        Ok(Self {
            index,
            id: None,
            ms_level,
            retention_time,
            mzs,
            intensities,
            precursors: Vec::new(),
            drift_time: None,
        })
    }

    pub fn with_precursors(mut self, precursors: Vec<Precursor>) -> Self {
        self.precursors = precursors;
        self
    }

    pub fn with_drift_time(mut self, drift_time: Option<f64>) -> Self {
        self.drift_time = drift_time;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mzs.is_empty()
    }
}
