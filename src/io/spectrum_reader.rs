//! Newline-delimited JSON spectrum input.
//!
//! Every non-blank line holds one spectrum. Peak arrays are either plain
//! number lists or numpress blobs tagged with their codec accession:
//!
//! ```json
//! {"ms_level": 2, "retention_time": 1.5, "mzs": [500.1], "intensities": {"accession": "MS:1002314", "data": [...]}}
//! ```

use std::io::BufRead;

use serde::Deserialize;
use tracing::debug;

use crate::codecs;
use crate::errors::{ChromextractError, Result, SpectrumError};
use crate::models::spectrum::{Precursor, Spectrum};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArrayRecord {
    Raw(Vec<f64>),
    Numpress { accession: String, data: Vec<u8> },
}

impl ArrayRecord {
    pub fn into_values(self) -> Result<Vec<f64>> {
        match self {
            Self::Raw(values) => Ok(values),
            Self::Numpress { accession, data } => Ok(codecs::decode(&accession, &data)?),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpectrumRecord {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    pub ms_level: u8,
    #[serde(default)]
    pub retention_time: Option<f64>,
    #[serde(default)]
    pub drift_time: Option<f64>,
    #[serde(default)]
    pub precursors: Vec<Precursor>,
    pub mzs: ArrayRecord,
    pub intensities: ArrayRecord,
}

impl SpectrumRecord {
    pub fn into_spectrum(self, default_index: usize) -> Result<Spectrum> {
        let index = self.index.unwrap_or(default_index);
        let mzs = self.mzs.into_values()?;
        let intensities = self.intensities.into_values()?;
        let mut spectrum =
            Spectrum::new(index, self.ms_level, self.retention_time, mzs, intensities)?
                .with_precursors(self.precursors)
                .with_drift_time(self.drift_time);
        spectrum.id = self.id;
        Ok(spectrum)
    }
}

/// Streams [`Spectrum`]s from an NDJSON source.
///
/// The iterator stops after the first error.
pub struct SpectrumReader<R: BufRead> {
    handle: R,
    buffer: String,
    line_number: usize,
    spectra_read: usize,
    done: bool,
}

impl<R: BufRead> SpectrumReader<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            buffer: String::new(),
            line_number: 0,
            spectra_read: 0,
            done: false,
        }
    }

    pub fn spectra_read(&self) -> usize {
        self.spectra_read
    }

    fn parse_line(&self, line: &str) -> Result<Spectrum> {
        let record: SpectrumRecord =
            serde_json::from_str(line).map_err(|e| SpectrumError::Parse {
                line: self.line_number,
                message: e.to_string(),
            })?;
        record
            .into_spectrum(self.spectra_read)
            .map_err(|e| ChromextractError::Record {
                line: self.line_number,
                source: Box::new(e),
            })
    }

    pub fn read_next(&mut self) -> Option<Result<Spectrum>> {
        if self.done {
            return None;
        }
        loop {
            self.buffer.clear();
            match self.handle.read_line(&mut self.buffer) {
                Ok(0) => {
                    debug!("Read {} spectra from {} lines", self.spectra_read, self.line_number);
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(ChromextractError::Io(e)));
                }
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }

            let out = self.parse_line(line);
            match &out {
                Ok(_) => self.spectra_read += 1,
                Err(_) => self.done = true,
            }
            return Some(out);
        }
    }
}

impl<R: BufRead> Iterator for SpectrumReader<R> {
    type Item = Result<Spectrum>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}
