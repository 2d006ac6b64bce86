//! Chromatogram output: numpress-encoded group records serialized to a writer.

use std::io::Write;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::codecs::NumpressCodec;
use crate::errors::{ChromextractError, CodecError, Result};
use crate::models::aggregators::ChromatogramGroupPoints;
use crate::models::request::{ChromExtractor, ChromSource, ChromatogramGroup};
use crate::traits::chromatogram_sink::ChromatogramSink;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SerializationFormat {
    Json,
    #[default]
    PrettyJson,
    Ndjson,
    #[cfg_attr(feature = "clap", value(name = "msgpack"))]
    MessagePack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedArray {
    #[serde(rename = "accession")]
    pub codec: NumpressCodec,
    pub data: Vec<u8>,
}

impl EncodedArray {
    pub fn encode(codec: NumpressCodec, values: &[f64]) -> Self {
        Self {
            codec,
            data: codec.encode(values),
        }
    }

    pub fn decode(&self) -> std::result::Result<Vec<f64>, CodecError> {
        self.codec.decode(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedTransition {
    pub product_mz: f64,
    /// Absent for the precursor trace of a group without transitions.
    pub mz_window: Option<f64>,
    pub intensities: EncodedArray,
    pub mass_errors: Option<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedChromatogramGroup {
    pub group_index: usize,
    pub precursor_mz: f64,
    pub modified_sequence: Option<String>,
    pub extractor: ChromExtractor,
    pub source: ChromSource,
    #[serde(default)]
    pub drift_time: Option<f64>,
    #[serde(default)]
    pub drift_time_window: Option<f64>,
    pub num_points: usize,
    pub retention_times: EncodedArray,
    pub scan_indices: EncodedArray,
    pub transitions: Vec<EncodedTransition>,
}

impl EncodedChromatogramGroup {
    /// Retention times are linear-encoded, scan indices pic-encoded and
    /// intensities slof-encoded. Mass errors stay raw.
    pub fn new(group: &ChromatogramGroup, points: &ChromatogramGroupPoints) -> Self {
        let transitions = (0..points.num_transitions)
            .map(|t| {
                let (product_mz, mz_window) = match group.transitions.get(t) {
                    Some(transition) => (transition.product_mz, Some(transition.mz_window)),
                    None => (group.precursor_mz, None),
                };
                EncodedTransition {
                    product_mz,
                    mz_window,
                    intensities: EncodedArray::encode(NumpressCodec::Slof, &points.intensities(t)),
                    mass_errors: points.mass_errors(t),
                }
            })
            .collect();

        Self {
            group_index: points.group_index,
            precursor_mz: group.precursor_mz,
            modified_sequence: group.modified_sequence.clone(),
            extractor: group.extractor,
            source: group.source,
            drift_time: group.drift_time,
            drift_time_window: group.drift_time_window,
            num_points: points.len(),
            retention_times: EncodedArray::encode(
                NumpressCodec::Linear,
                &points.retention_times(),
            ),
            scan_indices: EncodedArray::encode(NumpressCodec::Pic, &points.scan_indices()),
            transitions,
        }
    }
}

/// Buffers finished groups and writes them all on [`ChromatogramSink::finish`].
pub struct SerializingChromatogramWriter<W: Write> {
    out: W,
    format: SerializationFormat,
    pending: Vec<(ChromatogramGroup, ChromatogramGroupPoints)>,
    written: bool,
}

impl<W: Write> SerializingChromatogramWriter<W> {
    pub fn new(out: W, format: SerializationFormat) -> Self {
        Self {
            out,
            format,
            pending: Vec::new(),
            written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_all(&mut self, groups: &[EncodedChromatogramGroup]) -> Result<()> {
        match self.format {
            SerializationFormat::Json => serde_json::to_writer(&mut self.out, groups)?,
            SerializationFormat::PrettyJson => serde_json::to_writer_pretty(&mut self.out, groups)?,
            SerializationFormat::Ndjson => {
                for group in groups {
                    serde_json::to_writer(&mut self.out, group)?;
                    self.out.write_all(b"\n")?;
                }
            }
            SerializationFormat::MessagePack => {
                rmp_serde::encode::write_named(&mut self.out, groups)?
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> ChromatogramSink for SerializingChromatogramWriter<W> {
    fn write_group(
        &mut self,
        group: &ChromatogramGroup,
        points: ChromatogramGroupPoints,
    ) -> Result<()> {
        if self.written {
            return Err(ChromextractError::InvalidState {
                expected: "open",
                found: "written",
            });
        }
        self.pending.push((group.clone(), points));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.written {
            return Err(ChromextractError::InvalidState {
                expected: "open",
                found: "written",
            });
        }
        let pending = std::mem::take(&mut self.pending);
        let encoded: Vec<EncodedChromatogramGroup> = pending
            .par_iter()
            .map(|(group, points)| EncodedChromatogramGroup::new(group, points))
            .collect();
        debug!("Encoded {} chromatogram groups", encoded.len());

        self.write_all(&encoded)?;
        self.written = true;
        info!("Wrote {} chromatogram groups as {:?}", encoded.len(), self.format);
        Ok(())
    }
}

/// Keeps finished groups in memory.
#[derive(Debug, Default)]
pub struct MemoryChromatogramSink {
    pub groups: Vec<(ChromatogramGroup, ChromatogramGroupPoints)>,
    pub finished: bool,
}

impl ChromatogramSink for MemoryChromatogramSink {
    fn write_group(
        &mut self,
        group: &ChromatogramGroup,
        points: ChromatogramGroupPoints,
    ) -> Result<()> {
        self.groups.push((group.clone(), points));
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
