use std::fmt::Display;

use crate::codecs::NumpressCodec;

#[derive(Debug, thiserror::Error)]
pub enum ChromextractError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
    #[error("spectrum error: {0}")]
    Spectrum(#[from] SpectrumError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MessagePack error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
    #[error("spectrum record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: Box<ChromextractError>,
    },
    #[error("generator is {found}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ChromextractError>;

impl ChromextractError {
    pub fn custom(msg: impl Display) -> Self {
        Self::Other(msg.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported numpress accession '{accession}'")]
    UnsupportedCodec { accession: String },
    #[error("{codec:?} buffer of {length} bytes is truncated (expected at least {minimum})")]
    TruncatedData {
        codec: NumpressCodec,
        length: usize,
        minimum: usize,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error(
        "isolation target {target} matches more than one window ({first_window:?} and {second_window:?})"
    )]
    AmbiguousIsolationWindow {
        target: f64,
        first_window: (f64, f64),
        second_window: (f64, f64),
    },
    #[error(
        "no isolation scheme or instrument isolation width available for target {isolation_mz}"
    )]
    MissingIsolationScheme { isolation_mz: f64 },
    #[error("isolation window {window_index} has no target value while other windows do")]
    MissingTargetValue { window_index: usize },
    #[error("isolation scheme declares both a precursor filter and a window list")]
    ConflictingIsolationScheme,
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl RequestError {
    pub fn invalid(field: impl Display, value: impl Display) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpectrumError {
    #[error("spectrum {index} has {mz_len} m/z values but {intensity_len} intensities")]
    ArrayLengthMismatch {
        index: usize,
        mz_len: usize,
        intensity_len: usize,
    },
    #[error("spectrum {index} has ms level 0, expected at least 1")]
    InvalidMsLevel { index: usize },
    #[error("spectrum {index} has a non-finite {field}")]
    NonFiniteValue { index: usize, field: &'static str },
    #[error("could not parse spectrum on line {line}: {message}")]
    Parse { line: usize, message: String },
}
