//! MS-Numpress array codecs.
//!
//! The codec is chosen once from its controlled-vocabulary accession; unknown
//! accessions are rejected before any algorithm runs.
//!
//! ```
//! use chromextract::codecs::NumpressCodec;
//!
//! let codec: NumpressCodec = "MS:1002313".parse().unwrap();
//! assert_eq!(codec, NumpressCodec::Pic);
//! let bytes = codec.encode(&[1.0, 2.0, 3.0]);
//! assert_eq!(codec.decode(&bytes).unwrap(), vec![1.0, 2.0, 3.0]);
//! ```

pub mod fixed_point;
pub mod half_bytes;
pub mod linear;
pub mod pic;
pub mod slof;

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

pub use linear::{decode_linear, encode_linear, encode_linear_with_fixed_point};
pub use pic::{decode_pic, encode_pic};
pub use slof::{decode_slof, encode_slof, encode_slof_with_fixed_point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum NumpressCodec {
    Linear,
    Slof,
    Pic,
}

impl NumpressCodec {
    pub const LINEAR_ACCESSION: &'static str = "MS:1002312";
    pub const PIC_ACCESSION: &'static str = "MS:1002313";
    pub const SLOF_ACCESSION: &'static str = "MS:1002314";

    pub fn from_accession(accession: &str) -> Result<Self, CodecError> {
        match accession {
            Self::LINEAR_ACCESSION => Ok(Self::Linear),
            Self::PIC_ACCESSION => Ok(Self::Pic),
            Self::SLOF_ACCESSION => Ok(Self::Slof),
            other => Err(CodecError::UnsupportedCodec {
                accession: other.to_string(),
            }),
        }
    }

    pub fn accession(&self) -> &'static str {
        match self {
            Self::Linear => Self::LINEAR_ACCESSION,
            Self::Pic => Self::PIC_ACCESSION,
            Self::Slof => Self::SLOF_ACCESSION,
        }
    }

    pub fn encode(&self, data: &[f64]) -> Vec<u8> {
        match self {
            Self::Linear => encode_linear(data),
            Self::Slof => encode_slof(data),
            Self::Pic => encode_pic(data),
        }
    }

    pub fn decode(&self, data: &[u8]) -> Result<Vec<f64>, CodecError> {
        match self {
            Self::Linear => decode_linear(data),
            Self::Slof => decode_slof(data),
            Self::Pic => decode_pic(data),
        }
    }
}

impl FromStr for NumpressCodec {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_accession(s)
    }
}

impl TryFrom<String> for NumpressCodec {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_accession(&value)
    }
}

impl From<NumpressCodec> for &'static str {
    fn from(codec: NumpressCodec) -> Self {
        codec.accession()
    }
}

impl Display for NumpressCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.accession())
    }
}

/// Encodes `data` with the codec named by `accession`.
pub fn encode(accession: &str, data: &[f64]) -> Result<Vec<u8>, CodecError> {
    Ok(NumpressCodec::from_accession(accession)?.encode(data))
}

/// Decodes `data` with the codec named by `accession`.
pub fn decode(accession: &str, data: &[u8]) -> Result<Vec<f64>, CodecError> {
    NumpressCodec::from_accession(accession)?.decode(data)
}
