//! Short logged float codec for intensities.
//!
//! Layout: `[8 byte BE scale][2 byte LE code]*`, each code holding
//! `round(ln(v + 1) * scale)`.

use super::fixed_point::{
    decode_fixed_point, encode_fixed_point, optimal_slof_fixed_point, HEADER_LEN,
};
use super::NumpressCodec;
use crate::errors::CodecError;

pub fn encode_slof(data: &[f64]) -> Vec<u8> {
    encode_slof_with_fixed_point(data, optimal_slof_fixed_point(data))
}

pub fn encode_slof_with_fixed_point(data: &[f64], fixed_point: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + data.len() * 2);
    encode_fixed_point(fixed_point, &mut out);
    for value in data {
        let code = ((value + 1.0).ln() * fixed_point + 0.5) as u16;
        out.extend_from_slice(&code.to_le_bytes());
    }
    out
}

pub fn decode_slof(data: &[u8]) -> Result<Vec<f64>, CodecError> {
    let truncated = |minimum| CodecError::TruncatedData {
        codec: NumpressCodec::Slof,
        length: data.len(),
        minimum,
    };
    let fixed_point = decode_fixed_point(data).ok_or(truncated(HEADER_LEN))?;
    let payload = &data[HEADER_LEN..];
    if payload.len() % 2 != 0 {
        return Err(truncated(data.len() + 1));
    }

    Ok(payload
        .chunks_exact(2)
        .map(|pair| {
            let code = u16::from_le_bytes([pair[0], pair[1]]);
            (code as f64 / fixed_point).exp() - 1.0
        })
        .collect())
}
