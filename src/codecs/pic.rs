//! Positive integer count codec: values rounded to `u32` and nibble encoded
//! directly, without a header or prediction.

use super::half_bytes::{NibbleCursor, NibblePacker};
use super::NumpressCodec;
use crate::errors::CodecError;

pub fn encode_pic(data: &[f64]) -> Vec<u8> {
    let mut packer = NibblePacker::new(Vec::with_capacity(data.len() * 2));
    for value in data {
        // Negative values saturate to zero.
        let count = (value + 0.5) as u32;
        packer.push_int(count as i32);
    }
    packer.finish()
}

pub fn decode_pic(data: &[u8]) -> Result<Vec<f64>, CodecError> {
    let mut cursor = NibbleCursor::new(data, 0, NumpressCodec::Pic);
    let mut out = Vec::with_capacity(data.len());
    while !cursor.is_exhausted() {
        let count = cursor.decode_int()? as u32;
        out.push(count as f64);
    }
    Ok(out)
}
