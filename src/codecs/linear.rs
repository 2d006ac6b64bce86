//! Linear-prediction codec for smoothly increasing arrays (m/z, retention time).
//!
//! Layout: `[8 byte BE scale][4 byte LE v0][4 byte LE v1][nibble stream]`,
//! where each nibble-encoded value is the residual of a scaled value against
//! the straight-line extrapolation of the two before it.

use super::fixed_point::{
    decode_fixed_point, encode_fixed_point, optimal_linear_fixed_point, HEADER_LEN,
};
use super::half_bytes::{NibbleCursor, NibblePacker};
use super::NumpressCodec;
use crate::errors::CodecError;

const FIRST_VALUE_END: usize = HEADER_LEN + 4;
const SECOND_VALUE_END: usize = HEADER_LEN + 8;

#[inline]
fn scale(value: f64, fixed_point: f64) -> i64 {
    (value * fixed_point + 0.5) as i64
}

pub fn encode_linear(data: &[f64]) -> Vec<u8> {
    encode_linear_with_fixed_point(data, optimal_linear_fixed_point(data))
}

pub fn encode_linear_with_fixed_point(data: &[f64], fixed_point: f64) -> Vec<u8> {
    let mut out = Vec::with_capacity(SECOND_VALUE_END + data.len() * 2);
    encode_fixed_point(fixed_point, &mut out);

    let (first, second) = match data {
        [] => return out,
        [only] => {
            out.extend_from_slice(&(scale(*only, fixed_point) as u32).to_le_bytes());
            return out;
        }
        [first, second, ..] => (scale(*first, fixed_point), scale(*second, fixed_point)),
    };
    out.extend_from_slice(&(first as u32).to_le_bytes());
    out.extend_from_slice(&(second as u32).to_le_bytes());

    let mut packer = NibblePacker::new(out);
    let (mut prev2, mut prev1) = (first, second);
    for value in &data[2..] {
        let current = scale(*value, fixed_point);
        let extrapolated = prev1 + (prev1 - prev2);
        packer.push_int((current - extrapolated) as i32);
        prev2 = prev1;
        prev1 = current;
    }
    packer.finish()
}

fn read_le_int(data: &[u8], start: usize) -> i64 {
    let bytes = [data[start], data[start + 1], data[start + 2], data[start + 3]];
    i32::from_le_bytes(bytes) as i64
}

fn truncated(length: usize, minimum: usize) -> CodecError {
    CodecError::TruncatedData {
        codec: NumpressCodec::Linear,
        length,
        minimum,
    }
}

/// Decodes a Linear buffer. A header-only buffer is an empty array.
pub fn decode_linear(data: &[u8]) -> Result<Vec<f64>, CodecError> {
    let fixed_point = decode_fixed_point(data).ok_or(truncated(data.len(), HEADER_LEN))?;

    match data.len() {
        HEADER_LEN => return Ok(Vec::new()),
        len if len < FIRST_VALUE_END => return Err(truncated(len, FIRST_VALUE_END)),
        FIRST_VALUE_END => {
            return Ok(vec![read_le_int(data, HEADER_LEN) as f64 / fixed_point]);
        }
        len if len < SECOND_VALUE_END => return Err(truncated(len, SECOND_VALUE_END)),
        _ => {}
    }

    let mut prev2 = read_le_int(data, HEADER_LEN);
    let mut prev1 = read_le_int(data, FIRST_VALUE_END);
    let mut out = Vec::with_capacity(2 + (data.len() - SECOND_VALUE_END) * 2);
    out.push(prev2 as f64 / fixed_point);
    out.push(prev1 as f64 / fixed_point);

    let mut cursor = NibbleCursor::new(data, SECOND_VALUE_END, NumpressCodec::Linear);
    while !cursor.is_exhausted() {
        let diff = cursor.decode_int()? as i64;
        let extrapolated = prev1 + (prev1 - prev2);
        let current = extrapolated + diff;
        out.push(current as f64 / fixed_point);
        prev2 = prev1;
        prev1 = current;
    }
    Ok(out)
}
