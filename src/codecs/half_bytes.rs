//! Half-byte (nibble) integer encoding shared by the Linear and Pic codecs.
//!
//! An integer is written as a run-length nibble followed by the nibbles
//! that carry information, least significant first. Leading `0x0` nibbles
//! are counted by a head of `0..=8`, leading `0xf` nibbles by `8 + count`.
//! Streams are packed two nibbles per byte, high nibble first; an odd
//! trailing nibble leaves the low half of the last byte as `0x0`.

use crate::codecs::NumpressCodec;
use crate::errors::CodecError;

const TOP_NIBBLE_MASK: u32 = 0xf000_0000;

/// Appends the nibbles (1 to 9 of them) encoding `x` to `out`.
///
/// ```
/// use chromextract::codecs::half_bytes::encode_int;
///
/// let mut nibbles = Vec::new();
/// encode_int(23, &mut nibbles);
/// assert_eq!(nibbles, vec![6, 7, 1]);
/// ```
pub fn encode_int(x: i32, out: &mut Vec<u8>) {
    let bits = x as u32;
    let init = bits & TOP_NIBBLE_MASK;

    if init == 0 {
        let leading = (0..8)
            .find(|i| bits & (TOP_NIBBLE_MASK >> (4 * i)) != 0)
            .unwrap_or(8);
        out.push(leading as u8);
        push_low_nibbles(bits, 8 - leading, out);
    } else if init == TOP_NIBBLE_MASK {
        let leading = (0..8)
            .find(|i| {
                let m = TOP_NIBBLE_MASK >> (4 * i);
                bits & m != m
            })
            .unwrap_or(7);
        out.push(leading as u8 + 8);
        push_low_nibbles(bits, 8 - leading, out);
    } else {
        out.push(0);
        push_low_nibbles(bits, 8, out);
    }
}

fn push_low_nibbles(bits: u32, count: u32, out: &mut Vec<u8>) {
    for i in 0..count {
        out.push(((bits >> (4 * i)) & 0xf) as u8);
    }
}

/// Packs a nibble stream into bytes, high nibble first.
#[derive(Debug, Default)]
pub struct NibblePacker {
    bytes: Vec<u8>,
    scratch: Vec<u8>,
    pending: Option<u8>,
}

impl NibblePacker {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            scratch: Vec::with_capacity(9),
            pending: None,
        }
    }

    pub fn push_int(&mut self, x: i32) {
        self.scratch.clear();
        encode_int(x, &mut self.scratch);
        for i in 0..self.scratch.len() {
            let nibble = self.scratch[i];
            self.push_nibble(nibble);
        }
    }

    fn push_nibble(&mut self, nibble: u8) {
        match self.pending.take() {
            Some(high) => self.bytes.push((high << 4) | (nibble & 0xf)),
            None => self.pending = Some(nibble & 0xf),
        }
    }

    /// Flushes a dangling nibble as the high half of a final byte.
    pub fn finish(mut self) -> Vec<u8> {
        if let Some(high) = self.pending.take() {
            self.bytes.push(high << 4);
        }
        self.bytes
    }
}

/// Reads nibbles from a byte slice, tracking a byte position and a half flag.
#[derive(Debug, Clone)]
pub struct NibbleCursor<'a> {
    data: &'a [u8],
    pos: usize,
    half: bool,
    codec: NumpressCodec,
}

impl<'a> NibbleCursor<'a> {
    pub fn new(data: &'a [u8], start: usize, codec: NumpressCodec) -> Self {
        Self {
            data,
            pos: start,
            half: false,
            codec,
        }
    }

    /// True once the remaining input holds no further encoded integer.
    ///
    /// A lone low nibble in the last byte is padding unless it is `0x8`,
    /// which is a complete encoding of zero.
    pub fn is_exhausted(&self) -> bool {
        if self.pos >= self.data.len() {
            return true;
        }
        self.pos == self.data.len() - 1 && self.half && (self.data[self.pos] & 0xf) != 0x8
    }

    fn next_nibble(&mut self) -> Result<u8, CodecError> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::TruncatedData {
            codec: self.codec,
            length: self.data.len(),
            minimum: self.pos + 1,
        })?;
        let nibble = if self.half {
            self.pos += 1;
            byte & 0xf
        } else {
            byte >> 4
        };
        self.half = !self.half;
        Ok(nibble)
    }

    /// Decodes the next integer. Running out of input mid-value is an error.
    pub fn decode_int(&mut self) -> Result<i32, CodecError> {
        let head = self.next_nibble()?;
        let mut res: u32 = 0;
        let explicit_from = if head <= 8 {
            head as u32
        } else {
            let n = (head - 8) as u32;
            for i in 0..n {
                res |= TOP_NIBBLE_MASK >> (4 * i);
            }
            n
        };

        if explicit_from == 8 {
            return Ok(res as i32);
        }

        for i in explicit_from..8 {
            let nibble = self.next_nibble()? as u32;
            res |= nibble << ((i - explicit_from) * 4);
        }
        Ok(res as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nibbles_of(x: i32) -> Vec<u8> {
        let mut out = Vec::new();
        encode_int(x, &mut out);
        out
    }

    fn decode_single(bytes: &[u8]) -> i32 {
        let mut cursor = NibbleCursor::new(bytes, 0, NumpressCodec::Pic);
        cursor.decode_int().unwrap()
    }

    #[test]
    fn test_encode_int_known_patterns() {
        assert_eq!(nibbles_of(0), vec![8]);
        assert_eq!(nibbles_of(-1), vec![0xf, 0xf]);
        assert_eq!(nibbles_of(23), vec![6, 7, 1]);
        assert_eq!(nibbles_of(-2), vec![0xf, 0xe]);
        assert_eq!(nibbles_of(-256), vec![0xe, 0, 0]);
        assert_eq!(nibbles_of(i32::MIN), vec![0, 0, 0, 0, 0, 0, 0, 0, 8]);
        assert_eq!(nibbles_of(0x0fff_ffff).len(), 8);
        assert_eq!(nibbles_of(0x0fff_ffff)[0], 1);
    }

    #[test]
    fn test_int_round_trip_all_branches() {
        let values = [
            0,
            1,
            7,
            8,
            15,
            16,
            23,
            255,
            4096,
            0x00ff_ffff,
            0x0fff_ffff,
            0x1000_0000,
            0x7fff_ffff,
            i32::MAX,
            -1,
            -2,
            -15,
            -16,
            -17,
            -256,
            -65536,
            -0x0fff_ffff,
            -0x1000_0000,
            i32::MIN,
            i32::MIN + 1,
            0x5a5a_5a5a,
            -0x5a5a_5a5a,
        ];
        for x in values {
            let mut packer = NibblePacker::new(Vec::new());
            packer.push_int(x);
            let bytes = packer.finish();
            assert_eq!(decode_single(&bytes), x, "round trip failed for {}", x);
        }
    }

    #[test]
    fn test_packer_pads_odd_nibble_count() {
        let mut packer = NibblePacker::new(Vec::new());
        packer.push_int(0);
        packer.push_int(23);
        // [8, 6, 7, 1] -> 0x86, 0x71
        assert_eq!(packer.finish(), vec![0x86, 0x71]);

        let mut packer = NibblePacker::new(Vec::new());
        packer.push_int(23);
        // [6, 7, 1] -> 0x67, 0x10
        assert_eq!(packer.finish(), vec![0x67, 0x10]);
    }

    #[test]
    fn test_cursor_stops_at_padding() {
        let bytes = [0x67, 0x10];
        let mut cursor = NibbleCursor::new(&bytes, 0, NumpressCodec::Pic);
        assert_eq!(cursor.decode_int().unwrap(), 23);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_cursor_reads_trailing_zero_nibble() {
        // [6, 7, 1, 8] encodes 23 followed by 0, the final low nibble is data.
        let bytes = [0x67, 0x18];
        let mut cursor = NibbleCursor::new(&bytes, 0, NumpressCodec::Pic);
        assert_eq!(cursor.decode_int().unwrap(), 23);
        assert!(!cursor.is_exhausted());
        assert_eq!(cursor.decode_int().unwrap(), 0);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_cursor_truncated_mid_value() {
        // Head nibble 0 promises eight more nibbles.
        let bytes = [0x01, 0x23];
        let mut cursor = NibbleCursor::new(&bytes, 0, NumpressCodec::Linear);
        let err = cursor.decode_int().unwrap_err();
        assert!(matches!(
            err,
            CodecError::TruncatedData {
                codec: NumpressCodec::Linear,
                length: 2,
                ..
            }
        ));
    }
}
