//! ASN.1 PER primitive decoders used by the S1AP and SBC-AP dissectors, plus a
//! symmetric writer for building test vectors.
//!
//! This is the subset the 3GPP envelopes need: constrained whole numbers as
//! minimal-width bit-fields, single-fragment length determinants, and
//! byte-aligned open types. Fragmented determinants (lengths >= 16K) never
//! occur in these protocols and decode to a distinct error.

use crate::cursor::{Cursor, DecodeError};

/// Bit width of a constrained integer with the given inclusive range,
/// i.e. ceil(log2(max - min + 1)).
pub fn constrained_width(min: u64, max: u64) -> u32 {
    debug_assert!(min <= max);
    let range = max - min;
    if range == 0 { 0 } else { 64 - range.leading_zeros() }
}

/// PER constrained whole number: read the minimal bit width for [min, max]
/// and offset by min. Values decoding above `max` are a range violation.
pub fn read_constrained_int(cur: &mut Cursor, min: u64, max: u64) -> Result<u64, DecodeError> {
    let width = constrained_width(min, max);
    assert!(width <= 32, "constrained range too wide for bit-field form");
    let raw = cur.read_bits(width)? as u64;
    let value = min + raw;
    if value > max {
        return Err(DecodeError::ValueOutOfRange { value, min, max });
    }
    Ok(value)
}

/// PER length determinant, single-fragment forms only: one byte below 128,
/// the 14-bit two-byte form below 16K. The 0b11xxxxxx fragmented form is
/// unsupported and surfaces as its own error so callers can tell a structural
/// failure from a truncated buffer.
pub fn read_length_determinant(cur: &mut Cursor) -> Result<usize, DecodeError> {
    cur.align_to_byte();
    let first = cur.read_u8()?;
    if first & 0x80 == 0 {
        Ok(first as usize)
    } else if first & 0x40 == 0 {
        let second = cur.read_u8()?;
        Ok((((first & 0x3f) as usize) << 8) | second as usize)
    } else {
        Err(DecodeError::UnsupportedFragmentation(first))
    }
}

/// Byte-aligned open type: length determinant followed by that many bytes,
/// returned as a child cursor. The parent cursor advances past the whole
/// value regardless of how much of it the caller decodes.
pub fn read_open_type<'a>(cur: &mut Cursor<'a>) -> Result<Cursor<'a>, DecodeError> {
    let len = read_length_determinant(cur)?;
    cur.subrange(len)
}

/// Length-prefixed octet string; `size` gives a fixed constraint when the
/// ASN.1 type has one (no length determinant on the wire in that case).
pub fn read_octet_string<'a>(
    cur: &mut Cursor<'a>,
    size: Option<usize>,
) -> Result<&'a [u8], DecodeError> {
    let len = match size {
        Some(n) => n,
        None => read_length_determinant(cur)?,
    };
    cur.read_bytes(len)
}

/// Bit string up to 64 bits, returned value-left-aligned in a u64 together
/// with its bit count.
pub fn read_bit_string(cur: &mut Cursor, size: Option<u32>) -> Result<(u64, u32), DecodeError> {
    let nbits = match size {
        Some(n) => n as usize,
        None => read_length_determinant(cur)?,
    };
    assert!(nbits <= 64, "bit strings above 64 bits are not supported");
    let mut out: u64 = 0;
    let mut left = nbits as u32;
    while left > 0 {
        let chunk = left.min(32);
        out = (out << chunk) | cur.read_bits(chunk)? as u64;
        left -= chunk;
    }
    Ok((out, nbits as u32))
}

/// Bit-level writer mirroring the decode primitives, used to build PER test
/// vectors and reference encodings.
#[derive(Debug, Default)]
pub struct PerWriter {
    buf: Vec<u8>,
    bit: u8,
}

impl PerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bits(&mut self, value: u32, n: u32) {
        assert!(n <= 32);
        for i in (0..n).rev() {
            if self.bit == 0 {
                self.buf.push(0);
            }
            let bit = (value >> i) & 1;
            let last = self.buf.len() - 1;
            self.buf[last] |= (bit as u8) << (7 - self.bit);
            self.bit = (self.bit + 1) % 8;
        }
    }

    pub fn align_to_byte(&mut self) {
        self.bit = 0;
    }

    pub fn write_constrained_int(&mut self, value: u64, min: u64, max: u64) {
        assert!(min <= value && value <= max);
        self.write_bits((value - min) as u32, constrained_width(min, max));
    }

    pub fn write_length_determinant(&mut self, len: usize) {
        self.align_to_byte();
        if len < 0x80 {
            self.write_bits(len as u32, 8);
        } else {
            assert!(len < 0x4000, "fragmented lengths not supported");
            self.write_bits(0x8000 | len as u32, 16);
        }
        self.align_to_byte();
    }

    pub fn write_open_type(&mut self, value: &[u8]) {
        self.write_length_determinant(value.len());
        for &b in value {
            self.write_bits(b as u32, 8);
        }
        self.align_to_byte();
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrained_width() {
        assert_eq!(constrained_width(0, 0), 0);
        assert_eq!(constrained_width(0, 1), 1);
        assert_eq!(constrained_width(0, 2), 2);
        assert_eq!(constrained_width(0, 255), 8);
        assert_eq!(constrained_width(0, 65535), 16);
        assert_eq!(constrained_width(10, 13), 2);
    }

    #[test]
    fn test_constrained_int_round_trip_full_byte_range() {
        for v in 0u64..=255 {
            let mut w = PerWriter::new();
            w.write_constrained_int(v, 0, 255);
            let bytes = w.into_bytes();
            assert_eq!(bytes.len(), 1, "range [0,255] must be exactly 8 bits");
            let mut cur = Cursor::new(&bytes);
            assert_eq!(read_constrained_int(&mut cur, 0, 255).unwrap(), v);
        }
    }

    #[test]
    fn test_constrained_int_offset_range() {
        let mut w = PerWriter::new();
        w.write_constrained_int(12, 10, 13);
        let bytes = w.into_bytes();
        let mut cur = Cursor::new(&bytes);
        assert_eq!(read_constrained_int(&mut cur, 10, 13).unwrap(), 12);
    }

    #[test]
    fn test_constrained_int_out_of_range() {
        // range [0,2] is 2 bits; raw value 3 decodes above max
        let mut cur = Cursor::new(&[0b1100_0000]);
        assert!(matches!(
            read_constrained_int(&mut cur, 0, 2),
            Err(DecodeError::ValueOutOfRange {
                value: 3,
                min: 0,
                max: 2
            })
        ));
    }

    #[test]
    fn test_length_determinant_forms() {
        let mut cur = Cursor::new(&[0x2a]);
        assert_eq!(read_length_determinant(&mut cur).unwrap(), 42);

        let mut cur = Cursor::new(&[0x81, 0x00]);
        assert_eq!(read_length_determinant(&mut cur).unwrap(), 256);

        let mut cur = Cursor::new(&[0xc1]);
        assert!(matches!(
            read_length_determinant(&mut cur),
            Err(DecodeError::UnsupportedFragmentation(0xc1))
        ));
    }

    #[test]
    fn test_open_type_advances_parent_by_declared_length() {
        let mut w = PerWriter::new();
        w.write_open_type(&[0xde, 0xad, 0xbe]);
        w.write_bits(0xff, 8);
        let bytes = w.into_bytes();
        let mut cur = Cursor::new(&bytes);
        let mut inner = read_open_type(&mut cur).unwrap();
        assert_eq!(inner.read_u8().unwrap(), 0xde);
        // parent already sits past the open type
        assert_eq!(cur.read_u8().unwrap(), 0xff);
    }

    #[test]
    fn test_bit_string() {
        let mut w = PerWriter::new();
        w.write_bits(0b1011_0011_0100_0001, 16);
        let bytes = w.into_bytes();
        let mut cur = Cursor::new(&bytes);
        assert_eq!(
            read_bit_string(&mut cur, Some(16)).unwrap(),
            (0b1011_0011_0100_0001, 16)
        );
    }
}
