//! Byte-level primitive decoders shared by the TLV protocols: the BSSGP
//! 1-or-2-byte length determinant (3GPP TS 48.016 §10.1.2) and BCD half-octet
//! digit pairs used by IMSI/MCC/MNC fields.

use crate::cursor::{Cursor, DecodeError};

pub const MAX_TWO_BYTE_LENGTH: usize = 0x7fff;

/// BSSGP length determinant: high bit set means the remaining 7 bits are the
/// length; high bit clear means those 7 bits are concatenated with the next
/// byte for a 15-bit length.
pub fn read_length(cur: &mut Cursor) -> Result<usize, DecodeError> {
    let first = cur.read_u8()?;
    if first & 0x80 != 0 {
        Ok((first & 0x7f) as usize)
    } else {
        let second = cur.read_u8()?;
        Ok(((first as usize) << 8) | second as usize)
    }
}

/// Encode counterpart of [`read_length`]. Lengths 0..=127 use the 1-byte form,
/// 128..=32767 the 2-byte form.
pub fn encode_length(len: usize) -> Vec<u8> {
    assert!(len <= MAX_TWO_BYTE_LENGTH, "length {len} not encodable");
    if len <= 0x7f {
        vec![0x80 | len as u8]
    } else {
        vec![(len >> 8) as u8, len as u8]
    }
}

/// Unpack BCD digit pairs, low nibble first per 3GPP numbering. `odd` drops
/// the final (filler) nibble. 0xF filler nibbles are skipped; other non-digit
/// nibbles render as '?'.
pub fn bcd_digits(bytes: &[u8], odd: bool) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    let mut push = |nibble: u8| match nibble {
        0..=9 => out.push((b'0' + nibble) as char),
        0xf => {}
        _ => out.push('?'),
    };
    for (i, &b) in bytes.iter().enumerate() {
        push(b & 0x0f);
        if !(odd && i == bytes.len() - 1) {
            push(b >> 4);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_forms() {
        let mut cur = Cursor::new(&[0x84]);
        assert_eq!(read_length(&mut cur).unwrap(), 4);

        let mut cur = Cursor::new(&[0x00, 0x80]);
        assert_eq!(read_length(&mut cur).unwrap(), 128);

        let mut cur = Cursor::new(&[0x7f, 0xff]);
        assert_eq!(read_length(&mut cur).unwrap(), 0x7fff);
    }

    #[test]
    fn test_length_round_trip() {
        for len in 0..=MAX_TWO_BYTE_LENGTH {
            let encoded = encode_length(len);
            if len <= 0x7f {
                assert_eq!(encoded.len(), 1, "length {len} should use 1-byte form");
                assert_ne!(encoded[0] & 0x80, 0);
            } else {
                assert_eq!(encoded.len(), 2, "length {len} should use 2-byte form");
                assert_eq!(encoded[0] & 0x80, 0);
            }
            let mut cur = Cursor::new(&encoded);
            assert_eq!(read_length(&mut cur).unwrap(), len);
            assert_eq!(cur.remaining(), 0);
        }
    }

    #[test]
    fn test_length_truncated_two_byte_form() {
        // 2-byte form with only one byte present: structural failure
        let mut cur = Cursor::new(&[0x01]);
        assert!(read_length(&mut cur).is_err());
    }

    #[test]
    fn test_bcd_digits() {
        // IMSI-style: digits 1,2,3,4,5 with odd length and trailing filler
        assert_eq!(bcd_digits(&[0x21, 0x43, 0xf5], true), "12345");
        assert_eq!(bcd_digits(&[0x21, 0x43], false), "1234");
        // filler mid-string is skipped, junk nibble marked
        assert_eq!(bcd_digits(&[0xf1, 0xb2], false), "12?");
    }
}
