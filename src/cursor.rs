//! Bounds-checked sequential reads over an immutable message buffer, in both
//! byte-granular and PER-style bit-granular modes. Every dissector in this crate
//! reads through a [`Cursor`]; a read past the end of the buffer is always an
//! [`DecodeError::OutOfBounds`], never garbage and never a panic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("read of {needed} bytes at offset {offset} exceeds buffer ({available} left)")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("value {value} outside expected range {min}..={max}")]
    ValueOutOfRange { value: u64, min: u64, max: u64 },
    #[error("fragmented PER length determinant (first byte {0:#04x}) is not supported")]
    UnsupportedFragmentation(u8),
    #[error("framing error: {0}")]
    Framing(String),
}

/// Read position over a borrowed buffer. `base` is the offset of `buf[0]`
/// within the top-level message, so sub-cursors carved out of a TLV value
/// still report provenance relative to the original input.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    base: usize,
    pos: usize,
    bit: u8,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Cursor {
            buf,
            base: 0,
            pos: 0,
            bit: 0,
        }
    }

    /// Byte offset within this cursor's buffer.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Byte offset relative to the top-level message buffer.
    pub fn abs_pos(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn out_of_bounds(&self, needed: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            offset: self.abs_pos(),
            needed,
            available: self.remaining(),
        }
    }

    /// Round up to the next byte boundary after bit-granular reads.
    pub fn align_to_byte(&mut self) {
        if self.bit != 0 {
            self.bit = 0;
            self.pos += 1;
        }
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        if self.remaining() < 1 {
            return Err(self.out_of_bounds(1));
        }
        Ok(self.buf[self.pos])
    }

    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(self.out_of_bounds(n));
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.align_to_byte();
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u24_be(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_bytes(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.align_to_byte();
        let out = self.peek_bytes(n)?;
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Bit-granular read, MSB first, spanning byte boundaries. `n` must be at
    /// most 32.
    pub fn read_bits(&mut self, n: u32) -> Result<u32, DecodeError> {
        assert!(n <= 32, "read_bits supports at most 32 bits");
        let avail_bits = self.remaining() * 8 - self.bit as usize;
        if n as usize > avail_bits {
            return Err(self.out_of_bounds(n.div_ceil(8) as usize));
        }
        let mut out: u32 = 0;
        for _ in 0..n {
            let bit = (self.buf[self.pos] >> (7 - self.bit)) & 1;
            out = (out << 1) | bit as u32;
            self.bit += 1;
            if self.bit == 8 {
                self.bit = 0;
                self.pos += 1;
            }
        }
        Ok(out)
    }

    /// Carve a child cursor over the next `len` bytes and advance this cursor
    /// past them. The child keeps absolute provenance offsets. This is how the
    /// IE engine enforces declared-length authority: the parent moves by the
    /// declared length no matter how much of the child the value decoder
    /// consumes.
    pub fn subrange(&mut self, len: usize) -> Result<Cursor<'a>, DecodeError> {
        self.align_to_byte();
        if self.remaining() < len {
            return Err(self.out_of_bounds(len));
        }
        let child = Cursor {
            buf: &self.buf[self.pos..self.pos + len],
            base: self.base + self.pos,
            pos: 0,
            bit: 0,
        };
        self.pos += len;
        Ok(child)
    }
}
