//! # Frame Reader
//!
//! Bounds-checked little-endian reader, the mirror of `FrameWriter`.

use crate::error::{WireError, WireResult};

/// Cursor over a received frame.
#[derive(Clone, Debug)]
pub struct FrameReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> FrameReader<'a> {
    /// Creates a new reader from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the number of bytes consumed so far.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Takes the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> WireResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(WireError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buffer[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0_u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> WireResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> WireResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> WireResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a u64 in little-endian format.
    #[inline]
    pub fn read_u64(&mut self) -> WireResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads an i64 in little-endian format.
    #[inline]
    pub fn read_i64(&mut self) -> WireResult<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Reads a f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> WireResult<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads a f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> WireResult<f64> {
        self.read_u64().map(f64::from_bits)
    }

    /// Reads `n` bytes as UTF-8 text.
    pub fn read_str(&mut self, n: usize) -> WireResult<&'a str> {
        std::str::from_utf8(self.read_bytes(n)?).map_err(|_| WireError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let bytes = [0x02, 0x01, 0x00, 0x00, 0xc0, 0x3f];
        let mut reader = FrameReader::new(&bytes);
        assert_eq!(reader.read_u16(), Ok(0x0102));
        assert_eq!(reader.read_f32(), Ok(1.5));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated() {
        let bytes = [1, 2, 3];
        let mut reader = FrameReader::new(&bytes);
        assert_eq!(
            reader.read_u32(),
            Err(WireError::Truncated {
                needed: 4,
                remaining: 3
            })
        );
        // A failed read consumes nothing.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [0xff, 0xfe];
        let mut reader = FrameReader::new(&bytes);
        assert_eq!(reader.read_str(2), Err(WireError::InvalidUtf8));
    }
}
