//! Strict byte reader for the mesh container format
//!
//! Unlike a lenient network buffer, every read here is bounds-checked and a
//! short buffer aborts the whole decode.

use super::{DecodeError, DecodeResult};
use byteorder::{ByteOrder, LittleEndian};

/// Cursor over a little-endian byte slice
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Fail with an out-of-range error unless `n` bytes are available
    pub fn check_remaining(&self, n: usize) -> DecodeResult<()> {
        if self.remaining() < n {
            Err(DecodeError::OutOfRange {
                offset: self.position,
                wanted: n,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        self.check_remaining(n)?;
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_u16(&mut self) -> DecodeResult<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn get_u32(&mut self) -> DecodeResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn get_f32(&mut self) -> DecodeResult<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    /// Read `count` consecutive f32 values
    pub fn get_f32_array(&mut self, count: usize) -> DecodeResult<Vec<f32>> {
        let bytes = count.checked_mul(4).ok_or(DecodeError::OutOfRange {
            offset: self.position,
            wanted: usize::MAX,
            remaining: self.remaining(),
        })?;
        let raw = self.take(bytes)?;
        let mut out = vec![0.0f32; count];
        LittleEndian::read_f32_into(raw, &mut out);
        Ok(out)
    }

    pub fn get_u16_array(&mut self, count: usize) -> DecodeResult<Vec<u16>> {
        let raw = self.take(count.saturating_mul(2))?;
        let mut out = vec![0u16; count];
        LittleEndian::read_u16_into(raw, &mut out);
        Ok(out)
    }

    pub fn get_u32_array(&mut self, count: usize) -> DecodeResult<Vec<u32>> {
        let raw = self.take(count.saturating_mul(4))?;
        let mut out = vec![0u32; count];
        LittleEndian::read_u32_into(raw, &mut out);
        Ok(out)
    }

    /// String with a 2-byte length prefix followed by UTF-8 bytes
    pub fn get_string(&mut self) -> DecodeResult<String> {
        let len = self.get_u16()? as usize;
        let offset = self.position;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.get_u8().unwrap(), 0x01);
        assert_eq!(reader.get_u32().unwrap(), 0x05040302);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_string_is_range_error() {
        // Declares 10 bytes but carries 3
        let data = [10, 0, b'a', b'b', b'c'];
        let mut reader = ByteReader::new(&data);
        match reader.get_string() {
            Err(DecodeError::OutOfRange { offset, wanted, remaining }) => {
                assert_eq!(offset, 2);
                assert_eq!(wanted, 10);
                assert_eq!(remaining, 3);
            }
            other => panic!("expected range error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let data = [1, 2];
        let mut reader = ByteReader::new(&data);
        assert!(reader.get_u32().is_err());
        assert_eq!(reader.position(), 0);
    }
}
