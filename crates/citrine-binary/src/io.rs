use crate::error::{BinaryError, BinaryResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Cursor over an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buffer: Bytes,
}

impl BinaryReader {
    pub fn new(buffer: Bytes) -> Self {
        Self { buffer }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            buffer: Bytes::copy_from_slice(data),
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buffer.has_remaining()
    }

    fn ensure(&self, needed: usize) -> BinaryResult<()> {
        if self.buffer.remaining() < needed {
            return Err(BinaryError::UnexpectedEof {
                needed,
                remaining: self.buffer.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> BinaryResult<u8> {
        self.ensure(1)?;
        Ok(self.buffer.get_u8())
    }

    pub fn read_i32_be(&mut self) -> BinaryResult<i32> {
        self.ensure(4)?;
        Ok(self.buffer.get_i32())
    }

    /// Reads exactly `len` bytes as an owned slice of the underlying buffer.
    pub fn read_bytes(&mut self, len: usize) -> BinaryResult<Bytes> {
        self.ensure(len)?;
        Ok(self.buffer.copy_to_bytes(len))
    }

    /// Consumes and returns everything left in the buffer.
    pub fn read_remaining(&mut self) -> Bytes {
        let len = self.buffer.remaining();
        self.buffer.copy_to_bytes(len)
    }
}

/// Growable byte buffer with the write-side counterparts of `BinaryReader`.
/// Writes cannot fail today; the `Result` signatures match the `Writable` trait.
#[derive(Debug, Clone, Default)]
pub struct BinaryWriter {
    buffer: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) -> BinaryResult<()> {
        self.buffer.put_u8(value);
        Ok(())
    }

    pub fn write_i32_be(&mut self, value: i32) -> BinaryResult<()> {
        self.buffer.put_i32(value);
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> BinaryResult<()> {
        self.buffer.put_slice(data);
        Ok(())
    }

    pub fn freeze(self) -> Bytes {
        self.buffer.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_i32_be() {
        let mut writer = BinaryWriter::new();
        writer.write_i32_be(-1).unwrap();
        writer.write_i32_be(1020).unwrap();
        let frozen = writer.freeze();
        assert_eq!(frozen.as_ref(), &[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x03, 0xFC]);

        let mut reader = BinaryReader::new(frozen);
        assert_eq!(reader.read_i32_be().unwrap(), -1);
        assert_eq!(reader.read_i32_be().unwrap(), 1020);
        assert!(!reader.has_remaining());
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = BinaryReader::from_slice(&[0x01, 0x02]);
        let result = reader.read_i32_be();
        assert!(matches!(
            result,
            Err(BinaryError::UnexpectedEof { needed: 4, remaining: 2 })
        ));
        // The failed read must not consume anything.
        assert_eq!(reader.read_u8().unwrap(), 0x01);
    }

    #[test]
    fn test_read_remaining_drains_buffer() {
        let mut reader = BinaryReader::from_slice(&[0x00, 0x00, 0x00, 0x05, 0xAA, 0xBB]);
        reader.read_i32_be().unwrap();
        assert_eq!(reader.read_remaining().as_ref(), &[0xAA, 0xBB]);
        assert_eq!(reader.remaining(), 0);
    }
}
