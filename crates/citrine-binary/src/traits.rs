use crate::error::BinaryResult;
use crate::io::{BinaryReader, BinaryWriter};

/// Trait for types that can be read from a `BinaryReader`.
pub trait Readable: Sized {
    /// Reads an instance of `Self` from the reader.
    fn read(reader: &mut BinaryReader) -> BinaryResult<Self>;
}

/// Trait for types that can be written to a `BinaryWriter`.
pub trait Writable {
    /// Writes this instance to the writer.
    fn write(&self, writer: &mut BinaryWriter) -> BinaryResult<()>;
}

impl Readable for u8 {
    #[inline]
    fn read(reader: &mut BinaryReader) -> BinaryResult<Self> {
        reader.read_u8()
    }
}

impl Writable for u8 {
    #[inline]
    fn write(&self, writer: &mut BinaryWriter) -> BinaryResult<()> {
        writer.write_u8(*self)
    }
}

impl Readable for i32 {
    #[inline]
    fn read(reader: &mut BinaryReader) -> BinaryResult<Self> {
        reader.read_i32_be()
    }
}

impl Writable for i32 {
    #[inline]
    fn write(&self, writer: &mut BinaryWriter) -> BinaryResult<()> {
        writer.write_i32_be(*self)
    }
}
