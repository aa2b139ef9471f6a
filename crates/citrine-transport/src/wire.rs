//! Wire formats: data datagrams, the FINACK trailer and cumulative acks.

use crate::consts::SEQ_ID_SIZE;
use crate::segment::Segment;
use bytes::Bytes;
use citrine_binary::{BinaryReader, BinaryResult, BinaryWriter, Readable, Writable};

/// Literal trailer of the transfer-terminating datagram.
pub const FINACK_PAYLOAD: &[u8] = b"==FINACK==";
/// Token the stop-and-wait peer returns to acknowledge end of file.
pub const FIN_TOKEN: &[u8] = b"fin";

/// Data datagram: big-endian signed sequence id followed by the payload.
/// An empty payload marks end of file.
#[derive(Debug, Clone)]
pub struct DataPacket<'a> {
    pub seq_id: i32,
    pub payload: &'a [u8],
}

impl<'a> DataPacket<'a> {
    pub fn from_segment(segment: &'a Segment) -> Self {
        Self {
            seq_id: segment.seq_id,
            payload: &segment.payload,
        }
    }

    pub fn encode(&self) -> BinaryResult<Bytes> {
        let mut writer = BinaryWriter::with_capacity(SEQ_ID_SIZE + self.payload.len());
        self.write(&mut writer)?;
        Ok(writer.freeze())
    }
}

impl Writable for DataPacket<'_> {
    fn write(&self, writer: &mut BinaryWriter) -> BinaryResult<()> {
        writer.write_i32_be(self.seq_id)?;
        writer.write_bytes(self.payload)?;
        Ok(())
    }
}

/// Terminating datagram: the current sequence id plus `==FINACK==`.
#[derive(Debug, Clone, Copy)]
pub struct Finack {
    pub seq_id: i32,
}

impl Finack {
    pub fn encode(&self) -> BinaryResult<Bytes> {
        let mut writer = BinaryWriter::with_capacity(SEQ_ID_SIZE + FINACK_PAYLOAD.len());
        self.write(&mut writer)?;
        Ok(writer.freeze())
    }
}

impl Writable for Finack {
    fn write(&self, writer: &mut BinaryWriter) -> BinaryResult<()> {
        writer.write_i32_be(self.seq_id)?;
        writer.write_bytes(FINACK_PAYLOAD)?;
        Ok(())
    }
}

/// Cumulative acknowledgement: the first four bytes are the big-endian byte
/// count the peer expects next. Trailing bytes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub ack_id: i32,
}

impl Ack {
    pub fn decode(datagram: &[u8]) -> BinaryResult<Self> {
        let mut reader = BinaryReader::from_slice(datagram);
        Self::read(&mut reader)
    }
}

impl Readable for Ack {
    fn read(reader: &mut BinaryReader) -> BinaryResult<Self> {
        let ack_id = reader.read_i32_be()?;
        Ok(Self { ack_id })
    }
}

/// True if the datagram contains the stop-and-wait EOF token anywhere.
pub fn contains_fin(datagram: &[u8]) -> bool {
    datagram.windows(FIN_TOKEN.len()).any(|window| window == FIN_TOKEN)
}
