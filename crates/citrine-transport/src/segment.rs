//! Segments and the segmenter that produces them from an input stream.

use crate::consts::MESSAGE_SIZE;
use bytes::Bytes;
use std::io::{self, Read};
use std::time::Instant;

/// One numbered fragment of the input stream, transmitted as one datagram.
///
/// `seq_id` is the byte offset at which the payload begins, which doubles as
/// the wire sequence id. The fields below the payload are sender-side
/// metadata and never reach the wire.
#[derive(Debug, Clone)]
pub struct Segment {
    pub seq_id: i32,
    /// Stamped on the first wire emission; retransmits keep the original.
    pub send_time: Option<Instant>,
    pub payload: Bytes,
    pub in_transit: bool,
    /// Vegas rate-probe anchor. At most one window segment carries this.
    pub distinguished: bool,
    /// Expected throughput at the moment the segment was last emitted (Vegas).
    pub sampled_rate: Option<f64>,
}

impl Segment {
    pub fn new(seq_id: i32, payload: Bytes) -> Self {
        Self {
            seq_id,
            send_time: None,
            payload,
            in_transit: false,
            distinguished: false,
            sampled_rate: None,
        }
    }
}

/// Chops a byte stream into numbered segments of at most `MESSAGE_SIZE`
/// bytes. The final segment may be shorter; no chunk is ever held back.
#[derive(Debug)]
pub struct Segmenter<R> {
    reader: R,
    next_seq_id: i32,
    finished: bool,
}

impl<R: Read> Segmenter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_seq_id: 0,
            finished: false,
        }
    }

    /// Sequence id the next produced segment will carry; after end of stream,
    /// the total number of payload bytes produced.
    pub fn next_seq_id(&self) -> i32 {
        self.next_seq_id
    }

    /// Returns the next segment, or `None` once the stream is exhausted.
    pub fn next_segment(&mut self) -> io::Result<Option<Segment>> {
        if self.finished {
            return Ok(None);
        }

        let mut chunk = [0u8; MESSAGE_SIZE];
        let mut filled = 0;
        while filled < MESSAGE_SIZE {
            match self.reader.read(&mut chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }

        let segment = Segment::new(self.next_seq_id, Bytes::copy_from_slice(&chunk[..filled]));
        self.next_seq_id += filled as i32;
        Ok(Some(segment))
    }
}
