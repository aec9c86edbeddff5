use bytes::{BufMut, Bytes, BytesMut};

/// File magic: ASCII `RFR1`.
pub const MAGIC: [u8; 4] = *b"RFR1";

/// `[startTs:u64][endTs:u64][len:u32]`.
pub const CHUNK_HEADER_LEN: usize = 8 + 8 + 4;

/// Largest payload a reader accepts: 4 MiB.
pub const DEFAULT_MAX_CHUNK_PAYLOAD: usize = 4 * 1024 * 1024;

/// One persisted streaming payload.
///
/// The payload is stored encoded, so replay runs it back through the
/// stream codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordChunk {
    pub start_ts: u64,
    pub end_ts: u64,
    pub payload: Bytes,
}

impl RecordChunk {
    pub fn new(start_ts: u64, end_ts: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            start_ts,
            end_ts,
            payload: payload.into(),
        }
    }

    /// Bytes this chunk occupies on disk.
    pub fn encoded_len(&self) -> usize {
        CHUNK_HEADER_LEN + self.payload.len()
    }

    /// Append the on-disk form to `dst`. The payload length must fit `u32`.
    pub(crate) fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u64_le(self.start_ts);
        dst.put_u64_le(self.end_ts);
        dst.put_u32_le(self.payload.len() as u32);
        dst.put_slice(&self.payload);
    }
}
