use std::collections::VecDeque;

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use crate::crc::crc16_ccitt;
use crate::error::{FrameError, Result};
use crate::frame::{Command, Frame, FrameCodec, LinkCounters};

/// Start-of-frame marker: 0xAA 0x55.
pub const SOF: [u8; 2] = [0xAA, 0x55];

/// Header: SOF (2) + version (1) + command (1) + sequence (2) + length (2).
pub const HEADER_SIZE: usize = 8;

/// CRC trailer size.
pub const TRAILER_SIZE: usize = 2;

/// Protocol version written by the encoder.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Default maximum payload size: 1 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

const MIN_FRAME_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// Encode a frame into the binary wire format.
///
/// Wire format (little-endian):
/// ```text
/// ┌──────────┬─────────┬─────────┬───────────┬───────────┬──────────────┬───────────┐
/// │ SOF (2B) │ Version │ Command │ Seq (2B)  │ Len (2B)  │ Payload      │ CRC (2B)  │
/// │ AA 55    │ (1B)    │ (1B)    │           │           │ (Len bytes)  │           │
/// └──────────┴─────────┴─────────┴───────────┴───────────┴──────────────┴───────────┘
/// ```
/// The CRC covers everything from the version byte to the end of the payload.
pub fn encode_frame(
    command: Command,
    sequence: u16,
    payload: &[u8],
    max_payload: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    let max = max_payload.min(u16::MAX as usize);
    if payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }

    let start = dst.len();
    dst.reserve(MIN_FRAME_SIZE + payload.len());
    dst.put_slice(&SOF);
    dst.put_u8(PROTOCOL_VERSION);
    dst.put_u8(command.as_u8());
    dst.put_u16_le(sequence);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    let crc = crc16_ccitt(&dst[start + SOF.len()..]);
    dst.put_u16_le(crc);
    Ok(())
}

/// Decode the next valid frame from `src`, resynchronising past garbage.
///
/// Returns `None` when more bytes are needed. Consumed and discarded bytes
/// are removed from `src`; an incomplete frame stays buffered. Oversize
/// lengths and CRC mismatches drop one byte, bump the matching counter and
/// rescan.
pub fn decode_frame(
    src: &mut BytesMut,
    max_payload: usize,
    counters: &mut LinkCounters,
) -> Option<Frame> {
    loop {
        if src.len() < MIN_FRAME_SIZE {
            return None;
        }

        match find_marker(src) {
            Some(0) => {}
            Some(offset) => {
                debug!(skipped = offset, "discarding bytes before frame marker");
                src.advance(offset);
            }
            None => {
                // A trailing SOF0 may be the first half of a split marker.
                let keep = usize::from(src.last() == Some(&SOF[0]));
                src.advance(src.len() - keep);
                return None;
            }
        }

        if src.len() < MIN_FRAME_SIZE {
            return None;
        }

        let payload_len = u16::from_le_bytes([src[6], src[7]]) as usize;
        if payload_len > max_payload {
            counters.oversize_payloads += 1;
            debug!(payload_len, max_payload, "oversize frame length, resyncing");
            src.advance(1);
            continue;
        }

        let crc_offset = HEADER_SIZE + payload_len;
        let total = crc_offset + TRAILER_SIZE;
        if src.len() < total {
            return None;
        }

        let expected = u16::from_le_bytes([src[crc_offset], src[crc_offset + 1]]);
        let actual = crc16_ccitt(&src[SOF.len()..crc_offset]);
        if expected != actual {
            counters.crc_errors += 1;
            debug!(expected, actual, "frame CRC mismatch, resyncing");
            src.advance(1);
            continue;
        }

        let command = Command::from_u8(src[3]);
        let sequence = u16::from_le_bytes([src[4], src[5]]);
        src.advance(HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        src.advance(TRAILER_SIZE);
        counters.frames_decoded += 1;

        return Some(Frame {
            command,
            sequence,
            payload,
        });
    }
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(SOF.len()).position(|window| window == SOF)
}

/// Configuration for the binary codec.
#[derive(Debug, Clone)]
pub struct BinaryConfig {
    /// Maximum payload size in bytes, both directions. Default: 1 KiB.
    pub max_payload: usize,
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Stateful codec for the CRC-protected binary format.
///
/// Buffers partial input across [`feed`](FrameCodec::feed) calls and numbers
/// outbound frames with a wrapping 16-bit sequence.
#[derive(Debug)]
pub struct BinaryCodec {
    buf: BytesMut,
    frames: VecDeque<Frame>,
    next_sequence: u16,
    counters: LinkCounters,
    config: BinaryConfig,
}

impl BinaryCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(BinaryConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: BinaryConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(2 * (config.max_payload + MIN_FRAME_SIZE)),
            frames: VecDeque::new(),
            next_sequence: 0,
            counters: LinkCounters::default(),
            config,
        }
    }

    /// Sequence number the next encoded frame will carry.
    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    /// Bytes currently buffered awaiting a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Current codec configuration.
    pub fn config(&self) -> &BinaryConfig {
        &self.config
    }

    /// Drop buffered bytes and queued frames, keeping counters.
    pub(crate) fn discard_pending(&mut self) {
        self.buf.clear();
        self.frames.clear();
    }
}

impl Default for BinaryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec for BinaryCodec {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        while let Some(frame) =
            decode_frame(&mut self.buf, self.config.max_payload, &mut self.counters)
        {
            self.frames.push_back(frame);
        }
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    fn encode(&mut self, command: Command, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        encode_frame(
            command,
            self.next_sequence,
            payload,
            self.config.max_payload,
            dst,
        )?;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Ok(())
    }

    fn reset(&mut self) {
        self.discard_pending();
        self.counters = LinkCounters::default();
    }

    fn counters(&self) -> LinkCounters {
        self.counters
    }
}
