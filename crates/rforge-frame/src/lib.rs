//! Link framing for telemetry devices.
//!
//! A device link speaks one of two formats:
//! - binary frames: `AA 55` marker, version, command, sequence, length,
//!   payload and a CRC16-CCITT trailer, all little-endian
//! - text: newline-terminated lines of comma-separated samples
//!
//! [`ProtocolArbiter`] feeds inbound bytes to both decoders and locks onto
//! whichever produces a frame first. Corrupt input is skipped and counted,
//! never surfaced as an error.

pub mod arbiter;
pub mod binary;
pub mod crc;
pub mod error;
pub mod frame;
pub mod reader;
pub mod text;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;

pub use arbiter::{Detection, ParserMode, ProtocolArbiter};
pub use binary::{
    decode_frame, encode_frame, BinaryCodec, BinaryConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE,
    PROTOCOL_VERSION, SOF,
};
pub use crc::{crc16_ccitt, crc16_ccitt_with, CRC16_INIT};
pub use error::{FrameError, Result};
pub use frame::{Command, Frame, FrameCodec, LinkCounters, Protocol};
pub use reader::FrameReader;
pub use text::{TextCodec, TextConfig, DEFAULT_MAX_LINE_LEN};
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use framed::LinkCodec;
