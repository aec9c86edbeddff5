use bytes::{Bytes, BytesMut};

use crate::error::Result;

/// Device command identifiers carried in the binary header.
///
/// Codes outside the known set are kept verbatim in [`Command::Unknown`]
/// so that every byte value survives a decode/encode cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Liveness probe; the device answers with [`Command::Ack`].
    Ping,
    /// Generic acknowledgement.
    Ack,
    /// Start periodic channel streaming.
    StreamStart,
    /// Stop periodic channel streaming.
    StreamStop,
    /// Configure stream channel count and rate.
    SetStreamConfig,
    /// Request (or reply with) the device variable table.
    GetVarTable,
    /// Request (or reply with) a batch of memory reads.
    ReadMemBatch,
    /// Write one or more variables.
    WriteMem,
    /// Streamed channel samples.
    StreamData,
    /// Any other command byte.
    Unknown(u8),
}

impl Command {
    /// Map a wire byte to a command.
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x01 => Command::Ping,
            0x02 => Command::Ack,
            0x03 => Command::StreamStart,
            0x04 => Command::StreamStop,
            0x05 => Command::SetStreamConfig,
            0x10 => Command::GetVarTable,
            0x11 => Command::ReadMemBatch,
            0x12 => Command::WriteMem,
            0x20 => Command::StreamData,
            other => Command::Unknown(other),
        }
    }

    /// The wire byte for this command.
    pub fn as_u8(self) -> u8 {
        match self {
            Command::Ping => 0x01,
            Command::Ack => 0x02,
            Command::StreamStart => 0x03,
            Command::StreamStop => 0x04,
            Command::SetStreamConfig => 0x05,
            Command::GetVarTable => 0x10,
            Command::ReadMemBatch => 0x11,
            Command::WriteMem => 0x12,
            Command::StreamData => 0x20,
            Command::Unknown(code) => code,
        }
    }

    /// Human-readable name, as used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Ack => "ACK",
            Command::StreamStart => "STREAM_START",
            Command::StreamStop => "STREAM_STOP",
            Command::SetStreamConfig => "SET_STREAM_CONFIG",
            Command::GetVarTable => "GET_VAR_TABLE",
            Command::ReadMemBatch => "READ_MEM_BATCH",
            Command::WriteMem => "WRITE_MEM",
            Command::StreamData => "STREAM_DATA",
            Command::Unknown(_) => "UNKNOWN",
        }
    }

    /// Parse a command from its name (case-insensitive) or a numeric code
    /// (`0x`-prefixed hex or decimal).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
        {
            return u8::from_str_radix(hex, 16).ok().map(Self::from_u8);
        }
        if let Ok(code) = text.parse::<u8>() {
            return Some(Self::from_u8(code));
        }
        let upper = text.to_ascii_uppercase().replace('-', "_");
        (0..=u8::MAX)
            .map(Self::from_u8)
            .find(|cmd| !matches!(cmd, Command::Unknown(_)) && cmd.name() == upper)
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        Self::from_u8(code)
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd.as_u8()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Unknown(code) => write!(f, "UNKNOWN(0x{code:02X})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One fully decoded link message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command identifier.
    pub command: Command,
    /// Sender sequence number (always 0 for text frames).
    pub sequence: u16,
    /// Message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: Command, sequence: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            sequence,
            payload: payload.into(),
        }
    }
}

/// The two wire formats a link may speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Length-prefixed, CRC-protected binary frames.
    Binary,
    /// Newline-delimited comma-separated text.
    Text,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Binary => "binary",
            Protocol::Text => "text",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cumulative link-quality counters.
///
/// Monotonic until an explicit reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkCounters {
    /// Binary frames rejected because the trailer CRC did not match.
    pub crc_errors: u64,
    /// Binary headers rejected because the declared length exceeded the maximum.
    pub oversize_payloads: u64,
    /// Text lines discarded for exceeding the line limit.
    pub overlong_lines: u64,
    /// Frames successfully decoded.
    pub frames_decoded: u64,
}

impl LinkCounters {
    /// Sum of all rejection counters.
    pub fn total_errors(&self) -> u64 {
        self.crc_errors + self.oversize_payloads + self.overlong_lines
    }

    pub(crate) fn merge(self, other: LinkCounters) -> LinkCounters {
        LinkCounters {
            crc_errors: self.crc_errors + other.crc_errors,
            oversize_payloads: self.oversize_payloads + other.oversize_payloads,
            overlong_lines: self.overlong_lines + other.overlong_lines,
            frames_decoded: self.frames_decoded + other.frames_decoded,
        }
    }
}

/// A stateful decoder/encoder for one wire format.
///
/// Implementations are single-producer: one task feeds bytes and drains
/// frames.
pub trait FrameCodec {
    /// Append inbound bytes and decode every frame that became complete.
    fn feed(&mut self, bytes: &[u8]);

    /// Take the oldest decoded frame, if any.
    fn pop_frame(&mut self) -> Option<Frame>;

    /// Encode an outbound command into `dst`.
    fn encode(&mut self, command: Command, payload: &[u8], dst: &mut BytesMut) -> Result<()>;

    /// Clear buffered bytes, queued frames and counters.
    fn reset(&mut self);

    /// Current counters.
    fn counters(&self) -> LinkCounters;
}
