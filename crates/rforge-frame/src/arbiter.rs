use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

use crate::binary::{BinaryCodec, BinaryConfig};
use crate::error::Result;
use crate::frame::{Command, Frame, FrameCodec, LinkCounters, Protocol};
use crate::text::{TextCodec, TextConfig};

/// Which wire format(s) the arbiter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserMode {
    /// Try both formats and lock onto the first that decodes.
    #[default]
    Auto,
    /// Binary frames only.
    Binary,
    /// Text lines only.
    Text,
}

impl ParserMode {
    pub fn name(self) -> &'static str {
        match self {
            ParserMode::Auto => "auto",
            ParserMode::Binary => "binary",
            ParserMode::Text => "text",
        }
    }
}

/// Auto-detection progress while in [`ParserMode::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detection {
    /// No frame has decoded yet.
    #[default]
    Undetected,
    /// The binary codec produced the first frame.
    LockedBinary,
    /// The text codec produced the first frame.
    LockedText,
}

impl Detection {
    fn protocol(self) -> Option<Protocol> {
        match self {
            Detection::Undetected => None,
            Detection::LockedBinary => Some(Protocol::Binary),
            Detection::LockedText => Some(Protocol::Text),
        }
    }
}

/// Routes link bytes to the binary and text codecs.
///
/// In auto mode both codecs see every byte until one of them yields a
/// frame; that codec is then the only one used until
/// [`set_mode`](Self::set_mode) or [`reset`](Self::reset). Binary is polled
/// first because its CRC makes a false lock far less likely.
///
/// After the lock the losing codec is no longer fed, so its counters in
/// [`counters`](FrameCodec::counters) stay at their values from lock time.
#[derive(Debug)]
pub struct ProtocolArbiter {
    mode: ParserMode,
    detection: Detection,
    binary: BinaryCodec,
    text: TextCodec,
}

impl ProtocolArbiter {
    /// Create an arbiter with default codec configuration.
    pub fn new(mode: ParserMode) -> Self {
        Self::with_config(mode, BinaryConfig::default(), TextConfig::default())
    }

    /// Create an arbiter with explicit codec configuration.
    pub fn with_config(mode: ParserMode, binary: BinaryConfig, text: TextConfig) -> Self {
        Self {
            mode,
            detection: Detection::Undetected,
            binary: BinaryCodec::with_config(binary),
            text: TextCodec::with_config(text),
        }
    }

    /// Configured mode.
    pub fn mode(&self) -> ParserMode {
        self.mode
    }

    /// Auto-detection state (always `Undetected` in explicit modes).
    pub fn detection(&self) -> Detection {
        self.detection
    }

    /// Protocol currently in effect, if one is known.
    pub fn active_protocol(&self) -> Option<Protocol> {
        match self.mode {
            ParserMode::Binary => Some(Protocol::Binary),
            ParserMode::Text => Some(Protocol::Text),
            ParserMode::Auto => self.detection.protocol(),
        }
    }

    /// Switch mode, clearing the detection lock and both codecs.
    pub fn set_mode(&mut self, mode: ParserMode) {
        debug!(from = self.mode.name(), to = mode.name(), "parser mode change");
        self.mode = mode;
        self.reset();
    }

    /// Encode an outbound command into a fresh buffer.
    ///
    /// Uses the active protocol, or binary while auto-detection is still
    /// undecided.
    pub fn encode_command(&mut self, command: Command, payload: &[u8]) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        FrameCodec::encode(self, command, payload, &mut dst)?;
        Ok(dst.freeze())
    }

    fn lock(&mut self, detection: Detection) {
        self.detection = detection;
        // The losing codec's output is never polled again.
        match detection {
            Detection::LockedBinary => self.text.discard_pending(),
            Detection::LockedText => self.binary.discard_pending(),
            Detection::Undetected => {}
        }
        if let Some(protocol) = detection.protocol() {
            info!(%protocol, "link protocol detected");
        }
    }
}

impl Default for ProtocolArbiter {
    fn default() -> Self {
        Self::new(ParserMode::Auto)
    }
}

impl FrameCodec for ProtocolArbiter {
    fn feed(&mut self, bytes: &[u8]) {
        match (self.mode, self.detection) {
            (ParserMode::Binary, _) | (ParserMode::Auto, Detection::LockedBinary) => {
                self.binary.feed(bytes)
            }
            (ParserMode::Text, _) | (ParserMode::Auto, Detection::LockedText) => {
                self.text.feed(bytes)
            }
            (ParserMode::Auto, Detection::Undetected) => {
                self.binary.feed(bytes);
                self.text.feed(bytes);
            }
        }
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        match (self.mode, self.detection) {
            (ParserMode::Binary, _) | (ParserMode::Auto, Detection::LockedBinary) => {
                self.binary.pop_frame()
            }
            (ParserMode::Text, _) | (ParserMode::Auto, Detection::LockedText) => {
                self.text.pop_frame()
            }
            (ParserMode::Auto, Detection::Undetected) => {
                if let Some(frame) = self.binary.pop_frame() {
                    self.lock(Detection::LockedBinary);
                    return Some(frame);
                }
                let frame = self.text.pop_frame()?;
                self.lock(Detection::LockedText);
                Some(frame)
            }
        }
    }

    fn encode(&mut self, command: Command, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        match self.active_protocol().unwrap_or(Protocol::Binary) {
            Protocol::Binary => self.binary.encode(command, payload, dst),
            Protocol::Text => self.text.encode(command, payload, dst),
        }
    }

    /// Clears the detection lock, both codecs' buffers and their counters.
    fn reset(&mut self) {
        self.detection = Detection::Undetected;
        self.binary.reset();
        self.text.reset();
    }

    fn counters(&self) -> LinkCounters {
        self.binary.counters().merge(self.text.counters())
    }
}
