use std::collections::VecDeque;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::Result;
use crate::frame::{Command, Frame, FrameCodec, LinkCounters};

/// Line terminator.
pub const LINE_END: u8 = b'\n';

/// Default maximum line length (bytes, excluding the terminator).
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Configuration for the text line codec.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Longest accepted line. Longer unterminated input is discarded.
    pub max_line_len: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

/// Codec for newline-delimited comma-separated samples.
///
/// Every non-blank line becomes a [`Command::StreamData`] frame with
/// sequence 0 and the trimmed line as payload.
#[derive(Debug)]
pub struct TextCodec {
    buf: BytesMut,
    frames: VecDeque<Frame>,
    counters: LinkCounters,
    config: TextConfig,
    discarding: bool,
}

impl TextCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(TextConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: TextConfig) -> Self {
        Self {
            buf: BytesMut::new(),
            frames: VecDeque::new(),
            counters: LinkCounters::default(),
            config,
            discarding: false,
        }
    }

    /// Bytes currently buffered awaiting a newline.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop buffered bytes and queued frames, keeping counters.
    pub(crate) fn discard_pending(&mut self) {
        self.buf.clear();
        self.frames.clear();
        self.discarding = false;
    }

    fn push_line(&mut self, line: BytesMut) {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            return;
        }
        self.counters.frames_decoded += 1;
        self.frames.push_back(Frame::new(
            Command::StreamData,
            0,
            Bytes::copy_from_slice(trimmed),
        ));
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec for TextCodec {
    fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);

        while let Some(idx) = self.buf.iter().position(|&b| b == LINE_END) {
            let line = self.buf.split_to(idx);
            self.buf.advance(1);
            if std::mem::take(&mut self.discarding) {
                // Tail of an overlong line.
                continue;
            }
            if line.len() > self.config.max_line_len {
                self.counters.overlong_lines += 1;
                debug!(len = line.len(), "discarding overlong text line");
                continue;
            }
            self.push_line(line);
        }

        if self.buf.len() > self.config.max_line_len {
            if !self.discarding {
                self.counters.overlong_lines += 1;
                debug!(len = self.buf.len(), "discarding unterminated text line");
            }
            self.discarding = true;
            self.buf.clear();
        }
    }

    fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Text framing carries no command; `command` is ignored.
    fn encode(&mut self, _command: Command, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        dst.reserve(payload.len() + 1);
        dst.put_slice(payload);
        dst.put_u8(LINE_END);
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
