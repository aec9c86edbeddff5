//! Async link codec for `tokio_util::codec::{FramedRead, FramedWrite}`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::arbiter::{ParserMode, ProtocolArbiter};
use crate::error::FrameError;
use crate::frame::{Command, Frame, FrameCodec, LinkCounters};

/// Tokio codec wrapping a [`ProtocolArbiter`].
///
/// Inbound bytes are handed to the arbiter as soon as they arrive; decode
/// yields frames in arrival order.
#[derive(Debug, Default)]
pub struct LinkCodec {
    arbiter: ProtocolArbiter,
}

impl LinkCodec {
    pub fn new(mode: ParserMode) -> Self {
        Self::with_arbiter(ProtocolArbiter::new(mode))
    }

    pub fn with_arbiter(arbiter: ProtocolArbiter) -> Self {
        Self { arbiter }
    }

    pub fn arbiter(&self) -> &ProtocolArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ProtocolArbiter {
        &mut self.arbiter
    }

    pub fn counters(&self) -> LinkCounters {
        self.arbiter.counters()
    }
}

impl Decoder for LinkCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            let chunk = src.split();
            self.arbiter.feed(&chunk);
        }
        Ok(self.arbiter.pop_frame())
    }
}

impl Encoder<(Command, Bytes)> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: (Command, Bytes), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (command, payload) = item;
        self.arbiter.encode(command, &payload, dst)
    }
}
