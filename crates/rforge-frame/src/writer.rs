use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::arbiter::{ParserMode, ProtocolArbiter};
use crate::error::{FrameError, Result};
use crate::frame::{Command, Frame, FrameCodec};

/// Writes commands to any `Write` link.
///
/// Encoding is delegated to a [`ProtocolArbiter`], so the wire format
/// follows its mode (binary while undetected).
pub struct FrameWriter<T> {
    inner: T,
    arbiter: ProtocolArbiter,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    /// Create a writer with an auto-mode arbiter.
    pub fn new(inner: T) -> Self {
        Self::with_arbiter(inner, ProtocolArbiter::new(ParserMode::Auto))
    }

    /// Create a writer around a pre-configured arbiter.
    pub fn with_arbiter(inner: T, arbiter: ProtocolArbiter) -> Self {
        Self {
            inner,
            arbiter,
            buf: BytesMut::new(),
        }
    }

    /// Encode and send a command.
    pub fn send(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        self.arbiter.encode(command, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Re-send a decoded frame's command and payload.
    ///
    /// The sequence number is assigned by the writer's own codec.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.command, frame.payload.as_ref())
    }

    /// Flush the underlying link.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    pub fn arbiter(&self) -> &ProtocolArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ProtocolArbiter {
        &mut self.arbiter
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
