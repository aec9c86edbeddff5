use std::io::{ErrorKind, Read};

use crate::arbiter::{ParserMode, ProtocolArbiter};
use crate::error::{FrameError, Result};
use crate::frame::{Frame, FrameCodec, LinkCounters};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` link (serial port, file, pipe).
///
/// Bytes go through a [`ProtocolArbiter`], so a reader in
/// [`ParserMode::Auto`] locks onto whichever format the device speaks.
pub struct FrameReader<T> {
    inner: T,
    arbiter: ProtocolArbiter,
}

impl<T: Read> FrameReader<T> {
    /// Create a reader that auto-detects the link protocol.
    pub fn new(inner: T) -> Self {
        Self::with_arbiter(inner, ProtocolArbiter::new(ParserMode::Auto))
    }

    /// Create a reader around a pre-configured arbiter.
    pub fn with_arbiter(inner: T, arbiter: ProtocolArbiter) -> Self {
        Self { inner, arbiter }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` at EOF, including EOF in
    /// the middle of a frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(frame) = self.arbiter.pop_frame() {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.arbiter.feed(&chunk[..read]);
        }
    }

    /// Borrow the protocol arbiter.
    pub fn arbiter(&self) -> &ProtocolArbiter {
        &self.arbiter
    }

    /// Mutably borrow the protocol arbiter (e.g. to change mode).
    pub fn arbiter_mut(&mut self) -> &mut ProtocolArbiter {
        &mut self.arbiter
    }

    /// Link counters accumulated so far.
    pub fn counters(&self) -> LinkCounters {
        self.arbiter.counters()
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner link.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until EOF; `ConnectionClosed` ends iteration.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
