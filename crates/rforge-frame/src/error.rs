/// Errors that can occur while encoding frames or moving them over a link.
///
/// Framing faults on the inbound side (bad CRC, oversize length) are not
/// errors: the decoder resynchronises and counts them in
/// [`LinkCounters`](crate::LinkCounters).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
