use rforge_frame::FrameError;

/// Errors from the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Encoding an outbound command failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The event receiver was dropped.
    #[error("event receiver closed")]
    EventsClosed,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
