use std::path::PathBuf;

/// Errors from record files and exports.
///
/// A truncated or corrupt record tail is not an error: reading simply
/// ends at the last complete chunk.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not start with the record magic.
    #[error("not a record file (bad magic): {}", path.display())]
    BadMagic { path: PathBuf },

    /// Append or flush with no open record.
    #[error("no record is open")]
    NotRecording,

    /// Export requested with zero rows.
    #[error("nothing to export")]
    NothingToExport,

    #[error("chunk payload too large ({size} bytes, max {max})")]
    ChunkTooLarge { size: usize, max: usize },

    #[error("operation cancelled")]
    Cancelled,

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
}

impl RecordError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;
