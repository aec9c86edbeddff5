/// Errors raised while encoding variable tables and memory requests.
///
/// Decoding never errors: malformed device replies yield `None`.
#[derive(Debug, thiserror::Error)]
pub enum VarError {
    /// More records than a `u16` count field can carry.
    #[error("too many records ({count}, max {max})")]
    TooManyRecords { count: usize, max: usize },

    /// A length-prefixed string or blob does not fit its prefix.
    #[error("{field} too long ({len} bytes, max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Descriptor and value slices passed to a batch encoder differ in length.
    #[error("value count mismatch: {descriptors} descriptors, {values} values")]
    ValueCountMismatch { descriptors: usize, values: usize },
}

pub type Result<T> = std::result::Result<T, VarError>;
