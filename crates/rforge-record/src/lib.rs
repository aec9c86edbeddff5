//! Append-only telemetry records.
//!
//! File format ("RFR1"), little-endian:
//! ```text
//! magic "RFR1" (4) | { startTs:u64 | endTs:u64 | len:u32 | payload[len] }*
//! ```
//! Payloads are raw streaming payloads, so replay re-runs the stream codec.
//! A file cut short after any complete chunk stays readable.

pub mod chunk;
pub mod error;
pub mod export;
pub mod playback;
pub mod reader;
pub mod writer;

pub use chunk::{RecordChunk, CHUNK_HEADER_LEN, DEFAULT_MAX_CHUNK_PAYLOAD, MAGIC};
pub use error::{RecordError, Result};
pub use export::{export_csv, export_csv_from_record, write_csv};
pub use playback::Playback;
pub use reader::{load_frames, read_chunks, RecordReader};
pub use writer::{RecordConfig, RecordWriter, DEFAULT_FLUSH_EVERY};

pub use tokio_util::sync::CancellationToken;
