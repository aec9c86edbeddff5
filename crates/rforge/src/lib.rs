//! Telemetry link toolkit for embedded devices.
//!
//! rforge turns the raw byte stream of a device link into typed messages,
//! keeps live channel data and variable values, and records the stream
//! for later replay.
//!
//! # Crate Structure
//!
//! - [`frame`]: dual-protocol framing (binary and text) with auto-detection
//! - [`var`]: variable tables and batched memory access
//! - [`stream`]: streaming channel samples and the data aggregator
//! - [`record`]: record files, CSV export and paced playback
//! - [`pipeline`]: wires the above into one ingestion path

pub mod error;
pub mod pipeline;

pub use error::{PipelineError, Result};
pub use pipeline::{LinkEvent, Pipeline};

/// Re-export frame types.
pub mod frame {
    pub use rforge_frame::*;
}

/// Re-export variable types.
pub mod var {
    pub use rforge_var::*;
}

/// Re-export streaming types.
pub mod stream {
    pub use rforge_stream::*;
}

/// Re-export record types.
pub mod record {
    pub use rforge_record::*;
}
