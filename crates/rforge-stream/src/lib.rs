//! Streaming channel data.
//!
//! [`codec`] turns `STREAM_DATA` payloads into [`DataFrame`]s and back;
//! [`DataAggregator`] keeps a bounded history of decoded frames, fans
//! them out to subscribers and computes per-channel statistics.

pub mod aggregator;
pub mod codec;
pub mod frame;

pub use aggregator::{
    channel_stats, AggregatorConfig, ChannelStats, DataAggregator, DEFAULT_CAPACITY,
};
pub use codec::{
    decode_binary, decode_payload, decode_text, encode_binary, encode_text, looks_like_text,
    MIN_BINARY_LEN,
};
pub use frame::{now_us, ChannelValue, DataFrame, StreamConfig};
