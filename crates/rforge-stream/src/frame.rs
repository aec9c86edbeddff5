use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// One sample of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelValue {
    pub channel_id: u16,
    pub value: f64,
}

impl ChannelValue {
    pub fn new(channel_id: u16, value: f64) -> Self {
        Self { channel_id, value }
    }
}

/// A timestamped set of channel samples.
///
/// Timestamps come from the device (binary payloads) or the host (text
/// payloads), so they are only guaranteed non-decreasing within one
/// record file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataFrame {
    pub timestamp_us: u64,
    pub channels: Vec<ChannelValue>,
}

impl DataFrame {
    pub fn new(timestamp_us: u64, channels: Vec<ChannelValue>) -> Self {
        Self {
            timestamp_us,
            channels,
        }
    }

    /// Build a frame with channel ids 0, 1, 2, ... assigned in order.
    pub fn from_values(timestamp_us: u64, values: impl IntoIterator<Item = f64>) -> Self {
        let channels = values
            .into_iter()
            .zip(0u16..)
            .map(|(value, id)| ChannelValue::new(id, value))
            .collect();
        Self::new(timestamp_us, channels)
    }

    /// Value of `channel_id`, if present.
    pub fn value(&self, channel_id: u16) -> Option<f64> {
        self.channels
            .iter()
            .find(|c| c.channel_id == channel_id)
            .map(|c| c.value)
    }
}

/// Stream configuration sent with `SET_STREAM_CONFIG`: `[channelCount:u8][rateHz:u8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub channel_count: u8,
    pub rate_hz: u8,
}

impl StreamConfig {
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(2);
        dst.put_u8(self.channel_count);
        dst.put_u8(self.rate_hz);
        dst.freeze()
    }

    pub fn decode(payload: &[u8]) -> Option<Self> {
        match payload {
            [channel_count, rate_hz] => Some(Self {
                channel_count: *channel_count,
                rate_hz: *rate_hz,
            }),
            _ => None,
        }
    }
}

/// Host wall-clock time in microseconds since the Unix epoch.
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}
