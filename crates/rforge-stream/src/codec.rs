//! Streaming payload layouts.
//!
//! Binary: `[timestampUs:u64]` then one or more `[channelId:u16][value:f32]`
//! tuples, little-endian. Text: one line of comma-separated numbers, channel
//! ids assigned by position.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::frame::{now_us, ChannelValue, DataFrame};

/// Timestamp prefix of a binary payload.
pub const TIMESTAMP_LEN: usize = 8;

/// Bytes per binary channel tuple.
pub const CHANNEL_LEN: usize = 6;

/// Smallest binary payload: a timestamp and one channel.
pub const MIN_BINARY_LEN: usize = TIMESTAMP_LEN + CHANNEL_LEN;

/// Decode a streaming payload in whichever layout it carries.
///
/// Payloads that look like printable CSV try the text layout first,
/// everything else tries binary first; the other layout is the fallback.
/// Text payloads are stamped with `fallback_ts`, or the host clock when
/// `None`.
pub fn decode_payload(payload: &[u8], fallback_ts: Option<u64>) -> Option<DataFrame> {
    let frame = if looks_like_text(payload) {
        decode_text(payload, fallback_ts).or_else(|| decode_binary(payload))
    } else {
        decode_binary(payload).or_else(|| decode_text(payload, fallback_ts))
    };
    if frame.is_none() {
        debug!(len = payload.len(), "stream payload matches no layout");
    }
    frame
}

/// True when `payload` contains a comma and only printable ASCII or CR/LF/TAB.
pub fn looks_like_text(payload: &[u8]) -> bool {
    payload.contains(&b',')
        && payload
            .iter()
            .all(|&b| matches!(b, b'\r' | b'\n' | b'\t' | 0x20..=0x7E))
}

/// Decode the binary layout. Requires at least [`MIN_BINARY_LEN`] bytes and
/// a whole number of channel tuples.
pub fn decode_binary(payload: &[u8]) -> Option<DataFrame> {
    if payload.len() < MIN_BINARY_LEN || (payload.len() - TIMESTAMP_LEN) % CHANNEL_LEN != 0 {
        return None;
    }
    let mut buf = payload;
    let timestamp_us = buf.get_u64_le();
    let mut channels = Vec::with_capacity(buf.remaining() / CHANNEL_LEN);
    while buf.has_remaining() {
        let channel_id = buf.get_u16_le();
        let value = f64::from(buf.get_f32_le());
        channels.push(ChannelValue { channel_id, value });
    }
    Some(DataFrame::new(timestamp_us, channels))
}

/// Decode one text line.
///
/// Fields that do not parse as finite numbers are skipped without
/// consuming a channel id.
pub fn decode_text(payload: &[u8], fallback_ts: Option<u64>) -> Option<DataFrame> {
    let line = std::str::from_utf8(payload).ok()?.trim();
    if line.is_empty() {
        return None;
    }
    let values: Vec<f64> = line
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return None;
    }
    let timestamp_us = fallback_ts.unwrap_or_else(now_us);
    Some(DataFrame::from_values(timestamp_us, values))
}

/// Encode a frame in the binary layout. Values are narrowed to `f32`.
pub fn encode_binary(frame: &DataFrame) -> Bytes {
    let mut dst = BytesMut::with_capacity(TIMESTAMP_LEN + frame.channels.len() * CHANNEL_LEN);
    dst.put_u64_le(frame.timestamp_us);
    for channel in &frame.channels {
        dst.put_u16_le(channel.channel_id);
        dst.put_f32_le(channel.value as f32);
    }
    dst.freeze()
}

/// Encode a frame as a text line (no terminator).
///
/// The text layout is positional, so channel ids and the timestamp are not
/// carried.
pub fn encode_text(frame: &DataFrame) -> Bytes {
    let line = frame
        .channels
        .iter()
        .map(|c| c.value.to_string())
        .collect::<Vec<_>>()
        .join(",");
    Bytes::from(line)
}
