use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, VarError};
use crate::table::parse_address;
use crate::types::VariableDescriptor;

/// Raw bytes read from (or to be written to) one device address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryValue {
    pub address: u32,
    #[serde(serialize_with = "serialize_hex")]
    pub raw: Bytes,
}

impl MemoryValue {
    pub fn new(address: u32, raw: impl Into<Bytes>) -> Self {
        Self {
            address,
            raw: raw.into(),
        }
    }
}

fn serialize_hex<S: serde::Serializer>(raw: &Bytes, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(raw))
}

/// One entry of a read-batch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequest {
    pub address: u32,
    pub size: u16,
}

impl MemoryRequest {
    /// Request covering a whole variable (saturating at `u16::MAX` bytes).
    pub fn for_descriptor(desc: &VariableDescriptor) -> Self {
        Self {
            address: desc.address,
            size: u16::try_from(desc.byte_len()).unwrap_or(u16::MAX),
        }
    }
}

/// Parse a read-batch reply.
///
/// Binary layout `[count:u16]` then `count` × `[addr:u32][len:u16][raw]`,
/// falling back to text `addr=value` pairs separated by commas, where each
/// value is stored as little-endian `f32` bytes.
pub fn parse_read_reply(payload: &[u8]) -> Option<Vec<MemoryValue>> {
    if payload.is_empty() {
        return None;
    }
    parse_binary(payload).or_else(|| parse_text(payload))
}

fn parse_binary(mut buf: &[u8]) -> Option<Vec<MemoryValue>> {
    if buf.remaining() < 2 {
        return None;
    }
    let count = buf.get_u16_le() as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 6 {
            return None;
        }
        let address = buf.get_u32_le();
        let len = buf.get_u16_le() as usize;
        if buf.remaining() < len {
            return None;
        }
        out.push(MemoryValue::new(address, buf.copy_to_bytes(len)));
    }
    (!out.is_empty()).then_some(out)
}

fn parse_text(payload: &[u8]) -> Option<Vec<MemoryValue>> {
    let text = String::from_utf8_lossy(payload);
    let mut out = Vec::new();
    for item in text.split(',').map(str::trim).filter(|i| !i.is_empty()) {
        let mut parts = item.split('=').map(str::trim);
        let (Some(addr), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            debug!(item, "skipping malformed memory pair");
            continue;
        };
        let (Some(address), Ok(value)) = (parse_address(addr), value.parse::<f32>()) else {
            debug!(item, "skipping unparseable memory pair");
            continue;
        };
        out.push(MemoryValue::new(
            address,
            Bytes::copy_from_slice(&value.to_le_bytes()),
        ));
    }
    (!out.is_empty()).then_some(out)
}

/// Encode a read-batch request: `[addr:u32][size:u16]` per entry.
pub fn encode_read_request(requests: &[MemoryRequest]) -> Bytes {
    let mut dst = BytesMut::with_capacity(requests.len() * 6);
    for req in requests {
        dst.put_u32_le(req.address);
        dst.put_u16_le(req.size);
    }
    dst.freeze()
}

/// Encode a write request: `[addr:u32][size:u16][raw]` per entry.
pub fn encode_write_request(values: &[MemoryValue]) -> Result<Bytes> {
    let total: usize = values.iter().map(|v| 6 + v.raw.len()).sum();
    let mut dst = BytesMut::with_capacity(total);
    for value in values {
        let size = u16::try_from(value.raw.len()).map_err(|_| VarError::FieldTooLong {
            field: "raw value",
            len: value.raw.len(),
            max: u16::MAX as usize,
        })?;
        dst.put_u32_le(value.address);
        dst.put_u16_le(size);
        dst.put_slice(&value.raw);
    }
    Ok(dst.freeze())
}

/// Encode engineering values as a write request.
///
/// Each value is divided by its descriptor's scale and encoded by type.
pub fn encode_scaled_writes(descriptors: &[VariableDescriptor], values: &[f64]) -> Result<Bytes> {
    if descriptors.len() != values.len() {
        return Err(VarError::ValueCountMismatch {
            descriptors: descriptors.len(),
            values: values.len(),
        });
    }
    let writes: Vec<MemoryValue> = descriptors
        .iter()
        .zip(values)
        .map(|(desc, &value)| MemoryValue::new(desc.address, desc.encode_scaled(value)))
        .collect();
    encode_write_request(&writes)
}
