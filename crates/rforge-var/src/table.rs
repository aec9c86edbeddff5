use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{Result, VarError};
use crate::types::{DataType, VariableDescriptor};

/// Fixed bytes per binary record before the unit and name strings.
const RECORD_FIXED_LEN: usize = 4 + 1 + 2 + 4 + 1 + 1;

/// Parse a variable table reply.
///
/// Tries the binary layout, then the `;`-separated text layout. Returns
/// `None` when neither yields at least one descriptor.
pub fn parse_var_table(payload: &[u8]) -> Option<Vec<VariableDescriptor>> {
    if payload.is_empty() {
        return None;
    }
    parse_binary(payload).or_else(|| parse_text(payload))
}

/// Binary layout:
/// `[count:u16]` then `count` × `[addr:u32][type:u8][array:u16][scale:f32][unitLen:u8][nameLen:u8][unit][name]`.
///
/// Any truncated record or unknown type code rejects the whole table.
fn parse_binary(mut buf: &[u8]) -> Option<Vec<VariableDescriptor>> {
    if buf.remaining() < 2 {
        return None;
    }
    let count = buf.get_u16_le() as usize;
    let mut out = Vec::with_capacity(count);

    for _ in 0..count {
        if buf.remaining() < RECORD_FIXED_LEN {
            return None;
        }
        let address = buf.get_u32_le();
        let code = buf.get_u8();
        let Some(data_type) = DataType::from_code(code) else {
            debug!(code, "unknown variable type code, rejecting binary table");
            return None;
        };
        let array_size = u32::from(buf.get_u16_le());
        let scale = f64::from(buf.get_f32_le());
        let unit_len = buf.get_u8() as usize;
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < unit_len + name_len {
            return None;
        }
        let unit = String::from_utf8_lossy(&buf[..unit_len]).into_owned();
        buf.advance(unit_len);
        let name = String::from_utf8_lossy(&buf[..name_len]).into_owned();
        buf.advance(name_len);

        out.push(VariableDescriptor {
            name,
            address,
            data_type,
            array_size,
            scale,
            unit,
        });
    }

    (!out.is_empty()).then_some(out)
}

/// Text layout: `name,address,type,scale,unit[,arraySize]` records separated by `;`.
///
/// Records with fewer than five fields or an unparseable address are
/// skipped. A bad scale falls back to 1.0, a bad array size to 1.
fn parse_text(payload: &[u8]) -> Option<Vec<VariableDescriptor>> {
    let text = String::from_utf8_lossy(payload);
    let mut out = Vec::new();

    for record in text.split(';').map(str::trim).filter(|r| !r.is_empty()) {
        let fields: Vec<&str> = record.split(',').map(str::trim).collect();
        if fields.len() < 5 {
            debug!(record, "skipping short variable record");
            continue;
        }
        let Some(address) = parse_address(fields[1]) else {
            debug!(record, "skipping variable record with bad address");
            continue;
        };
        let scale = fields[3].parse::<f64>().unwrap_or(1.0);
        let array_size = fields
            .get(5)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(1);

        out.push(VariableDescriptor {
            name: fields[0].to_string(),
            address,
            data_type: DataType::from_name(fields[2]),
            array_size,
            scale,
            unit: fields[4].to_string(),
        });
    }

    (!out.is_empty()).then_some(out)
}

/// Parse a `0x`-prefixed hex or decimal address.
pub fn parse_address(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Encode descriptors in the binary table layout.
///
/// Scale is narrowed to `f32` and array size to `u16` (saturating) as the
/// wire format requires.
pub fn encode_var_table_binary(descriptors: &[VariableDescriptor]) -> Result<Bytes> {
    let count = u16::try_from(descriptors.len()).map_err(|_| VarError::TooManyRecords {
        count: descriptors.len(),
        max: u16::MAX as usize,
    })?;

    let mut dst = BytesMut::with_capacity(2 + descriptors.len() * (RECORD_FIXED_LEN + 16));
    dst.put_u16_le(count);
    for desc in descriptors {
        let unit_len = short_len("unit", desc.unit.len())?;
        let name_len = short_len("name", desc.name.len())?;
        dst.put_u32_le(desc.address);
        dst.put_u8(desc.data_type.code());
        dst.put_u16_le(u16::try_from(desc.array_size).unwrap_or(u16::MAX));
        dst.put_f32_le(desc.scale as f32);
        dst.put_u8(unit_len);
        dst.put_u8(name_len);
        dst.put_slice(desc.unit.as_bytes());
        dst.put_slice(desc.name.as_bytes());
    }
    Ok(dst.freeze())
}

fn short_len(field: &'static str, len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| VarError::FieldTooLong {
        field,
        len,
        max: u8::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Vec<VariableDescriptor> {
        vec![
            VariableDescriptor::new("motor_speed", 0x2000_0000, DataType::Float32).with_unit("rpm"),
            VariableDescriptor::new("bus_voltage", 0x2000_0004, DataType::UInt16)
                .with_scale(0.5)
                .with_unit("V"),
            VariableDescriptor::new("lut", 0x2000_0100, DataType::Int8).with_array_size(16),
        ]
    }

    #[test]
    fn binary_table_decodes() {
        let bytes = encode_var_table_binary(&sample_table()).unwrap();
        let parsed = parse_var_table(&bytes).unwrap();
        assert_eq!(parsed, sample_table());
    }

    #[test]
    fn binary_record_layout() {
        let desc = VariableDescriptor::new("x", 0x0102_0304, DataType::Int16)
            .with_scale(2.0)
            .with_unit("m");
        let bytes = encode_var_table_binary(&[desc]).unwrap();
        let mut expected = vec![0x01, 0x00, 0x04, 0x03, 0x02, 0x01, 0x02, 0x01, 0x00];
        expected.extend(2.0f32.to_le_bytes());
        expected.extend([1, 1, b'm', b'x']);
        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn unknown_type_code_rejects_whole_binary_table() {
        let mut bytes = encode_var_table_binary(&sample_table()).unwrap().to_vec();
        // Type byte of the second record.
        let second = 2 + RECORD_FIXED_LEN + 3 + "motor_speed".len();
        bytes[second + 4] = 0x09;
        assert!(parse_binary(&bytes).is_none());
    }

    #[test]
    fn truncated_binary_table_fails() {
        let bytes = encode_var_table_binary(&sample_table()).unwrap();
        assert!(parse_binary(&bytes[..bytes.len() - 1]).is_none());
    }

    #[test]
    fn empty_binary_table_falls_through() {
        assert!(parse_var_table(&[0x00, 0x00]).is_none());
    }

    #[test]
    fn text_table_parses_with_defaults() {
        let payload = b"speed,0x20000000,float32,1.0,rpm; temp,536870916,int16,0.1,degC,1;flags,0x10,uint8,oops,";
        let parsed = parse_var_table(payload).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].address, 0x2000_0000);
        assert_eq!(parsed[1].name, "temp");
        assert_eq!(parsed[1].address, 0x2000_0004);
        assert_eq!(parsed[1].data_type, DataType::Int16);
        assert!((parsed[1].scale - 0.1).abs() < 1e-12);
        assert_eq!(parsed[2].scale, 1.0);
        assert_eq!(parsed[2].unit, "");
        assert_eq!(parsed[2].array_size, 1);
    }

    #[test]
    fn text_table_skips_bad_records() {
        let payload = b"short,0x10;bad,zzz,int8,1,u;ok,0x20,mystery,2,u,4";
        let parsed = parse_var_table(payload).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "ok");
        assert_eq!(parsed[0].data_type, DataType::Float32);
        assert_eq!(parsed[0].array_size, 4);
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_var_table(b"").is_none());
        assert!(parse_var_table(b"nothing useful here").is_none());
    }

    #[test]
    fn address_forms() {
        assert_eq!(parse_address("0x1F"), Some(31));
        assert_eq!(parse_address("0XfF"), Some(255));
        assert_eq!(parse_address("42"), Some(42));
        assert_eq!(parse_address("-1"), None);
        assert_eq!(parse_address("0xG"), None);
    }

    #[test]
    fn encoder_rejects_long_names() {
        let desc = VariableDescriptor::new("n".repeat(256), 0, DataType::UInt8);
        let err = encode_var_table_binary(&[desc]).unwrap_err();
        assert!(matches!(err, VarError::FieldTooLong { field: "name", len: 256, .. }));
    }
}
