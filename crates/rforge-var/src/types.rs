use serde::{Deserialize, Serialize};

/// Element type of a device variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    #[default]
    Float32,
    Float64,
}

impl DataType {
    /// Map a wire type code (0..=7) to a type.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => DataType::Int8,
            1 => DataType::UInt8,
            2 => DataType::Int16,
            3 => DataType::UInt16,
            4 => DataType::Int32,
            5 => DataType::UInt32,
            6 => DataType::Float32,
            7 => DataType::Float64,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        match self {
            DataType::Int8 => 0,
            DataType::UInt8 => 1,
            DataType::Int16 => 2,
            DataType::UInt16 => 3,
            DataType::Int32 => 4,
            DataType::UInt32 => 5,
            DataType::Float32 => 6,
            DataType::Float64 => 7,
        }
    }

    /// Parse a textual type name. Unrecognised names are `Float32`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "int8" => DataType::Int8,
            "uint8" => DataType::UInt8,
            "int16" => DataType::Int16,
            "uint16" => DataType::UInt16,
            "int32" => DataType::Int32,
            "uint32" => DataType::UInt32,
            "float64" => DataType::Float64,
            _ => DataType::Float32,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    /// Width of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }

    /// Reinterpret little-endian raw bytes as a number.
    ///
    /// Returns `None` when `raw` is shorter than one element. Extra bytes
    /// are ignored.
    pub fn decode(self, raw: &[u8]) -> Option<f64> {
        let value = match self {
            DataType::Int8 => f64::from(*raw.first()? as i8),
            DataType::UInt8 => f64::from(*raw.first()?),
            DataType::Int16 => f64::from(i16::from_le_bytes(le_array(raw)?)),
            DataType::UInt16 => f64::from(u16::from_le_bytes(le_array(raw)?)),
            DataType::Int32 => f64::from(i32::from_le_bytes(le_array(raw)?)),
            DataType::UInt32 => f64::from(u32::from_le_bytes(le_array(raw)?)),
            DataType::Float32 => f64::from(f32::from_le_bytes(le_array(raw)?)),
            DataType::Float64 => f64::from_le_bytes(le_array(raw)?),
        };
        Some(value)
    }

    /// Encode a number as little-endian bytes of this type.
    ///
    /// Integer types round to nearest and saturate at their range; NaN
    /// encodes as zero.
    pub fn encode(self, value: f64) -> Vec<u8> {
        let rounded = value.round();
        match self {
            DataType::Int8 => (rounded.clamp(i8::MIN.into(), i8::MAX.into()) as i8)
                .to_le_bytes()
                .to_vec(),
            DataType::UInt8 => vec![rounded.clamp(0.0, u8::MAX.into()) as u8],
            DataType::Int16 => (rounded.clamp(i16::MIN.into(), i16::MAX.into()) as i16)
                .to_le_bytes()
                .to_vec(),
            DataType::UInt16 => (rounded.clamp(0.0, u16::MAX.into()) as u16)
                .to_le_bytes()
                .to_vec(),
            DataType::Int32 => (rounded.clamp(i32::MIN.into(), i32::MAX.into()) as i32)
                .to_le_bytes()
                .to_vec(),
            DataType::UInt32 => (rounded.clamp(0.0, u32::MAX.into()) as u32)
                .to_le_bytes()
                .to_vec(),
            DataType::Float32 => (value as f32).to_le_bytes().to_vec(),
            DataType::Float64 => value.to_le_bytes().to_vec(),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn le_array<const N: usize>(raw: &[u8]) -> Option<[u8; N]> {
    raw.get(..N)?.try_into().ok()
}

/// One entry of the device variable table.
///
/// `address` is the join key for memory read replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub name: String,
    pub address: u32,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub array_size: u32,
    pub scale: f64,
    pub unit: String,
}

impl VariableDescriptor {
    /// A scalar descriptor with scale 1 and no unit.
    pub fn new(name: impl Into<String>, address: u32, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            address,
            data_type,
            array_size: 1,
            scale: 1.0,
            unit: String::new(),
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size;
        self
    }

    /// Total bytes the variable occupies (at least one element).
    pub fn byte_len(&self) -> usize {
        self.data_type.size() * self.array_size.max(1) as usize
    }

    /// Decode raw bytes by type and multiply by scale.
    pub fn decode_scaled(&self, raw: &[u8]) -> Option<f64> {
        self.data_type.decode(raw).map(|v| v * self.scale)
    }

    /// Divide by scale (0 means unscaled) and encode by type.
    pub fn encode_scaled(&self, value: f64) -> Vec<u8> {
        let unscaled = if self.scale == 0.0 {
            value
        } else {
            value / self.scale
        };
        self.data_type.encode(unscaled)
    }
}
