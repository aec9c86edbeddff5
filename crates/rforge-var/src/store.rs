use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use serde::Serialize;

use crate::memory::MemoryValue;
use crate::types::{DataType, VariableDescriptor};

/// A variable's latest decoded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarReading {
    pub address: u32,
    pub name: Option<String>,
    pub value: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    descriptors: Vec<VariableDescriptor>,
    raw: HashMap<u32, Bytes>,
}

impl Inner {
    fn descriptor(&self, address: u32) -> Option<&VariableDescriptor> {
        self.descriptors.iter().find(|d| d.address == address)
    }

    fn scaled(&self, address: u32) -> Option<f64> {
        let raw = self.raw.get(&address)?;
        if raw.is_empty() {
            return None;
        }
        self.descriptor(address)
            .and_then(|desc| desc.decode_scaled(raw))
            .or_else(|| DataType::Float32.decode(raw))
    }
}

/// Active variable table plus the latest raw bytes per address.
///
/// Shared between the ingest path and readers; every call takes the lock
/// briefly and returns owned data.
#[derive(Debug, Default)]
pub struct VarStore {
    inner: Mutex<Inner>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the descriptor table. Stored raw values are kept.
    pub fn set_descriptors(&self, descriptors: Vec<VariableDescriptor>) {
        self.lock().descriptors = descriptors;
    }

    pub fn descriptors(&self) -> Vec<VariableDescriptor> {
        self.lock().descriptors.clone()
    }

    pub fn descriptor(&self, address: u32) -> Option<VariableDescriptor> {
        self.lock().descriptor(address).cloned()
    }

    /// Look a descriptor up by name.
    pub fn find(&self, name: &str) -> Option<VariableDescriptor> {
        self.lock()
            .descriptors
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    pub fn update_raw(&self, address: u32, raw: Bytes) {
        self.lock().raw.insert(address, raw);
    }

    pub fn raw(&self, address: u32) -> Option<Bytes> {
        self.lock().raw.get(&address).cloned()
    }

    /// Store every value of a decoded read reply. Returns how many were stored.
    pub fn apply_read_reply(&self, values: &[MemoryValue]) -> usize {
        let mut inner = self.lock();
        for value in values {
            inner.raw.insert(value.address, value.raw.clone());
        }
        values.len()
    }

    /// Latest value at `address`, decoded by its descriptor and scaled.
    ///
    /// Without a usable descriptor, four or more raw bytes are read as
    /// `f32`.
    pub fn scaled_value(&self, address: u32) -> Option<f64> {
        self.lock().scaled(address)
    }

    /// Decoded values for every address with raw data, sorted by address.
    pub fn readings(&self) -> Vec<VarReading> {
        let inner = self.lock();
        let mut out: Vec<VarReading> = inner
            .raw
            .keys()
            .filter_map(|&address| {
                let value = inner.scaled(address)?;
                let desc = inner.descriptor(address);
                Some(VarReading {
                    address,
                    name: desc.map(|d| d.name.clone()),
                    value,
                    unit: desc.map(|d| d.unit.clone()).filter(|u| !u.is_empty()),
                })
            })
            .collect();
        out.sort_by_key(|r| r.address);
        out
    }

    /// Drop all descriptors and values.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.descriptors.clear();
        inner.raw.clear();
    }
}
