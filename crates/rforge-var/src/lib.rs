//! Device variable tables and batched memory access.
//!
//! The device describes its variables once (`GET_VAR_TABLE`) and then
//! answers batched reads (`READ_MEM_BATCH`) with raw bytes keyed by
//! address. This crate decodes both replies, encodes read/write requests
//! and keeps the latest value of every variable in a [`VarStore`].

pub mod error;
pub mod memory;
pub mod store;
pub mod table;
pub mod types;

pub use error::{Result, VarError};
pub use memory::{
    encode_read_request, encode_scaled_writes, encode_write_request, parse_read_reply,
    MemoryRequest, MemoryValue,
};
pub use store::{VarReading, VarStore};
pub use table::{encode_var_table_binary, parse_address, parse_var_table};
pub use types::{DataType, VariableDescriptor};
