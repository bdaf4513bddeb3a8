//! Safetensors header decoding.
//!
//! A safetensors file starts with an 8-byte little-endian header length,
//! followed by a JSON object mapping tensor names to
//! `{dtype, shape, data_offsets}` and an optional `__metadata__` entry.
//!
//! This module only decodes bytes. Fetching them is done by
//! [`crate::estimate`].

mod header;
mod tensor;

pub use header::{
    HEADER_LENGTH_BYTES, MAX_HEADER_SIZE, METADATA_KEY, SafetensorsHeader, header_length,
};
pub use tensor::{TensorEntry, TensorError, TensorSummary};
