use serde_json::{Map, Value};

use super::tensor::{TensorEntry, TensorError};

/// Size of the little-endian header length prefix.
pub const HEADER_LENGTH_BYTES: usize = 8;

/// Largest header the estimator fetches, in bytes.
///
/// Some very large checkpoints ship headers above this size. Those switch
/// the estimator to size-only accounting.
pub const MAX_HEADER_SIZE: u64 = 1000 * 1024;

/// Reserved header key holding free-form string metadata.
pub const METADATA_KEY: &str = "__metadata__";

/// Decode the header length from the first bytes of a shard.
///
/// Returns `None` when fewer than eight bytes are available. Extra bytes are
/// ignored.
#[must_use]
pub fn header_length(prefix: &[u8]) -> Option<u64> {
    let bytes: [u8; HEADER_LENGTH_BYTES] = prefix.get(..HEADER_LENGTH_BYTES)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// The decoded JSON header of one shard.
///
/// Entries keep the order they have in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafetensorsHeader {
    entries: Map<String, Value>,
}

impl SafetensorsHeader {
    /// Decode a header from its JSON bytes. The document must be an object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let entries: Map<String, Value> = serde_json::from_slice(bytes)?;
        Ok(Self { entries })
    }

    /// Number of entries, excluding `__metadata__`.
    #[must_use]
    pub fn tensor_count(&self) -> usize {
        self.entries.len() - usize::from(self.entries.contains_key(METADATA_KEY))
    }

    /// Iterate tensor entries in document order, skipping `__metadata__`.
    ///
    /// Entries whose value is not a JSON object are yielded as
    /// [`TensorError::NotAnObject`].
    pub fn tensors(&self) -> impl Iterator<Item = Result<TensorEntry<'_>, TensorError>> {
        self.entries
            .iter()
            .filter(|(name, _)| name.as_str() != METADATA_KEY)
            .map(|(name, value)| TensorEntry::from_value(name, value))
    }
}
