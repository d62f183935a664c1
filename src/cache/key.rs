use std::fmt;

use serde::Serialize;
use xxhash_rust::xxh32::xxh32;

use crate::cache::CacheError;

/// Identifies a layer by its name and every parameter its value depends on.
///
/// The parameters are serialised to JSON with sorted object keys, so two keys
/// built from equal parameters are equal regardless of field order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerKey {
    name: String,
    canonical: String,
}

impl LayerKey {
    pub fn new<P: Serialize + ?Sized>(name: &str, params: &P) -> Result<Self, CacheError> {
        // `Value` objects are ordered maps, which gives the stable key order.
        let params = serde_json::to_value(params)?;
        let canonical = serde_json::to_string(&serde_json::json!({
            "layer": name,
            "params": params,
        }))?;

        Ok(LayerKey {
            name: name.to_string(),
            canonical,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stable serialised form of the key.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Hash of the canonical form, naming the key's artifact on disk.
    pub fn digest(&self) -> u32 {
        xxh32(self.canonical.as_bytes(), 0)
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:08x}", self.name, self.digest())
    }
}
