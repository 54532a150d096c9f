use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The persisted state of one ledger key.
///
/// A record is never merged with its predecessor: each successful advance
/// replaces it wholesale with one carrying `build_number + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Source branch name.
    pub branch: String,
    /// Monotonic build counter for this key.
    pub build_number: u64,
    /// Full version string, e.g. `v1.0.5-beta`.
    pub version: String,
    /// Ordered tag list. The second-to-last element is the full version.
    pub tags: Vec<String>,
}

impl VersionRecord {
    /// Encode as pretty-printed JSON.
    ///
    /// The encoding is deterministic: the same record always produces the
    /// same bytes, so rewriting a record is byte-for-byte idempotent.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec_pretty(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode from stored JSON bytes.
    pub fn from_json_bytes(data: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(data).map_err(|e| TypeError::MalformedRecord(e.to_string()))
    }
}
