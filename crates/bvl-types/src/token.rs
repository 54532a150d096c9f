use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of the stored version of a blob.
///
/// Stores hand a token back from every read and write. Passing the token of
/// the version a caller last observed to a conditional write lets the store
/// detect that someone else replaced the blob in the meantime. The ledger
/// never interprets the contents: for local stores it is a BLAKE3 content
/// hash, for the GitHub contents API it is the blob SHA.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a token issued by a store.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Derive a token from stored content (hex-encoded BLAKE3 hash).
    ///
    /// Identical bytes always produce the same token.
    pub fn from_content(data: &[u8]) -> Self {
        Self(hex::encode(blake3::hash(data).as_bytes()))
    }

    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters) for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionToken({})", self.short())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
