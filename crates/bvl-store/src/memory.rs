//! In-memory blob store for testing and ephemeral use.
//!
//! [`InMemoryBlobStore`] keeps every blob in a `HashMap` protected by a
//! `RwLock`. The compare-and-swap happens under the write lock, so it honours
//! the full [`BlobStore`] contract and can stand in for a remote store in
//! concurrency tests.

use std::collections::HashMap;
use std::sync::RwLock;

use bvl_types::VersionToken;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobStore, StoredBlob};

/// An in-memory implementation of [`BlobStore`].
///
/// Tokens are content hashes. Data is lost when the store is dropped.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        let map = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let mut map = self.blobs.write().map_err(|_| StoreError::Poisoned)?;

        let actual = map.get(key).map(|b| &b.token);
        if actual != expected {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: expected.cloned(),
                actual: actual.cloned(),
            });
        }

        let token = VersionToken::from_content(data);
        map.insert(
            key.to_string(),
            StoredBlob {
                data: data.to_vec(),
                token: token.clone(),
            },
        );
        debug!(key, token = token.short(), len = data.len(), "blob stored");
        Ok(token)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let map = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
