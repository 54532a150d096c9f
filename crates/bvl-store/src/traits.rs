use std::sync::Arc;

use bvl_types::VersionToken;

use crate::error::StoreResult;

/// A blob together with the token identifying its stored version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub token: VersionToken,
}

/// Byte-addressed storage with optimistic concurrency.
///
/// All implementations must satisfy these invariants:
/// - `get` on a key that was never written returns `Ok(None)`.
/// - `put` succeeds only if the stored version still matches `expected`
///   (`None` = the key must be absent); otherwise it fails with
///   [`StoreError::Conflict`](crate::StoreError::Conflict) and leaves the
///   stored blob untouched.
/// - `put` replaces the blob atomically.
/// - Errors are propagated, never retried internally.
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>>;

    /// Conditionally replace the blob stored under `key`.
    ///
    /// Returns the token of the newly stored version.
    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken>;

    /// Check whether a blob exists under `key`.
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: BlobStore + ?Sized> BlobStore for Arc<S> {
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        (**self).put(key, data, expected)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key)
    }
}

impl<S: BlobStore + ?Sized> BlobStore for Box<S> {
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        (**self).put(key, data, expected)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key)
    }
}
