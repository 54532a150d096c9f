//! Filesystem blob store.
//!
//! Keys are relative paths under a root directory, typically a repository
//! checkout where the pipeline later commits the version files.
//!
//! Conditional writes work across processes:
//!
//! 1. Take an exclusive `<file>.lock` next to the target (`O_EXCL` create).
//!    A lock held by someone else is reported as a conflict.
//! 2. Hash the current file contents and compare with the expected token.
//! 3. Write the new contents to a temporary file in the same directory and
//!    rename it over the target, so readers see either the old or the new
//!    blob and never a torn one.
//! 4. Remove the lock.
//!
//! A lock left behind by a crashed writer blocks further writes to that key
//! until it is deleted by hand.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use bvl_types::VersionToken;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobStore, StoredBlob};

/// A [`BlobStore`] backed by files under a root directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, rejecting keys that escape it.
    pub fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key);
        if key.is_empty() {
            return Err(invalid_key(key, "key must not be empty"));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(invalid_key(key, "key must not contain '..'"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid_key(key, "key must be relative"));
                }
            }
        }
        Ok(self.root.join(relative))
    }

    fn read_current(path: &Path) -> StoreResult<Option<StoredBlob>> {
        match fs::read(path) {
            Ok(data) => {
                let token = VersionToken::from_content(&data);
                Ok(Some(StoredBlob { data, token }))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, key: &str) -> StoreResult<Option<StoredBlob>> {
        let path = self.path_for(key)?;
        Self::read_current(&path)
    }

    fn put(
        &self,
        key: &str,
        data: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent)?;

        let _lock = match WriteLock::acquire(&path)? {
            Some(lock) => lock,
            None => {
                warn!(key, "version file is locked by another writer");
                let actual = Self::read_current(&path)?.map(|b| b.token);
                return Err(StoreError::Conflict {
                    key: key.to_string(),
                    expected: expected.cloned(),
                    actual,
                });
            }
        };

        let actual = Self::read_current(&path)?.map(|b| b.token);
        if actual.as_ref() != expected {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: expected.cloned(),
                actual,
            });
        }

        let mut tmp = NamedTempFile::new_in(&parent)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        let token = VersionToken::from_content(data);
        debug!(key, path = %path.display(), token = token.short(), "blob written");
        Ok(token)
    }
}

/// Exclusive per-file write lock, released on drop.
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    /// Returns `Ok(None)` if another writer holds the lock.
    fn acquire(target: &Path) -> io::Result<Option<Self>> {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        let path = target.with_file_name(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Some(Self { path })),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release write lock");
        }
    }
}

fn invalid_key(key: &str, reason: &str) -> StoreError {
    StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
