//! Keyed blob storage for the build version ledger.
//!
//! The ledger persists one small record per key and needs exactly two things
//! from storage: read the bytes stored under a key, and replace them only if
//! nobody else did since the read. This crate defines that capability as the
//! [`BlobStore`] trait and ships three backends.
//!
//! # Storage Backends
//!
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlobStore`] -- files under a root directory, e.g. a repository checkout
//! - [`GithubContentsStore`] -- files in a GitHub repository via the contents API
//!
//! # Design Rules
//!
//! 1. A missing key is `Ok(None)`, never an error.
//! 2. Every write is conditional on a [`VersionToken`](bvl_types::VersionToken):
//!    `None` means "the key must not exist yet".
//! 3. A lost race is reported as [`StoreError::Conflict`], distinct from I/O
//!    and transport failures. The store never retries.
//! 4. Writes replace the whole blob; a half-written blob is never observable.
//! 5. The store never interprets blob contents.

pub mod error;
pub mod fs;
pub mod github;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use github::{GithubContentsStore, GithubStoreConfig};
pub use memory::InMemoryBlobStore;
pub use traits::{BlobStore, StoredBlob};
