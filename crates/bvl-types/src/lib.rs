//! Foundation types for the build version ledger (bvl).
//!
//! This crate provides the persisted record and addressing types shared by
//! every other bvl crate.
//!
//! # Key Types
//!
//! - [`VersionRecord`]: The persisted build counter, version and tag list for one key
//! - [`LedgerKey`]: Storage key derived from an optional project name and a branch
//! - [`VersionToken`]: Opaque prior-version identifier used for conditional writes

pub mod error;
pub mod key;
pub mod record;
pub mod token;

pub use error::TypeError;
pub use key::LedgerKey;
pub use record::VersionRecord;
pub use token::VersionToken;
