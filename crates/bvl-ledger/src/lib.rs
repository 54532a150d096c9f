//! The build version ledger.
//!
//! This crate is the heart of bvl. It provides:
//! - [`VersionLedger`], which loads the prior record for a key, derives the
//!   next build number, version and tags, and persists the result with a
//!   conditional write
//! - [`LedgerConfig`], the explicit configuration the ledger is built from
//! - [`LedgerError`], separating read failures, write failures and lost
//!   write races so callers can pick their own retry policy
//! - [`Outputs`] and the [`OutputSink`] implementations that hand results to
//!   the calling workflow

pub mod config;
pub mod error;
pub mod ledger;
pub mod output;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::{LoadedRecord, VersionLedger};
pub use output::{OutputFile, OutputSink, Outputs, WriterSink};
