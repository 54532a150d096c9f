//! Version derivation for the build version ledger.
//!
//! Two pure functions turn a branch name and a build number into the
//! human-facing version identifiers of a build:
//!
//! - [`parse_branch`] splits a release branch such as `v1.2-beta` into its
//!   prefix (`v1.2`), numeric version (`1.2`) and suffix (`-beta`). Branches
//!   outside the grammar fall back to `v0.0`.
//! - [`generate_tags`] expands the parsed parts and a build number into the
//!   ordered tag list published with every image.
//!
//! Both are deterministic and allocation-only; all I/O lives in `bvl-ledger`.

pub mod branch;
pub mod tags;

pub use branch::{branch_from_ref, parse_branch, VersionParts};
pub use tags::{generate_tags, TagSet};
