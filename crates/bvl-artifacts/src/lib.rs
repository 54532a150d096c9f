//! Artifacts that travel alongside a version record through a pipeline.
//!
//! - [`layout`]: where SBOMs, vulnerability reports and version files live,
//!   and which of them get committed back to the repository
//! - [`registry`]: container image references for Docker Hub and GHCR
//! - [`sbom`]: whether a freshly generated SBOM differs from the committed one
//! - [`release`]: tag, title and notes for a release of a version

pub mod error;
pub mod layout;
pub mod registry;
pub mod release;
pub mod sbom;

pub use error::{ArtifactError, ArtifactResult};
pub use layout::{commit_message, ArtifactLayout, CommitFile, CommitPlan};
pub use registry::{parse_tags_json, ImageRef, RegistryTags};
pub use release::{channel_suffix, ReleasePlan};
pub use sbom::{compare_files, compare_text, SbomChange};
