//! SBOM change detection.
//!
//! A build only needs publishing when its software bill of materials moved.
//! The freshly generated `sbom.txt` is compared with the committed one from
//! the previous build.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::info;

use crate::error::{ArtifactError, ArtifactResult};

/// How the current SBOM relates to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum SbomChange {
    /// No previous SBOM exists.
    FirstSbom,
    Changed { added: usize, removed: usize },
    Unchanged,
}

impl SbomChange {
    /// Whether the build produced a new SBOM worth publishing.
    pub fn is_new(&self) -> bool {
        !matches!(self, SbomChange::Unchanged)
    }
}

/// Compare SBOM texts line by line.
pub fn compare_text(previous: &str, current: &str) -> SbomChange {
    if previous == current {
        return SbomChange::Unchanged;
    }

    let diff = TextDiff::from_lines(previous, current);
    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }
    SbomChange::Changed { added, removed }
}

/// Compare the SBOM at `current` against the one at `previous`.
///
/// A missing `current` is an error; a missing `previous` means this is the
/// first SBOM.
pub fn compare_files(previous: &Path, current: &Path) -> ArtifactResult<SbomChange> {
    let current_text = match fs::read_to_string(current) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ArtifactError::MissingSbom {
                path: current.to_path_buf(),
            })
        }
        Err(e) => return Err(ArtifactError::io(current, e)),
    };

    let previous_text = match fs::read_to_string(previous) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %previous.display(), "no previous SBOM; this is the first");
            return Ok(SbomChange::FirstSbom);
        }
        Err(e) => return Err(ArtifactError::io(previous, e)),
    };

    let change = compare_text(&previous_text, &current_text);
    match change {
        SbomChange::Changed { added, removed } => info!(added, removed, "SBOM changed"),
        _ => info!("SBOM unchanged"),
    }
    Ok(change)
}
