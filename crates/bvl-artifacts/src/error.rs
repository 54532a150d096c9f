use std::path::PathBuf;

use bvl_types::TypeError;

/// Errors that can occur while handling build artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The freshly generated SBOM is not where it should be.
    #[error("SBOM not found: {}", path.display())]
    MissingSbom { path: PathBuf },

    /// A tag list that is not a JSON array of strings.
    #[error("invalid tag list: {0}")]
    InvalidTags(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for artifact results.
pub type ArtifactResult<T> = Result<T, ArtifactError>;
