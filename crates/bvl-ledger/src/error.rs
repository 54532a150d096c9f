use bvl_store::StoreError;
use bvl_types::TypeError;

/// Errors produced by ledger operations.
///
/// A failed advance leaves the stored record untouched. Only
/// [`LedgerError::WriteConflict`] is worth retrying, and only after loading
/// the record again.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("version record {key} is malformed: {reason}")]
    MalformedRecord { key: String, reason: String },

    #[error("{key} was updated concurrently; reload and retry")]
    WriteConflict {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("build number overflow for {key}")]
    BuildNumberOverflow { key: String },

    /// Key derivation or record encoding failed.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl LedgerError {
    /// Returns `true` for a lost conditional write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::WriteConflict { .. })
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
