use bvl_types::VersionToken;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write lost against a concurrent writer.
    #[error("conflict on {key}: expected {}, found {}", describe(.expected), describe(.actual))]
    Conflict {
        key: String,
        expected: Option<VersionToken>,
        actual: Option<VersionToken>,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote service answered with an unexpected status.
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend returned data that could not be decoded.
    #[error("decode error for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// An in-process lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// The key cannot be mapped onto this backend.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
}

impl StoreError {
    /// Returns `true` if this error signals a lost conditional write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

fn describe(token: &Option<VersionToken>) -> String {
    match token {
        Some(t) => t.short().to_string(),
        None => "absent".to_string(),
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
