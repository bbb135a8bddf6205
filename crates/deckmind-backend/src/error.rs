//! Error types for collaborator calls
//!
//! One enum per concern:
//! - [`GenerationError`] for the generation backend
//! - [`StoreError`] for the remote record store
//! - [`PersistenceError`] for the local cache
//!
//! Policy summary: `AuthRequired` terminates the owning activity; transient
//! and malformed-response failures are caught at the sub-operation boundary;
//! persistence read failures degrade to "absent" and never surface.

/// Generation backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Caller must re-authenticate; fatal to the whole activity
    #[error("authentication required")]
    AuthRequired,

    /// Retriable failure of a single call
    #[error("generation failed: {0}")]
    Transient(String),

    /// Backend returned an unexpected shape; fails only this sub-operation
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    /// Whether this error must terminate the whole owning activity
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthRequired)
    }
}

/// Remote record store failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with the requested id
    #[error("record not found")]
    NotFound,

    /// Write rejected or lost; the submitter must roll back its echo marker
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Read failed
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// Subscription could not be established
    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// Local persistence failure
///
/// Internal to persistence implementations. Reads that fail with either
/// variant are reported to callers as "absent".
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Underlying I/O failure
    #[error("persistence io: {0}")]
    Io(#[from] std::io::Error),

    /// Entry exists but cannot be decoded
    #[error("corrupt entry: {0}")]
    Corrupt(String),
}
