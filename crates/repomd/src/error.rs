//! Repository Index Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A repository index error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The repository root, its repodata directory, or the index document
    /// does not exist. Callers that tolerate missing old metadata treat this
    /// as "nothing to reuse".
    #[display("repository metadata not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The index document exists but is not a usable repomd document.
    #[display("malformed repomd index: {_0}")]
    MalformedIndex(#[error(not(source))] &'static str),
    /// An I/O operation failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
