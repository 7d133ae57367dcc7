//! Metadata Loading Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Per-package problems never surface here — they become
//! [`LoadWarning`](crate::LoadWarning)s instead, because one bad record must
//! not throw away an otherwise reusable cache.

use crate::models::DocKind;
use derive_more::{Display, Error};

/// A metadata loading error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata loading operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required metadata document does not exist on disk.
    #[display("missing metadata file: {_0}")]
    MissingFile(#[error(not(source))] String),
    /// The compression codec of the primary document could not be detected.
    #[display("undetectable compression codec")]
    UnknownCompression,
    /// A document could not be opened for decompressed streaming reads.
    #[display("cannot open {doc} document for streaming")]
    StreamOpenFailed { doc: DocKind },
    /// A document failed its structural checks: wrong root tag, or the
    /// content does not start with package elements.
    #[display("malformed {doc} document")]
    MalformedDocument { doc: DocKind },
    /// The repository index could not be located or parsed.
    #[display("repository index unusable")]
    Index,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Old metadata either exists in a readable shape or it does not;
        // callers fall back to a full regeneration either way.
        false
    }
}
