//! Data model for cached package metadata.

use derive_more::Display;

/// The role of a document within a primary/filelists/other triple.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// General package metadata (`<metadata>` root).
    #[display("primary")]
    Primary,
    /// Per-package file lists (`<filelists>` root).
    #[display("filelists")]
    Filelists,
    /// Changelogs and other data (`<otherdata>` root).
    #[display("other")]
    Other,
}

impl DocKind {
    /// The expected root element tag of a document of this kind.
    pub(crate) fn root_tag(&self) -> &'static [u8] {
        match self {
            DocKind::Primary => b"metadata",
            DocKind::Filelists => b"filelists",
            DocKind::Other => b"otherdata",
        }
    }
}

/// One package's worth of previously generated metadata.
///
/// All three fragments are always present: a candidate missing any of them
/// is discarded during extraction rather than stored partially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    /// File modification time from `<time file="...">`; -1 when unknown.
    pub time_file: i64,
    /// Package size in bytes from `<size package="...">`; -1 when unknown.
    pub size_package: i64,
    /// Location href exactly as published in the primary document.
    pub location_href: String,
    /// Base URL from `<location base="...">`, rarely present.
    pub location_base: Option<String>,
    /// Checksum algorithm name, e.g. `sha256`.
    pub checksum_type: String,
    /// Raw serialized `<package>` element from the primary document.
    pub primary_xml: String,
    /// Raw serialized `<package>` element from the filelists document.
    pub filelists_xml: String,
    /// Raw serialized `<package>` element from the other document.
    pub other_xml: String,
}
