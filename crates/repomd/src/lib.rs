//! Resolution of repository metadata locations via the `repomd.xml` index.
//!
//! An RPM-style repository advertises its metadata files through a single
//! index document at `<root>/repodata/repomd.xml`: one `data` element per
//! artifact, each carrying a `type` attribute and a `location` child whose
//! `href` is relative to the repository root. This crate reads that index:
//!
//! - [`MetadataLocation::locate`] resolves every known artifact type to an
//!   absolute path, leaving absent types `None` (older repositories may not
//!   publish sqlite databases or group files — that is not an error).
//! - [`remove_old_metadata`] deletes stale metadata ahead of a regeneration
//!   pass: everything the index names, plus a directory sweep for
//!   recognizable leftovers the index missed.
//!
//! Reading the three package documents the index points at is the job of
//! `remeta-oldmeta`.

mod clean;
pub mod error;
mod locate;

pub use crate::clean::remove_old_metadata;
pub use crate::locate::{MetadataLocation, REPODATA_DIR, REPOMD_FILENAME};
