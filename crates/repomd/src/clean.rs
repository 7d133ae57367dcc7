//! Removal of stale repository metadata ahead of a regeneration pass.

use crate::error::{ErrorKind, Result};
use crate::locate::{MetadataLocation, REPODATA_DIR, REPOMD_FILENAME};
use exn::ResultExt;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// File name suffixes the directory sweep recognizes as package metadata.
const METADATA_SUFFIXES: [&str; 9] = [
    "primary.xml",
    "primary.xml.gz",
    "primary.xml.bz2",
    "filelists.xml",
    "filelists.xml.gz",
    "filelists.xml.bz2",
    "other.xml",
    "other.xml.gz",
    "other.xml.bz2",
];

/// Deletes every stale metadata file of the repository at `repo_root`,
/// returning how many files were removed.
///
/// Removal happens in two phases. First, every path named by the index
/// document is deleted, the index itself included; an unparsable or missing
/// index is tolerated, since the sweep that follows still works. Second,
/// the repodata directory is listed and anything with a recognizable
/// metadata name is deleted — this catches files a stale index no longer
/// mentions. Individual removal failures are logged and skipped; only a
/// missing repository or repodata directory fails the whole call.
#[instrument(skip(repo_root), fields(repo = %repo_root.as_ref().display()))]
pub fn remove_old_metadata(repo_root: impl AsRef<Path>) -> Result<usize> {
    let repo_root = repo_root.as_ref();
    if !repo_root.is_dir() {
        exn::bail!(ErrorKind::NotFound(repo_root.display().to_string()));
    }
    let repodata = repo_root.join(REPODATA_DIR);
    if !repodata.is_dir() {
        exn::bail!(ErrorKind::NotFound(repodata.display().to_string()));
    }

    let mut removed: HashSet<PathBuf> = HashSet::new();

    // Phase 1: everything the index names.
    match MetadataLocation::locate(repo_root) {
        Ok(location) => {
            for path in location.paths() {
                remove_file(path, &mut removed);
            }
        }
        Err(err) => debug!(?err, "index unusable, relying on the directory sweep"),
    }

    // Phase 2: sweep the directory for recognizable leftovers.
    let entries = fs::read_dir(&repodata).or_raise(|| ErrorKind::Io)?;
    for entry in entries {
        let entry = entry.or_raise(|| ErrorKind::Io)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let recognized = name == REPOMD_FILENAME
            || METADATA_SUFFIXES.iter().any(|suffix| name.ends_with(suffix));
        if !recognized {
            continue;
        }
        let path = entry.path();
        // Already gone via the index pass; count each path once.
        if removed.contains(&path) {
            continue;
        }
        remove_file(&path, &mut removed);
    }

    Ok(removed.len())
}

fn remove_file(path: &Path, removed: &mut HashSet<PathBuf>) {
    debug!(path = %path.display(), "removing stale metadata");
    match fs::remove_file(path) {
        Ok(()) => {
            removed.insert(path.to_path_buf());
        }
        Err(err) => warn!(path = %path.display(), %err, "cannot remove stale metadata"),
    }
}
