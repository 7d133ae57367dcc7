//! The old-metadata cache and its load diagnostics.

use crate::models::{DocKind, PackageRecord};
use derive_more::Display;
use std::collections::HashMap;
use std::collections::hash_map;

/// Lookup cache of previously generated per-package metadata, keyed by
/// package basename (the final path segment of the location href).
///
/// Keys are owned copies rather than views into their records, so keys and
/// records have independent lifetimes. Insertion order does not matter and
/// duplicate basenames keep the first record seen.
#[derive(Debug, Default)]
pub struct OldMetadataCache {
    records: HashMap<String, PackageRecord>,
}

impl OldMetadataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a package by its basename.
    #[must_use]
    pub fn get(&self, basename: &str) -> Option<&PackageRecord> {
        self.records.get(basename)
    }

    /// Returns `true` if a package with this basename is cached.
    #[must_use]
    pub fn contains(&self, basename: &str) -> bool {
        self.records.contains_key(basename)
    }

    /// Number of cached packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when no packages are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over `(basename, record)` pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, PackageRecord> {
        self.records.iter()
    }

    /// Inserts a record unless the key is already taken (first write wins).
    /// Returns `false` when the existing record was kept.
    pub(crate) fn insert(&mut self, basename: String, record: PackageRecord) -> bool {
        match self.records.entry(basename) {
            hash_map::Entry::Occupied(_) => false,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }
}

impl<'c> IntoIterator for &'c OldMetadataCache {
    type Item = (&'c String, &'c PackageRecord);
    type IntoIter = hash_map::Iter<'c, String, PackageRecord>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reason a package candidate was skipped during extraction.
///
/// Skips are diagnostics by design: one malformed record must not discard
/// the rest of the cache. Tests (and curious callers) can inspect exactly
/// which packages were dropped and why.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The primary record lacked one of location/checksum/size/time.
    #[display("incomplete package record ({})", href.as_deref().unwrap_or("unknown href"))]
    IncompleteRecord {
        /// Location href of the candidate, when it was at least present.
        href: Option<String>,
    },
    /// Another package with the same basename was already cached.
    #[display("duplicate package basename: {key}")]
    DuplicateKey {
        /// The contested basename.
        key: String,
    },
    /// A captured subtree could not be re-serialized to a fragment.
    #[display("could not serialize {doc} package fragment")]
    FragmentSerialization {
        /// Which of the three documents failed.
        doc: DocKind,
    },
    /// A document broke off mid-package; packages past the break were not
    /// visited in any of the three documents.
    #[display("truncated {doc} document")]
    TruncatedDocument {
        /// Which of the three documents broke off.
        doc: DocKind,
    },
}

/// The outcome of a successful metadata load: the cache plus every skip
/// diagnostic accumulated along the way, in encounter order.
#[derive(Debug, Default)]
pub struct Loaded {
    /// Per-package cached fragments keyed by basename.
    pub cache: OldMetadataCache,
    /// Every candidate skipped, and why.
    pub warnings: Vec<LoadWarning>,
}
