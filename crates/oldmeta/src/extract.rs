//! Lockstep extraction across the primary, filelists and other documents.
//!
//! The three documents describe the same package set in the same order.
//! The extractor relies on that invariant instead of verifying it: each
//! loop iteration advances all three pull-parsers by exactly one package,
//! whether or not the candidate produced a cache record, and extraction
//! ends as soon as any document runs out. Cross-checking package identity
//! on every record would guard against writers that do not exist, at the
//! cost of parsing every filelists and other fragment.

use crate::cache::{LoadWarning, Loaded};
use crate::error::{ErrorKind, Result};
use crate::models::{DocKind, PackageRecord};
use crate::stream::{FieldScan, PackageStream, Subtree};
use exn::ResultExt;
use remeta_compress::Compression;
use remeta_repomd::MetadataLocation;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Loads reusable per-package metadata from the three package documents.
///
/// The compression codec is detected once, from the primary document, and
/// applied to all three. Structural problems (missing files, undetectable
/// codec, wrong root tags, content that does not open with a package
/// element) fail the load; per-package problems skip the candidate and are
/// reported through [`Loaded::warnings`].
#[instrument(skip_all, fields(primary = %primary.as_ref().display()))]
pub fn load_xml_metadata(
    primary: impl AsRef<Path>,
    filelists: impl AsRef<Path>,
    other: impl AsRef<Path>,
) -> Result<Loaded> {
    let primary = primary.as_ref();
    let filelists = filelists.as_ref();
    let other = other.as_ref();
    for path in [primary, filelists, other] {
        if !path.is_file() {
            exn::bail!(ErrorKind::MissingFile(path.display().to_string()));
        }
    }

    let codec = Compression::detect(primary).or_raise(|| ErrorKind::UnknownCompression)?;

    let mut pri = PackageStream::open(DocKind::Primary, primary, codec)?;
    let mut fil = PackageStream::open(DocKind::Filelists, filelists, codec)?;
    let mut oth = PackageStream::open(DocKind::Other, other, codec)?;

    pri.expect_root()?;
    fil.expect_root()?;
    oth.expect_root()?;
    pri.expect_first_package()?;
    fil.expect_first_package()?;
    oth.expect_first_package()?;

    let mut loaded = Loaded::default();
    loop {
        // All three streams advance every iteration, no matter what the
        // candidate turns into. There is no resynchronization.
        let pri_pkg = pull(&mut pri, &mut loaded);
        let fil_pkg = pull(&mut fil, &mut loaded);
        let oth_pkg = pull(&mut oth, &mut loaded);
        let (Some(pri_pkg), Some(fil_pkg), Some(oth_pkg)) = (pri_pkg, fil_pkg, oth_pkg) else {
            break;
        };
        consider(&mut loaded, &pri_pkg, &fil_pkg, &oth_pkg);
    }

    debug!(
        packages = loaded.cache.len(),
        skipped = loaded.warnings.len(),
        "old metadata loaded"
    );
    Ok(loaded)
}

/// Resolves a repository's old metadata through its index and loads it.
///
/// Fails with [`ErrorKind::Index`] when the index cannot be located or
/// parsed, and with [`ErrorKind::MissingFile`] when it does not name all
/// three package documents.
pub fn locate_and_load(repo_root: impl AsRef<Path>) -> Result<Loaded> {
    let location = MetadataLocation::locate(repo_root.as_ref()).or_raise(|| ErrorKind::Index)?;
    let (Some(primary), Some(filelists), Some(other)) = (
        &location.primary_xml,
        &location.filelists_xml,
        &location.other_xml,
    ) else {
        exn::bail!(ErrorKind::MissingFile(
            "index does not name all of primary/filelists/other".to_string()
        ));
    };
    load_xml_metadata(primary, filelists, other)
}

/// Advances one stream. A document that breaks off mid-package is treated
/// as exhausted, which ends the lockstep loop for all three.
fn pull(stream: &mut PackageStream, loaded: &mut Loaded) -> Option<Subtree> {
    match stream.next_package() {
        Ok(subtree) => subtree,
        Err(err) => {
            warn!(doc = %stream.kind(), ?err, "package stream broke off");
            loaded.warnings.push(LoadWarning::TruncatedDocument {
                doc: stream.kind(),
            });
            None
        }
    }
}

/// Evaluates one aligned package triple and caches it, unless any part of
/// the candidate disqualifies it. Skips never affect stream positions.
fn consider(loaded: &mut Loaded, pri: &Subtree, fil: &Subtree, oth: &Subtree) {
    let primary_xml = fragment(pri, loaded);
    let filelists_xml = fragment(fil, loaded);
    let other_xml = fragment(oth, loaded);
    let (Some(primary_xml), Some(filelists_xml), Some(other_xml)) =
        (primary_xml, filelists_xml, other_xml)
    else {
        return;
    };

    let fields = match pri.scan_primary() {
        FieldScan::Complete(fields) => fields,
        FieldScan::Incomplete { href } => {
            warn!(
                href = href.as_deref().unwrap_or("<unknown>"),
                "required fields missing from primary record"
            );
            loaded.warnings.push(LoadWarning::IncompleteRecord { href });
            return;
        }
    };

    let key = basename(&fields.location_href).to_owned();
    if loaded.cache.contains(&key) {
        debug!(%key, "package basename already cached, keeping the first record");
        loaded.warnings.push(LoadWarning::DuplicateKey { key });
        return;
    }

    let record = PackageRecord {
        time_file: fields.time_file,
        size_package: fields.size_package,
        location_href: fields.location_href,
        location_base: fields.location_base,
        checksum_type: fields.checksum_type,
        primary_xml,
        filelists_xml,
        other_xml,
    };
    loaded.cache.insert(key, record);
}

fn fragment(subtree: &Subtree, loaded: &mut Loaded) -> Option<String> {
    let fragment = subtree.serialize();
    if fragment.is_none() {
        loaded.warnings.push(LoadWarning::FragmentSerialization {
            doc: subtree.kind(),
        });
    }
    fragment
}

/// The final path segment of a location href, or the whole href when it
/// contains no separator.
fn basename(href: &str) -> &str {
    match href.rfind('/') {
        Some(index) => &href[index + 1..],
        None => href,
    }
}
