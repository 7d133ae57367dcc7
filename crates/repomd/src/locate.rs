//! Parsing of the repomd index into resolved metadata paths.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Name of the index document inside the repodata directory.
pub const REPOMD_FILENAME: &str = "repomd.xml";
/// Subdirectory of the repository root holding all metadata files.
pub const REPODATA_DIR: &str = "repodata";

/// Resolved locations of every metadata artifact a repository advertises.
///
/// Produced once by [`MetadataLocation::locate`] and immutable afterwards.
/// Fields are `None` when the index does not list the corresponding `data`
/// type, which is normal for older repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataLocation {
    /// Path of the primary package document.
    pub primary_xml: Option<PathBuf>,
    /// Path of the filelists package document.
    pub filelists_xml: Option<PathBuf>,
    /// Path of the other (changelog) package document.
    pub other_xml: Option<PathBuf>,
    /// Path of the compressed primary sqlite database.
    pub primary_db: Option<PathBuf>,
    /// Path of the compressed filelists sqlite database.
    pub filelists_db: Option<PathBuf>,
    /// Path of the compressed other sqlite database.
    pub other_db: Option<PathBuf>,
    /// Path of the package group (comps) file.
    pub group: Option<PathBuf>,
    /// Path of the compressed group file.
    pub group_gz: Option<PathBuf>,
    /// Path of the index document itself.
    pub repomd: PathBuf,
}

impl MetadataLocation {
    /// Resolves the metadata locations of the repository at `repo_root`.
    ///
    /// Fails with [`ErrorKind::NotFound`] when the root is not a directory
    /// or has no `repodata/repomd.xml`, and with
    /// [`ErrorKind::MalformedIndex`] when the index is not a repomd
    /// document (wrong root element, missing revision marker, or no `data`
    /// elements at all). Unrecognized `data` types are skipped so that
    /// indices written by newer tools still resolve.
    #[instrument(skip(repo_root), fields(repo = %repo_root.as_ref().display()))]
    pub fn locate(repo_root: impl AsRef<Path>) -> Result<Self> {
        let repo_root = repo_root.as_ref();
        if !repo_root.is_dir() {
            exn::bail!(ErrorKind::NotFound(repo_root.display().to_string()));
        }
        let repomd_path = repo_root.join(REPODATA_DIR).join(REPOMD_FILENAME);
        if !repomd_path.is_file() {
            debug!(path = %repomd_path.display(), "index document missing");
            exn::bail!(ErrorKind::NotFound(repomd_path.display().to_string()));
        }

        let mut reader = Reader::from_file(&repomd_path).or_raise(|| ErrorKind::Io)?;
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        // The document must open with <repomd> followed by <revision>.
        match next_element_name(&mut reader, &mut buf)? {
            Some(name) if name == b"repomd" => {}
            _ => exn::bail!(ErrorKind::MalformedIndex("missing repomd element")),
        }
        match next_element_name(&mut reader, &mut buf)? {
            Some(name) if name == b"revision" => {}
            _ => exn::bail!(ErrorKind::MalformedIndex("missing revision element")),
        }

        let mut location = MetadataLocation {
            primary_xml: None,
            filelists_xml: None,
            other_xml: None,
            primary_db: None,
            filelists_db: None,
            other_db: None,
            group: None,
            group_gz: None,
            repomd: repomd_path,
        };
        let mut seen_data = false;
        let mut child_buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf).or_raise(|| ErrorKind::MalformedIndex("invalid XML"))? {
                Event::Start(element) if element.name().as_ref() == b"data" => {
                    seen_data = true;
                    let data_type = attr_value(&element, "type");
                    let href = data_subtree_href(&mut reader, &mut child_buf)?;
                    location.store(repo_root, data_type.as_deref(), href);
                }
                // A data element without children carries no location.
                Event::Empty(element) if element.name().as_ref() == b"data" => {
                    seen_data = true;
                    let data_type = attr_value(&element, "type");
                    warn!(r#type = data_type.as_deref().unwrap_or("<unset>"), "data element has no location");
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_data {
            exn::bail!(ErrorKind::MalformedIndex("no data elements"));
        }
        Ok(location)
    }

    /// Every path the index names, including the index document itself.
    ///
    /// Used by the cleaner to delete all advertised metadata in one pass.
    pub fn paths(&self) -> Vec<&Path> {
        [
            self.primary_xml.as_deref(),
            self.filelists_xml.as_deref(),
            self.other_xml.as_deref(),
            self.primary_db.as_deref(),
            self.filelists_db.as_deref(),
            self.other_db.as_deref(),
            self.group.as_deref(),
            self.group_gz.as_deref(),
            Some(self.repomd.as_path()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn store(&mut self, repo_root: &Path, data_type: Option<&str>, href: Option<String>) {
        let Some(data_type) = data_type else {
            warn!("data element without a type attribute");
            return;
        };
        let Some(href) = href else {
            warn!(r#type = data_type, "data element without a location href");
            return;
        };
        // `join` absorbs a trailing separator on the root, if any.
        let path = repo_root.join(href);
        match data_type {
            "primary" => self.primary_xml = Some(path),
            "filelists" => self.filelists_xml = Some(path),
            "other" => self.other_xml = Some(path),
            "primary_db" => self.primary_db = Some(path),
            "filelists_db" => self.filelists_db = Some(path),
            "other_db" => self.other_db = Some(path),
            "group" => self.group = Some(path),
            // The companion writer keeps the "_gz" name even when the
            // group file is compressed with another codec.
            "group_gz" => self.group_gz = Some(path),
            other => debug!(r#type = other, "ignoring unrecognized data type"),
        }
    }
}

/// Reads forward to the next element start (or empty element) and returns
/// its owned name, or `None` at end of document.
fn next_element_name<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<Option<Vec<u8>>> {
    loop {
        buf.clear();
        match reader.read_event_into(buf).or_raise(|| ErrorKind::MalformedIndex("invalid XML"))? {
            Event::Start(element) | Event::Empty(element) => {
                return Ok(Some(element.name().as_ref().to_vec()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Consumes the remainder of a `data` subtree, returning the `href` of the
/// first `location` element found inside it.
fn data_subtree_href<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
) -> Result<Option<String>> {
    let mut href = None;
    let mut depth = 0usize;
    loop {
        buf.clear();
        match reader.read_event_into(buf).or_raise(|| ErrorKind::MalformedIndex("invalid XML"))? {
            Event::Start(child) => {
                if depth == 0 && child.name().as_ref() == b"location" && href.is_none() {
                    href = attr_value(&child, "href");
                }
                depth += 1;
            }
            Event::Empty(child) => {
                if depth == 0 && child.name().as_ref() == b"location" && href.is_none() {
                    href = attr_value(&child, "href");
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    break; // closing </data>
                }
                depth -= 1;
            }
            Event::Eof => exn::bail!(ErrorKind::MalformedIndex("truncated data element")),
            _ => {}
        }
    }
    Ok(href)
}

fn attr_value(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}
