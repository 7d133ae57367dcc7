//! Pull-parsed package streams and captured package subtrees.
//!
//! A [`PackageStream`] turns one decompressed metadata document into a
//! sequence of [`Subtree`]s, one per package element, in document order.
//! Streams are finite and not restartable; the lockstep driver in
//! [`extract`](crate::extract) zips three of them together.

use crate::error::{ErrorKind, Result};
use crate::models::DocKind;
use exn::ResultExt;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use remeta_compress::Compression;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::warn;

/// A pull-parser over one decompressed package document.
pub(crate) struct PackageStream {
    kind: DocKind,
    reader: Reader<BufReader<Box<dyn Read>>>,
    buf: Vec<u8>,
    /// First package element, held between the structural check and the
    /// first [`next_package`](Self::next_package) call.
    pending: Option<Event<'static>>,
    exhausted: bool,
}

impl PackageStream {
    /// Opens `path` for decompressed streaming reads with `codec`.
    pub(crate) fn open(kind: DocKind, path: &Path, codec: Compression) -> Result<Self> {
        let raw = codec
            .open(path)
            .or_raise(|| ErrorKind::StreamOpenFailed { doc: kind })?;
        let mut reader = Reader::from_reader(BufReader::new(raw));
        let config = reader.config_mut();
        config.trim_text(true);
        config.check_end_names = true;
        Ok(Self {
            kind,
            reader,
            buf: Vec::new(),
            pending: None,
            exhausted: false,
        })
    }

    pub(crate) fn kind(&self) -> DocKind {
        self.kind
    }

    /// Advances past the prolog and verifies the document's root tag.
    pub(crate) fn expect_root(&mut self) -> Result<()> {
        loop {
            match self.read_event()? {
                Event::Start(element) if element.name().as_ref() == self.kind.root_tag() => {
                    return Ok(());
                }
                // A childless self-closing root is well-formed XML, but it
                // has no packages to offer.
                Event::Empty(element) if element.name().as_ref() == self.kind.root_tag() => {
                    self.exhausted = true;
                    return Ok(());
                }
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::Text(_)
                | Event::PI(_) => continue,
                _ => {
                    self.exhausted = true;
                    exn::bail!(ErrorKind::MalformedDocument { doc: self.kind });
                }
            }
        }
    }

    /// Advances to the first package element and holds it for the first
    /// [`next_package`](Self::next_package) call. Anything else here means
    /// the document cannot be trusted and fails the whole load.
    pub(crate) fn expect_first_package(&mut self) -> Result<()> {
        if self.exhausted {
            exn::bail!(ErrorKind::MalformedDocument { doc: self.kind });
        }
        loop {
            match self.read_event()? {
                event @ (Event::Start(_) | Event::Empty(_)) => {
                    let is_package = matches!(
                        &event,
                        Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"package"
                    );
                    if !is_package {
                        self.exhausted = true;
                        exn::bail!(ErrorKind::MalformedDocument { doc: self.kind });
                    }
                    self.pending = Some(event);
                    return Ok(());
                }
                Event::End(_) | Event::Eof => {
                    self.exhausted = true;
                    exn::bail!(ErrorKind::MalformedDocument { doc: self.kind });
                }
                _ => continue,
            }
        }
    }

    /// Pulls the next package subtree, or `None` once the document has no
    /// more packages. Any element at package level counts as a candidate;
    /// deciding what to make of it is the driver's job.
    pub(crate) fn next_package(&mut self) -> Result<Option<Subtree>> {
        if self.exhausted {
            return Ok(None);
        }
        let first = match self.pending.take() {
            Some(event) => event,
            None => loop {
                match self.read_event()? {
                    event @ (Event::Start(_) | Event::Empty(_)) => break event,
                    // Closing root tag or end of input.
                    Event::End(_) | Event::Eof => {
                        self.exhausted = true;
                        return Ok(None);
                    }
                    _ => continue,
                }
            },
        };

        let mut depth = match &first {
            Event::Start(_) => 1usize,
            _ => 0,
        };
        let mut events = vec![first];
        while depth > 0 {
            let event = self.read_event()?;
            match &event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    // The document broke off inside a package element.
                    self.exhausted = true;
                    exn::bail!(ErrorKind::MalformedDocument { doc: self.kind });
                }
                _ => {}
            }
            events.push(event);
        }
        Ok(Some(Subtree {
            kind: self.kind,
            events,
        }))
    }

    fn read_event(&mut self) -> Result<Event<'static>> {
        self.buf.clear();
        match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => Ok(event.into_owned()),
            Err(err) => {
                self.exhausted = true;
                Err(err).or_raise(|| ErrorKind::MalformedDocument { doc: self.kind })
            }
        }
    }
}

/// One package element captured as owned XML events.
///
/// The capture is opaque to the lockstep driver: turning it into a raw
/// fragment string and scanning it for identifying fields are capabilities
/// of the subtree itself, paid for only when needed.
pub(crate) struct Subtree {
    kind: DocKind,
    events: Vec<Event<'static>>,
}

impl Subtree {
    pub(crate) fn kind(&self) -> DocKind {
        self.kind
    }

    /// Re-serializes the captured events into the package's raw XML
    /// fragment, exactly as the events came off the document. Returns
    /// `None` (with a log line) when writing fails.
    pub(crate) fn serialize(&self) -> Option<String> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            if let Err(err) = writer.write_event(event.clone()) {
                warn!(doc = %self.kind, %err, "package fragment failed to serialize");
                return None;
            }
        }
        match String::from_utf8(writer.into_inner()) {
            Ok(fragment) => Some(fragment),
            Err(err) => {
                warn!(doc = %self.kind, %err, "package fragment is not valid UTF-8");
                None
            }
        }
    }

    /// Scans the subtree's immediate element children for the four
    /// identifying fields of a primary package record, stopping as soon as
    /// all four have been seen.
    pub(crate) fn scan_primary(&self) -> FieldScan {
        let mut location_href = None;
        let mut location_base = None;
        let mut checksum_type = None;
        let mut size_package = None;
        let mut time_file = None;
        let mut seen = 0u8;
        let mut depth = 0usize;

        // events[0] is the <package> start itself.
        for event in self.events.iter().skip(1) {
            let element = match event {
                Event::Start(element) => {
                    depth += 1;
                    if depth > 1 {
                        continue;
                    }
                    element
                }
                Event::End(_) => {
                    if depth == 0 {
                        break; // closing </package>
                    }
                    depth -= 1;
                    continue;
                }
                Event::Empty(element) if depth == 0 => element,
                _ => continue,
            };
            match element.name().as_ref() {
                b"location" => {
                    location_href = attr_value(element, "href");
                    location_base = attr_value(element, "base");
                    seen += 1;
                }
                b"checksum" => {
                    checksum_type = attr_value(element, "type");
                    seen += 1;
                }
                b"size" => {
                    size_package = attr_value(element, "package").and_then(|v| v.parse().ok());
                    seen += 1;
                }
                b"time" => {
                    time_file = attr_value(element, "file").and_then(|v| v.parse().ok());
                    seen += 1;
                }
                _ => {}
            }
            if seen == 4 {
                break;
            }
        }

        match (seen, location_href, checksum_type) {
            (4, Some(location_href), Some(checksum_type)) => FieldScan::Complete(PrimaryFields {
                location_href,
                location_base,
                checksum_type,
                size_package: size_package.unwrap_or(-1),
                time_file: time_file.unwrap_or(-1),
            }),
            (_, href, _) => FieldScan::Incomplete { href },
        }
    }
}

/// Identifying fields of a primary package record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrimaryFields {
    pub location_href: String,
    pub location_base: Option<String>,
    pub checksum_type: String,
    /// -1 when the size attribute was absent or unparsable.
    pub size_package: i64,
    /// -1 when the time attribute was absent or unparsable.
    pub time_file: i64,
}

/// Outcome of scanning a primary subtree for identifying fields.
pub(crate) enum FieldScan {
    /// All four field elements were present, with usable location and
    /// checksum attributes.
    Complete(PrimaryFields),
    /// Something required was missing; the candidate must be skipped.
    Incomplete {
        /// The location href, when at least that much was present.
        href: Option<String>,
    },
}

fn attr_value(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn open_stream(kind: DocKind, body: &str) -> PackageStream {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml.gz");
        fs::write(&path, Compression::Gzip.compress(body.as_bytes()).unwrap()).unwrap();
        PackageStream::open(kind, &path, Compression::Gzip).unwrap()
    }

    #[test]
    fn test_subtree_roundtrip() {
        let body = "<filelists packages=\"1\">\
                    <package pkgid=\"abc\" name=\"bash\"><file>/usr/bin/bash</file></package>\
                    </filelists>";
        let mut stream = open_stream(DocKind::Filelists, body);
        stream.expect_root().unwrap();
        stream.expect_first_package().unwrap();

        let subtree = stream.next_package().unwrap().unwrap();
        let fragment = subtree.serialize().unwrap();
        assert_eq!(
            fragment,
            "<package pkgid=\"abc\" name=\"bash\"><file>/usr/bin/bash</file></package>"
        );
        assert!(stream.next_package().unwrap().is_none());
    }

    #[test]
    fn test_wrong_root_tag() {
        let mut stream = open_stream(DocKind::Primary, "<filelists/>");
        let err = stream.expect_root().unwrap_err();
        assert!(matches!(
            *err,
            ErrorKind::MalformedDocument {
                doc: DocKind::Primary
            }
        ));
    }

    #[test]
    fn test_empty_root_has_no_first_package() {
        let mut stream = open_stream(DocKind::Primary, "<metadata packages=\"0\"/>");
        stream.expect_root().unwrap();
        assert!(stream.expect_first_package().is_err());
    }

    #[test]
    fn test_scan_primary_nested_fields_ignored() {
        // A <location> buried inside another element must not satisfy the
        // scan; only immediate children count.
        let body = "<metadata><package>\
                    <format><location href=\"wrong.rpm\"/></format>\
                    <checksum type=\"sha256\">aa</checksum>\
                    <size package=\"10\"/>\
                    <time file=\"20\"/>\
                    <location href=\"pool/right.rpm\"/>\
                    </package></metadata>";
        let mut stream = open_stream(DocKind::Primary, body);
        stream.expect_root().unwrap();
        stream.expect_first_package().unwrap();
        let subtree = stream.next_package().unwrap().unwrap();
        match subtree.scan_primary() {
            FieldScan::Complete(fields) => {
                assert_eq!(fields.location_href, "pool/right.rpm");
                assert_eq!(fields.size_package, 10);
                assert_eq!(fields.time_file, 20);
                assert_eq!(fields.checksum_type, "sha256");
                assert_eq!(fields.location_base, None);
            }
            FieldScan::Incomplete { .. } => panic!("scan should be complete"),
        }
    }

    #[test]
    fn test_scan_primary_unparsable_numbers() {
        let body = "<metadata><package>\
                    <checksum type=\"sha1\">aa</checksum>\
                    <size/>\
                    <time build=\"99\"/>\
                    <location href=\"x.rpm\" base=\"http://mirror.example\"/>\
                    </package></metadata>";
        let mut stream = open_stream(DocKind::Primary, body);
        stream.expect_root().unwrap();
        stream.expect_first_package().unwrap();
        let subtree = stream.next_package().unwrap().unwrap();
        match subtree.scan_primary() {
            FieldScan::Complete(fields) => {
                assert_eq!(fields.size_package, -1);
                assert_eq!(fields.time_file, -1);
                assert_eq!(
                    fields.location_base.as_deref(),
                    Some("http://mirror.example")
                );
            }
            FieldScan::Incomplete { .. } => panic!("scan should be complete"),
        }
    }

    #[test]
    fn test_scan_primary_missing_checksum() {
        let body = "<metadata><package>\
                    <size package=\"10\"/>\
                    <time file=\"20\"/>\
                    <location href=\"pool/x.rpm\"/>\
                    </package></metadata>";
        let mut stream = open_stream(DocKind::Primary, body);
        stream.expect_root().unwrap();
        stream.expect_first_package().unwrap();
        let subtree = stream.next_package().unwrap().unwrap();
        match subtree.scan_primary() {
            FieldScan::Complete(_) => panic!("scan should be incomplete"),
            FieldScan::Incomplete { href } => assert_eq!(href.as_deref(), Some("pool/x.rpm")),
        }
    }
}
