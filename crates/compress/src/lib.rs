//! Transparent multi-codec (de)compression for repository metadata files.
//!
//! Repository metadata arrives in whatever codec the publishing tool chose:
//! `primary.xml.gz` from one writer, `primary.xml.zst` from another, plain
//! XML in tiny hand-rolled test repos. This crate hides the codec zoo behind
//! a single [`Compression`] enum providing:
//!
//! - **Codec detection** from magic bytes ([`Compression::from_magic_bytes`]),
//!   file extensions ([`Compression::from_path`]), or both at once against an
//!   on-disk file ([`Compression::detect`])
//! - **Streaming** decompression via wrapped readers ([`Compression::open`],
//!   [`Compression::wrap_reader`]) and compression via wrapped writers
//!   ([`Compression::wrap_writer`])
//! - **In-memory** helpers ([`Compression::compress`],
//!   [`Compression::decompress`]) for small payloads and test fixtures
//!
//! Gzip, bzip2, xz and zstd are always available; there are no feature gates
//! because a metadata reader does not get to choose what it is fed.

mod construct;
pub mod error;
mod ops;
mod util;

/// A supported compression codec.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 (.bz2)
    Bzip2,
    /// Gzip (.gz)
    Gzip,
    /// XZ/LZMA (.xz)
    Xz,
    /// Zstandard (.zst)
    Zstd,
}
