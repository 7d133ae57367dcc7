use crate::Compression;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Longest magic sequence recognized by [`Compression::from_magic_bytes`].
const MAGIC_LEN: usize = 6;

/// Extensions of files that are expected to be stored uncompressed.
const PLAIN_EXTENSIONS: [&str; 2] = ["xml", "sqlite"];

impl FromStr for Compression {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            "gz" | "gzip" => Ok(Compression::Gzip),
            "xz" | "lzma" => Ok(Compression::Xz),
            "zst" | "zstd" => Ok(Compression::Zstd),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Compression {
    /// Detect a codec from a file extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| match ext.to_lowercase().as_str() {
                "bz2" => Compression::Bzip2,
                "gz" => Compression::Gzip,
                "xz" => Compression::Xz,
                "zst" => Compression::Zstd,
                _ => Compression::None,
            })
            .unwrap_or(Compression::None)
    }

    /// Detect a codec from magic bytes.
    ///
    /// Returns the `None` variant if no magic bytes match or if the input
    /// is too short to identify any codec.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Compression::Bzip2;
        }
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        if bytes.starts_with(&XZ_MAGIC) {
            return Compression::Xz;
        }
        if bytes.starts_with(&ZSTD_MAGIC) {
            return Compression::Zstd;
        }
        Compression::None
    }

    /// Detect the codec of an on-disk file, preferring content over name.
    ///
    /// Sniffs the first few bytes of the file and matches them against the
    /// known magic sequences. When nothing matches, the file may
    /// legitimately be uncompressed, but only if its name says so as well:
    /// a `.gz` file without gzip magic is corrupt, and a file with an
    /// unrecognized extension is anybody's guess. Both fail with
    /// [`ErrorKind::UnknownCompression`].
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Io`] if the file cannot be opened or read.
    /// - [`ErrorKind::UnknownCompression`] if neither content nor extension
    ///   identify a codec.
    pub fn detect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).or_raise(|| ErrorKind::Io)?;
        let mut head = [0u8; MAGIC_LEN];
        let mut filled = 0;
        while filled < MAGIC_LEN {
            let n = file.read(&mut head[filled..]).or_raise(|| ErrorKind::Io)?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        let sniffed = Self::from_magic_bytes(&head[..filled]);
        if sniffed != Compression::None {
            debug!(codec = %sniffed, path = %path.display(), "detected codec from magic bytes");
            return Ok(sniffed);
        }

        let plain = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| PLAIN_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        if plain {
            return Ok(Compression::None);
        }
        exn::bail!(ErrorKind::UnknownCompression(path.display().to_string()))
    }
}
