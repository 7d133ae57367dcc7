//! Codec-dispatched compression operations.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::{Compression as BzLevel, read::BzDecoder, write::BzEncoder};
use exn::ResultExt;
use flate2::{Compression as GzLevel, read::GzDecoder, write::GzEncoder};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use tracing::instrument;
use xz2::{read::XzDecoder, write::XzEncoder};
use zstd::stream::{read::Decoder as ZstdDecoder, write::Encoder as ZstdEncoder};

// Metadata files are rewritten on every repository regeneration, so the
// encoders use moderate levels rather than maximum-ratio ones.
const XZ_LEVEL: u32 = 6;
// Level 0 delegates to the zstd library default (currently 3).
const ZSTD_LEVEL: i32 = 0;

impl Compression {
    /// Compress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use remeta_compress::Compression;
    ///
    /// let data = b"<metadata xmlns=\"http://linux.duke.edu/metadata/common\"/>";
    /// let compressed = Compression::Gzip.compress(data).unwrap();
    /// assert_ne!(compressed.as_slice(), data.as_slice());
    /// ```
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, BzLevel::default());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            }
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, GzLevel::default());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            }
            Compression::Xz => {
                let mut encoder = XzEncoder::new(&mut output, XZ_LEVEL);
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            }
            Compression::Zstd => {
                let mut encoder =
                    ZstdEncoder::new(&mut output, ZSTD_LEVEL).or_raise(|| ErrorKind::Encoder)?;
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            }
        }
        Ok(output)
    }

    /// Decompress a byte slice in memory.
    ///
    /// # Examples
    ///
    /// ```
    /// use remeta_compress::Compression;
    ///
    /// let original = b"<filelists/>";
    /// let compressed = Compression::Bzip2.compress(original).unwrap();
    /// let decompressed = Compression::Bzip2.decompress(&compressed).unwrap();
    /// assert_eq!(decompressed, original);
    /// ```
    pub fn decompress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut decoder = BzDecoder::new(input);
                decoder
                    .read_to_end(&mut output)
                    .or_raise(|| ErrorKind::InvalidData)?;
            }
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(input);
                decoder
                    .read_to_end(&mut output)
                    .or_raise(|| ErrorKind::InvalidData)?;
            }
            Compression::Xz => {
                let mut decoder = XzDecoder::new(input);
                decoder
                    .read_to_end(&mut output)
                    .or_raise(|| ErrorKind::InvalidData)?;
            }
            Compression::Zstd => {
                let mut decoder = ZstdDecoder::new(input).or_raise(|| ErrorKind::Encoder)?;
                decoder
                    .read_to_end(&mut output)
                    .or_raise(|| ErrorKind::InvalidData)?;
            }
        }
        Ok(output)
    }

    /// Wrap a reader with the appropriate decompression layer.
    ///
    /// Returns a boxed reader that yields decompressed bytes.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
            Compression::Xz => Box::new(XzDecoder::new(reader)),
            Compression::Zstd => {
                Box::new(ZstdDecoder::new(reader).or_raise(|| ErrorKind::Encoder)?)
            }
        })
    }

    /// Wrap a writer with the appropriate compression layer.
    ///
    /// Returns a boxed writer that compresses data on write.
    pub fn wrap_writer<'a, W: Write + 'a>(&self, writer: W) -> Result<Box<dyn Write + 'a>> {
        Ok(match self {
            Compression::None => Box::new(writer),
            Compression::Bzip2 => Box::new(BzEncoder::new(writer, BzLevel::default())),
            Compression::Gzip => Box::new(GzEncoder::new(writer, GzLevel::default())),
            Compression::Xz => Box::new(XzEncoder::new(writer, XZ_LEVEL)),
            Compression::Zstd => Box::new(
                ZstdEncoder::new(writer, ZSTD_LEVEL)
                    .or_raise(|| ErrorKind::Encoder)?
                    .auto_finish(),
            ),
        })
    }

    /// Open a file for streaming decompressed reads with this codec.
    ///
    /// Compressed bytes are pulled from disk through a [`BufReader`] and come
    /// out as plaintext. The underlying file handle is released when the
    /// returned reader is dropped.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Io`] if the file cannot be opened.
    /// - [`ErrorKind::Encoder`] if the decoder fails to initialize.
    #[instrument(skip(path), fields(path = %path.as_ref().display(), codec = %self))]
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
        let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Io)?;
        self.wrap_reader(BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;
    use std::io::{Cursor, Read};

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_compress_decompress(#[case] codec: Compression) {
        let original = b"<package type=\"rpm\"><name>bash</name></package>";
        let compressed = codec.compress(original).unwrap();
        let decompressed = codec.decompress(&compressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[rstest]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_invalid_compressed_data(#[case] codec: Compression) {
        let invalid_data = b"this is not compressed data";
        assert!(codec.decompress(invalid_data).is_err());
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_wrap_reader(#[case] codec: Compression) {
        let original = b"<otherdata packages=\"1\"/>";
        let compressed = codec.compress(original).unwrap();
        let mut reader = codec
            .wrap_reader(Cursor::new(compressed))
            .expect("decoder to initialize");
        let mut decompressed = Vec::new();
        reader.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Bzip2)]
    #[case(Compression::Gzip)]
    #[case(Compression::Xz)]
    #[case(Compression::Zstd)]
    fn test_open(#[case] codec: Compression) {
        let original = b"<metadata packages=\"0\"/>";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.blob");
        std::fs::write(&path, codec.compress(original).unwrap()).unwrap();

        let mut reader = codec.open(&path).unwrap();
        let mut decompressed = Vec::new();
        reader.read_to_end(&mut decompressed).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Compression::Gzip.open(dir.path().join("absent.gz")).is_err());
    }
}
