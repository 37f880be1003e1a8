use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{info, trace};

use crate::error::{ExtractionError, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::parser::{CentralDirectory, ZipParser};
use super::structures::{CompressionMethod, ZipEntry};

/// An opened ZIP archive.
///
/// The archive owns its data source. [`close`](Self::close) releases it and
/// may be called any number of times; dropping the archive closes it too,
/// so the source never outlives the scope that opened it.
#[derive(Debug)]
pub struct ZipArchive<R: ReadAt = LocalFileReader> {
    source: Option<R>,
    path: PathBuf,
    directory: CentralDirectory,
}

impl ZipArchive<LocalFileReader> {
    /// Open the archive at `path` and locate its central directory.
    ///
    /// Fails with `NotFound` if the path does not exist and with
    /// `CorruptArchive` if it is not a ZIP file. On failure the file is
    /// already closed when this returns.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = LocalFileReader::new(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExtractionError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ExtractionError::from_io(e, path),
        })?;
        Self::with_reader(reader, path)
    }
}

impl<R: ReadAt> ZipArchive<R> {
    /// Wrap an arbitrary random-access source. `label` is only used in
    /// diagnostics.
    pub fn with_reader(reader: R, label: impl AsRef<Path>) -> Result<Self> {
        let path = label.as_ref().to_path_buf();
        let directory = ZipParser::new(&reader).central_directory()?;
        info!(
            archive = %path.display(),
            entries = directory.total_entries,
            "opened archive"
        );
        Ok(Self {
            source: Some(reader),
            path,
            directory,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries recorded in the central directory.
    pub fn len(&self) -> u64 {
        self.directory.total_entries
    }

    pub fn is_empty(&self) -> bool {
        self.directory.total_entries == 0
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Release the underlying source. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            drop(source);
            trace!(archive = %self.path.display(), "closed archive");
        }
    }

    fn source(&self) -> Result<&R> {
        self.source.as_ref().ok_or_else(|| ExtractionError::Io {
            entry: None,
            path: Some(self.path.clone()),
            source: io::Error::other("archive is closed"),
        })
    }

    /// Iterate entries in storage order.
    ///
    /// Every call starts again from the archive index, so the sequence can
    /// be walked as often as needed. The iterator yields at most one error
    /// and then stops.
    pub fn entries(&self) -> Entries<'_, R> {
        Entries {
            archive: self,
            next_offset: self.directory.offset,
            remaining: self.directory.total_entries,
        }
    }

    /// Open a stream over the uncompressed bytes of `entry`.
    ///
    /// The stream reads through this archive's source and opens nothing of
    /// its own. Size and CRC-32 are checked once the stream is exhausted.
    pub fn entry_reader(&self, entry: &ZipEntry) -> Result<EntryReader<'_, R>> {
        let source = self.source()?;

        if entry.is_encrypted() {
            return Err(ExtractionError::Unsupported {
                entry: entry.file_name.clone(),
                path: None,
                reason: "encrypted entries are not supported".into(),
            });
        }

        let raw = RangeReader {
            source,
            offset: entry.data_offset,
            remaining: entry.compressed_size,
        };
        let decoder = match entry.compression_method {
            CompressionMethod::Stored => Decoder::Stored(raw),
            CompressionMethod::Deflate => Decoder::Deflate(DeflateDecoder::new(raw)),
            CompressionMethod::Unknown(method) => {
                return Err(ExtractionError::Unsupported {
                    entry: entry.file_name.clone(),
                    path: None,
                    reason: format!("compression method {method}"),
                });
            }
        };

        Ok(EntryReader {
            decoder,
            crc: Crc::new(),
            produced: 0,
            expected_size: entry.uncompressed_size,
            expected_crc: entry.crc32,
            verified: false,
        })
    }
}

impl<R: ReadAt> Drop for ZipArchive<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lazy iterator over the central directory.
pub struct Entries<'a, R: ReadAt> {
    archive: &'a ZipArchive<R>,
    next_offset: u64,
    remaining: u64,
}

impl<R: ReadAt> Entries<'_, R> {
    fn read_next(&mut self) -> Result<ZipEntry> {
        let parser = ZipParser::new(self.archive.source()?);
        let (mut entry, next) = parser.read_cdfh(self.next_offset, &self.archive.directory)?;
        entry.data_offset = parser
            .get_data_offset(&entry)
            .map_err(|e| e.with_entry(&entry.file_name))?;
        self.next_offset = next;
        Ok(entry)
    }
}

impl<R: ReadAt> Iterator for Entries<'_, R> {
    type Item = Result<ZipEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.read_next() {
            Ok(entry) => {
                self.remaining -= 1;
                Some(Ok(entry))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, usize::try_from(self.remaining).ok())
    }
}

/// `Read` adapter over a byte range of a [`ReadAt`] source.
struct RangeReader<'a, R: ReadAt> {
    source: &'a R,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> Read for RangeReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.source.read_at(self.offset, &mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive ended inside entry data",
            ));
        }
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

enum Decoder<'a, R: ReadAt> {
    Stored(RangeReader<'a, R>),
    Deflate(DeflateDecoder<RangeReader<'a, R>>),
}

/// Stream of one entry's uncompressed bytes.
///
/// Integrity failures (short data, overlong inflate output, CRC mismatch)
/// surface as `io::ErrorKind::InvalidData`.
pub struct EntryReader<'a, R: ReadAt> {
    decoder: Decoder<'a, R>,
    crc: Crc,
    produced: u64,
    expected_size: u64,
    expected_crc: u32,
    verified: bool,
}

impl<R: ReadAt> EntryReader<'_, R> {
    fn verify(&mut self) -> io::Result<()> {
        if self.produced != self.expected_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "size mismatch: expected {} bytes, got {}",
                    self.expected_size, self.produced
                ),
            ));
        }
        if self.crc.sum() != self.expected_crc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "CRC-32 mismatch: expected {:08x}, got {:08x}",
                    self.expected_crc,
                    self.crc.sum()
                ),
            ));
        }
        self.verified = true;
        Ok(())
    }
}

impl<R: ReadAt> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = match &mut self.decoder {
            Decoder::Stored(raw) => raw.read(buf),
            Decoder::Deflate(inflate) => inflate.read(buf),
        }
        .map_err(|e| match e.kind() {
            // flate2 reports a damaged stream as InvalidInput
            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidInput => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
            _ => e,
        })?;

        if n == 0 {
            if !self.verified {
                self.verify()?;
            }
            return Ok(0);
        }

        self.produced += n as u64;
        if self.produced > self.expected_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "entry inflates past its declared size",
            ));
        }
        self.crc.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_file_is_not_found() {
        let err = ZipArchive::open("/definitely/not/here.zip").err().unwrap();
        assert!(matches!(err, ExtractionError::NotFound { .. }));
    }

    #[test]
    fn garbage_is_corrupt() {
        let data = vec![0u8; 64];
        let err = ZipArchive::with_reader(data, "garbage.zip").err().unwrap();
        assert!(matches!(err, ExtractionError::CorruptArchive { .. }));
    }

    #[test]
    fn empty_archive_has_no_entries() {
        // Bare EOCD: an archive with zero entries
        let mut data = b"PK\x05\x06".to_vec();
        data.extend_from_slice(&[0u8; 18]);
        let mut archive = ZipArchive::with_reader(data, "empty.zip").unwrap();
        assert!(archive.is_empty());
        assert_eq!(archive.entries().count(), 0);

        archive.close();
        archive.close();
        assert!(archive.is_closed());
    }
}
