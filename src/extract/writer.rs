use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::debug;

use super::materialize::ensure_dir;
use super::options::{ExtractOptions, Overwrite};
use crate::error::{ExtractionError, Result};
use crate::io::ReadAt;
use crate::zip::{ZipArchive, ZipEntry};

/// What [`write_entry`] did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Directory,
    File { bytes: u64 },
    /// Destination existed and the options said not to touch it.
    Skipped,
}

/// Materialize one entry at `dest`.
///
/// The entry stream and the destination file are locals of this function:
/// both are closed before it returns, whether the copy finished, the archive
/// data turned out to be bad, or the destination refused the bytes.
pub fn write_entry<R: ReadAt>(
    archive: &ZipArchive<R>,
    entry: &ZipEntry,
    dest: &Path,
    options: &ExtractOptions,
) -> Result<WriteOutcome> {
    if entry.is_directory {
        ensure_dir(dest)?;
        return Ok(WriteOutcome::Directory);
    }

    if options.overwrite == Overwrite::Never && dest.symlink_metadata().is_ok() {
        return Ok(WriteOutcome::Skipped);
    }

    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    let mut source = archive.entry_reader(entry)?;
    let mut file = File::create(dest).map_err(|e| ExtractionError::from_io(e, dest))?;
    let bytes = copy_chunks(&mut source, &mut file, options.buffer_size, Some(dest))?;

    debug!(entry = %entry.file_name, bytes, "wrote file");
    Ok(WriteOutcome::File { bytes })
}

/// Stream one entry into `out`. Directory entries produce nothing.
pub fn copy_entry<R: ReadAt, W: Write>(
    archive: &ZipArchive<R>,
    entry: &ZipEntry,
    out: &mut W,
    buffer_size: usize,
) -> Result<u64> {
    if entry.is_directory {
        return Ok(0);
    }
    let mut source = archive.entry_reader(entry)?;
    copy_chunks(&mut source, out, buffer_size, None)
}

/// Copy in chunks of at most `buffer_size` bytes, telling read failures
/// (archive side) apart from write failures (destination side).
fn copy_chunks<S: Read, W: Write>(
    source: &mut S,
    out: &mut W,
    buffer_size: usize,
    dest: Option<&Path>,
) -> Result<u64> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        out.write_all(&buf[..n]).map_err(|e| write_error(e, dest))?;
        total += n as u64;
    }

    out.flush().map_err(|e| write_error(e, dest))?;
    Ok(total)
}

fn read_error(e: io::Error) -> ExtractionError {
    match e.kind() {
        io::ErrorKind::InvalidData => ExtractionError::corrupt(e),
        _ => ExtractionError::Io {
            entry: None,
            path: None,
            source: e,
        },
    }
}

fn write_error(e: io::Error, dest: Option<&Path>) -> ExtractionError {
    match dest {
        Some(path) => ExtractionError::from_io(e, path),
        None => ExtractionError::Io {
            entry: None,
            path: None,
            source: e,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter {
        kind: io::ErrorKind,
    }

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(self.kind.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BadData;

    impl Read for BadData {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "CRC-32 mismatch"))
        }
    }

    #[test]
    fn copies_in_small_chunks() {
        let mut source: &[u8] = b"hello, chunked world";
        let mut out = Vec::new();
        let n = copy_chunks(&mut source, &mut out, 3, None).unwrap();
        assert_eq!(n, 20);
        assert_eq!(out, b"hello, chunked world");
    }

    #[test]
    fn full_disk_is_disk_full() {
        let mut source: &[u8] = b"data";
        let mut out = FailingWriter {
            kind: io::ErrorKind::StorageFull,
        };
        let err = copy_chunks(&mut source, &mut out, 16, Some(Path::new("/dest/f"))).unwrap_err();
        assert!(matches!(err, ExtractionError::DiskFull { .. }));
    }

    #[test]
    fn broken_pipe_is_io() {
        let mut source: &[u8] = b"data";
        let mut out = FailingWriter {
            kind: io::ErrorKind::BrokenPipe,
        };
        let err = copy_chunks(&mut source, &mut out, 16, None).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { path: None, .. }));
    }

    #[test]
    fn bad_archive_data_is_corrupt() {
        let mut out = Vec::new();
        let err = copy_chunks(&mut BadData, &mut out, 16, None).unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptArchive { .. }));
    }
}
