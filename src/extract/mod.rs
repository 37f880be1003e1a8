//! Extraction of a whole archive into a destination directory.
//!
//! A run walks the archive in storage order and, for every selected entry,
//! resolves its destination ([`resolve`]), creates the directories it needs
//! ([`ensure_dir`]) and writes it ([`write_entry`]). The first failure stops
//! the run; entries written before it stay on disk.
//!
//! Handle accounting: the archive is the only long-lived descriptor and is
//! closed before [`Extractor::extract`] returns. At most one destination
//! file is open at any time, and only inside [`write_entry`].

mod filter;
mod materialize;
mod options;
mod resolve;
mod writer;

pub use filter::{glob_match, is_selected};
pub use materialize::ensure_dir;
pub use options::{DEFAULT_BUFFER_SIZE, ExtractOptions, Overwrite};
pub use resolve::resolve;
pub use writer::{WriteOutcome, copy_entry, write_entry};

use std::io::Write;
use std::path::Path;
use tracing::{debug, info, info_span, warn};

use crate::error::{ExtractionError, Result};
use crate::io::ReadAt;
use crate::zip::{ZipArchive, ZipEntry};

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub files: usize,
    pub directories: usize,
    /// File entries left alone because the destination already existed.
    pub skipped: usize,
    /// Entries not selected by the include/exclude/junk options.
    pub filtered: usize,
    pub bytes: u64,
}

impl ExtractionReport {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Directory => self.directories += 1,
            WriteOutcome::File { bytes } => {
                self.files += 1;
                self.bytes += bytes;
            }
            WriteOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Runs extractions with a fixed set of options.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract every selected entry of the archive at `archive_path` below
    /// `dest_root`, creating `dest_root` if needed.
    ///
    /// # Arguments
    ///
    /// * `archive_path` - Path of the ZIP file to read
    /// * `dest_root` - Directory every entry must land inside
    ///
    /// # Returns
    ///
    /// An [`ExtractionReport`] counting what was written, skipped and
    /// filtered out.
    ///
    /// # Errors
    ///
    /// Stops at the first entry that fails and returns its error, carrying
    /// the entry name and, once resolved, its destination path. Entries
    /// written before the failure stay on disk. The archive is closed before
    /// this returns, on success and on every error path.
    pub fn extract(
        &self,
        archive_path: impl AsRef<Path>,
        dest_root: impl AsRef<Path>,
    ) -> Result<ExtractionReport> {
        self.extract_with(archive_path, dest_root, |_, _| {})
    }

    /// Like [`extract`](Self::extract), calling `progress` after each entry
    /// has been handled.
    pub fn extract_with<F>(
        &self,
        archive_path: impl AsRef<Path>,
        dest_root: impl AsRef<Path>,
        progress: F,
    ) -> Result<ExtractionReport>
    where
        F: FnMut(&ZipEntry, WriteOutcome),
    {
        let archive_path = archive_path.as_ref();
        let dest_root = dest_root.as_ref();
        let _span = info_span!(
            "extract",
            archive = %archive_path.display(),
            dest = %dest_root.display()
        )
        .entered();

        let mut archive = ZipArchive::open(archive_path)?;
        let outcome = self.extract_from(&archive, dest_root, progress);
        archive.close();

        match &outcome {
            Ok(report) => info!(
                files = report.files,
                directories = report.directories,
                skipped = report.skipped,
                bytes = report.bytes,
                "extraction complete"
            ),
            Err(e) => warn!(error = %e, "extraction failed"),
        }
        outcome
    }

    /// Extract from an archive the caller already holds open.
    ///
    /// The caller stays responsible for closing `archive`.
    pub fn extract_from<R, F>(
        &self,
        archive: &ZipArchive<R>,
        dest_root: &Path,
        mut progress: F,
    ) -> Result<ExtractionReport>
    where
        R: ReadAt,
        F: FnMut(&ZipEntry, WriteOutcome),
    {
        let root = std::path::absolute(dest_root)
            .map_err(|e| ExtractionError::from_io(e, dest_root))?;
        ensure_dir(&root)?;

        let mut report = ExtractionReport::default();
        for entry in archive.entries() {
            let entry = entry?;
            if !is_selected(&entry, &self.options) {
                debug!(entry = %entry.file_name, "filtered out");
                report.filtered += 1;
                continue;
            }

            let outcome = self
                .extract_entry(archive, &entry, &root)
                .map_err(|e| e.with_entry(&entry.file_name))?;
            if outcome == WriteOutcome::Skipped {
                warn!(entry = %entry.file_name, "destination exists, skipping");
            }
            report.record(outcome);
            progress(&entry, outcome);
        }
        Ok(report)
    }

    fn extract_entry<R: ReadAt>(
        &self,
        archive: &ZipArchive<R>,
        entry: &ZipEntry,
        root: &Path,
    ) -> Result<WriteOutcome> {
        let name = if self.options.junk_paths {
            base_name(&entry.file_name)
        } else {
            entry.file_name.as_str()
        };

        let dest = resolve(name, root)?;
        debug!(entry = %entry.file_name, dest = %dest.display(), "resolved");
        write_entry(archive, entry, &dest, &self.options).map_err(|e| e.with_path(&dest))
    }

    /// Stream the selected file entries into `out`, one after another.
    ///
    /// When more than one file is selected, each is preceded by a
    /// `--- name ---` line so the boundaries stay visible.
    ///
    /// # Arguments
    ///
    /// * `archive_path` - Path of the ZIP file to read
    /// * `out` - Sink for the uncompressed bytes, typically locked stdout
    ///
    /// # Returns
    ///
    /// The number of entry bytes written, markers not included.
    ///
    /// # Errors
    ///
    /// Fails on the first entry that cannot be read or written. The archive
    /// is closed before this returns.
    pub fn extract_to_writer<W: Write>(
        &self,
        archive_path: impl AsRef<Path>,
        out: &mut W,
    ) -> Result<u64> {
        let archive_path = archive_path.as_ref();
        let _span = info_span!("pipe", archive = %archive_path.display()).entered();

        let mut archive = ZipArchive::open(archive_path)?;
        let outcome = self.copy_selected(&archive, out);
        archive.close();

        match &outcome {
            Ok(bytes) => info!(bytes = *bytes, "pipe complete"),
            Err(e) => warn!(error = %e, "pipe failed"),
        }
        outcome
    }

    fn copy_selected<R: ReadAt, W: Write>(
        &self,
        archive: &ZipArchive<R>,
        out: &mut W,
    ) -> Result<u64> {
        let wanted = |entry: &ZipEntry| !entry.is_directory && is_selected(entry, &self.options);

        // First pass only counts, so a single file is piped bare
        let mut selected = 0usize;
        for entry in archive.entries() {
            if wanted(&entry?) {
                selected += 1;
            }
        }
        let show_names = selected > 1;

        let mut total = 0;
        for entry in archive.entries() {
            let entry = entry?;
            if !wanted(&entry) {
                continue;
            }
            if show_names {
                writeln!(out, "--- {} ---", entry.file_name).map_err(|e| {
                    ExtractionError::Io {
                        entry: Some(entry.file_name.clone()),
                        path: None,
                        source: e,
                    }
                })?;
            }
            total += copy_entry(archive, &entry, out, self.options.buffer_size)
                .map_err(|e| e.with_entry(&entry.file_name))?;
        }
        Ok(total)
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Extract `archive_path` into `dest_root` with default options: every
/// entry, existing files overwritten.
pub fn extract(
    archive_path: impl AsRef<Path>,
    dest_root: impl AsRef<Path>,
) -> Result<ExtractionReport> {
    Extractor::default().extract(archive_path, dest_root)
}

/// List the entries of the archive at `archive_path` in storage order.
///
/// # Errors
///
/// `NotFound` if the archive is missing, `CorruptArchive` if its central
/// directory cannot be walked. The archive is closed either way.
pub fn list(archive_path: impl AsRef<Path>) -> Result<Vec<ZipEntry>> {
    let mut archive = ZipArchive::open(archive_path)?;
    let entries: Result<Vec<ZipEntry>> = archive.entries().collect();
    archive.close();
    entries
}
