//! Error types for archive extraction.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using [`ExtractionError`].
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Errors that can occur while reading or extracting a ZIP archive.
///
/// Every variant that can be attributed to a single entry carries the entry
/// name, so a caller can tell which part of the archive stopped the run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The archive file does not exist.
    #[error("archive not found: {}", .path.display())]
    NotFound {
        /// Path that was opened.
        path: PathBuf,
    },

    /// The container structure could not be parsed, or entry data failed
    /// its integrity check.
    #[error("corrupt archive{}{}: {reason}", entry_suffix(.entry), path_suffix(.path))]
    CorruptArchive {
        /// Offending entry, if the damage is local to one entry.
        entry: Option<String>,
        /// Destination the entry was being written to, if any.
        path: Option<PathBuf>,
        /// What was wrong.
        reason: String,
    },

    /// The entry name resolves outside the destination root.
    #[error("path traversal detected: entry '{entry}' escapes {}", .root.display())]
    PathTraversal {
        /// Raw entry name as stored in the archive.
        entry: String,
        /// Destination root the entry tried to leave.
        root: PathBuf,
    },

    /// The OS refused access to a path.
    #[error("permission denied{}: {}", entry_suffix(.entry), .path.display())]
    PermissionDenied {
        /// Entry being processed, if any.
        entry: Option<String>,
        /// Path the operation failed on.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The destination filesystem ran out of space.
    #[error("disk full{}: {}", entry_suffix(.entry), .path.display())]
    DiskFull {
        /// Entry being written.
        entry: Option<String>,
        /// Destination path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },

    /// The entry uses a feature this extractor does not implement.
    #[error("unsupported entry '{entry}'{}: {reason}", path_suffix(.path))]
    Unsupported {
        /// Entry name.
        entry: String,
        /// Destination the entry would have been written to, if known.
        path: Option<PathBuf>,
        /// What is unsupported.
        reason: String,
    },

    /// Any other I/O failure.
    #[error("I/O error{}{}: {source}", entry_suffix(.entry), path_suffix(.path))]
    Io {
        /// Entry being processed, if any.
        entry: Option<String>,
        /// Path involved, if any.
        path: Option<PathBuf>,
        /// Underlying cause.
        #[source]
        source: io::Error,
    },
}

fn entry_suffix(entry: &Option<String>) -> String {
    entry
        .as_ref()
        .map(|name| format!(" in entry '{name}'"))
        .unwrap_or_default()
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_default()
}

impl ExtractionError {
    /// Build a [`CorruptArchive`](Self::CorruptArchive) error not tied to an entry.
    pub fn corrupt(reason: impl std::fmt::Display) -> Self {
        Self::CorruptArchive {
            entry: None,
            path: None,
            reason: reason.to_string(),
        }
    }

    /// Classify an I/O error raised while touching `path`.
    ///
    /// `PermissionDenied` and `ReadOnlyFilesystem` become
    /// [`PermissionDenied`](Self::PermissionDenied), `StorageFull` becomes
    /// [`DiskFull`](Self::DiskFull); everything else is [`Io`](Self::Io).
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied {
                    entry: None,
                    path,
                    source,
                }
            }
            io::ErrorKind::StorageFull => Self::DiskFull {
                entry: None,
                path,
                source,
            },
            _ => Self::Io {
                entry: None,
                path: Some(path),
                source,
            },
        }
    }

    /// Attach the offending entry name, keeping any name already present.
    pub fn with_entry(mut self, name: &str) -> Self {
        match &mut self {
            Self::CorruptArchive { entry, .. }
            | Self::PermissionDenied { entry, .. }
            | Self::DiskFull { entry, .. }
            | Self::Io { entry, .. } => {
                if entry.is_none() {
                    *entry = Some(name.to_string());
                }
            }
            Self::NotFound { .. } | Self::PathTraversal { .. } | Self::Unsupported { .. } => {}
        }
        self
    }

    /// Attach the destination path the failing entry was headed for,
    /// keeping any path already present.
    ///
    /// Errors that always carry a path (`PermissionDenied`, `DiskFull`) and
    /// those about the archive itself (`NotFound`, `PathTraversal`) are
    /// returned unchanged.
    pub fn with_path(mut self, dest: &Path) -> Self {
        match &mut self {
            Self::CorruptArchive { path, .. }
            | Self::Unsupported { path, .. }
            | Self::Io { path, .. } => {
                if path.is_none() {
                    *path = Some(dest.to_path_buf());
                }
            }
            Self::NotFound { .. }
            | Self::PathTraversal { .. }
            | Self::PermissionDenied { .. }
            | Self::DiskFull { .. } => {}
        }
        self
    }

    /// Destination or archive path the error is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path } => Some(path.as_path()),
            Self::PermissionDenied { path, .. } | Self::DiskFull { path, .. } => {
                Some(path.as_path())
            }
            Self::CorruptArchive { path, .. }
            | Self::Unsupported { path, .. }
            | Self::Io { path, .. } => path.as_deref(),
            Self::PathTraversal { .. } => None,
        }
    }

    /// Name of the entry the error is attributed to, if any.
    pub fn entry(&self) -> Option<&str> {
        match self {
            Self::CorruptArchive { entry, .. }
            | Self::PermissionDenied { entry, .. }
            | Self::DiskFull { entry, .. }
            | Self::Io { entry, .. } => entry.as_deref(),
            Self::PathTraversal { entry, .. } | Self::Unsupported { entry, .. } => Some(entry),
            Self::NotFound { .. } => None,
        }
    }

    /// Returns `true` for a rejected zip-slip entry.
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, Self::PathTraversal { .. })
    }
}
