//! # safeunzip
//!
//! A Rust unzip utility built around one guarantee: every file handle it
//! opens is released before the call that opened it returns, on success and
//! on every error path.
//!
//! ## Features
//!
//! - Extract ZIP files from the local filesystem
//! - Zip-slip protection: entries that would land outside the destination are rejected
//! - Support for ZIP64 format (archives larger than 4GB)
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - CRC-32 and size verification of every entry
//! - Selective extraction with glob pattern matching
//!
//! ## Example
//!
//! ```no_run
//! fn main() -> Result<(), safeunzip::ExtractionError> {
//!     let report = safeunzip::extract("package.zip", "out")?;
//!     println!("{} files, {} bytes", report.files, report.bytes);
//!
//!     for entry in safeunzip::list("package.zip")? {
//!         println!("{}", entry.file_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Extraction is fail-fast and not transactional: when an entry fails,
//! entries written before it stay on disk. Callers that need all-or-nothing
//! behaviour can extract into a staging directory and rename it on success.

pub mod cli;
pub mod error;
pub mod extract;
pub mod io;
pub mod zip;

pub use crate::cli::Cli;
pub use crate::error::{ExtractionError, Result};
pub use crate::extract::{ExtractOptions, ExtractionReport, Extractor, Overwrite, extract, list};
pub use crate::io::{LocalFileReader, ReadAt};
pub use crate::zip::{ZipArchive, ZipEntry};
