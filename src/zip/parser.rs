//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Walk the Central Directory one header at a time
//! 4. For extraction, read each file's Local File Header to find its data
//!
//! Headers are read on demand, so listing a large archive never holds
//! the whole central directory in memory.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

use crate::error::{ExtractionError, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// ZIP64 extended information extra field.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Location of the Central Directory inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectory {
    pub offset: u64,
    pub size: u64,
    pub total_entries: u64,
}

impl CentralDirectory {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Low-level ZIP file parser.
///
/// Borrows the data source; whoever owns the source decides when it is
/// closed. Typically used through [`ZipArchive`](super::ZipArchive)
/// rather than directly.
pub struct ZipParser<'a, R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: &'a R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<'a, R: ReadAt + ?Sized> ZipParser<'a, R> {
    /// Create a new parser for the given reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - A borrowed reader implementing [`ReadAt`]
    pub fn new(reader: &'a R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8], what: &str) -> Result<()> {
        self.reader.read_exact_at(offset, buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ExtractionError::corrupt(format!("{what} is truncated"))
            } else {
                ExtractionError::Io {
                    entry: None,
                    path: None,
                    source: e,
                }
            }
        })
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// `CorruptArchive` if no valid EOCD can be found, meaning the input
    /// is not a ZIP archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let record = EndOfCentralDirectory::SIZE as u64;
        if self.size < record {
            return Err(ExtractionError::corrupt("not a ZIP file (too small)"));
        }

        // Common case first: no comment, record sits right at the end
        let offset = self.size - record;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.read_exact_at(offset, &mut buf, "End of Central Directory")?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        // The EOCD could be earlier if there's a ZIP comment
        let search_size = (MAX_COMMENT_SIZE + record).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.read_exact_at(search_start, &mut buf, "archive tail")?;

        // Search backwards for EOCD signature (PK\x05\x06)
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length field must account for the remaining bytes
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(ExtractionError::corrupt(
            "not a ZIP file (End of Central Directory not found)",
        ))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    ///
    /// # Arguments
    ///
    /// * `eocd_offset` - Offset of the regular EOCD; the ZIP64 locator sits
    ///   right before it
    ///
    /// # Errors
    ///
    /// `CorruptArchive` if the locator or the record it points at is
    /// missing or carries the wrong signature.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| ExtractionError::corrupt("missing ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.read_exact_at(locator_offset, &mut locator_buf, "ZIP64 locator")?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.read_exact_at(
            locator.eocd64_offset,
            &mut eocd64_buf,
            "ZIP64 End of Central Directory",
        )?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Locate the Central Directory, using ZIP64 records when needed.
    ///
    /// # Errors
    ///
    /// `CorruptArchive` if the directory lies outside the archive or is
    /// too small to hold the entry count it claims.
    pub fn central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let directory = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                total_entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                total_entries: eocd.total_entries as u64,
            }
        };

        let in_bounds = directory
            .offset
            .checked_add(directory.size)
            .is_some_and(|end| end <= self.size);
        if !in_bounds {
            return Err(ExtractionError::corrupt(
                "Central Directory lies outside the archive",
            ));
        }

        // Every header needs at least CDFH_MIN_SIZE bytes
        if directory.total_entries > directory.size / CDFH_MIN_SIZE as u64 {
            return Err(ExtractionError::corrupt(format!(
                "Central Directory too small for {} entries",
                directory.total_entries
            )));
        }

        Ok(directory)
    }

    /// Read one Central Directory File Header at `offset`.
    ///
    /// # Arguments
    ///
    /// * `offset` - Where the header starts
    /// * `directory` - Bounds the header must not overrun
    ///
    /// # Returns
    ///
    /// The entry (data offset still unresolved) and the offset of the next
    /// header.
    pub fn read_cdfh(&self, offset: u64, directory: &CentralDirectory) -> Result<(ZipEntry, u64)> {
        let mut fixed = vec![0u8; CDFH_MIN_SIZE];
        self.read_exact_at(offset, &mut fixed, "Central Directory File Header")?;

        if &fixed[0..4] != CDFH_SIGNATURE {
            return Err(ExtractionError::corrupt(
                "invalid Central Directory File Header",
            ));
        }

        // Variable-length tail: file name, extra field, comment
        let name_len = u16::from_le_bytes([fixed[28], fixed[29]]) as usize;
        let extra_len = u16::from_le_bytes([fixed[30], fixed[31]]) as usize;
        let comment_len = u16::from_le_bytes([fixed[32], fixed[33]]) as usize;
        let total = CDFH_MIN_SIZE + name_len + extra_len + comment_len;

        let next = offset + total as u64;
        if next > directory.end() {
            return Err(ExtractionError::corrupt(
                "Central Directory File Header overruns the directory",
            ));
        }

        let mut header = fixed;
        header.resize(total, 0);
        self.read_exact_at(
            offset + CDFH_MIN_SIZE as u64,
            &mut header[CDFH_MIN_SIZE..],
            "Central Directory File Header",
        )?;

        let entry = parse_cdfh(&mut Cursor::new(&header)).map_err(|e| {
            ExtractionError::corrupt(format!("invalid Central Directory File Header: {e}"))
        })?;
        Ok((entry, next))
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry,
    /// so the LFH itself has to be read.
    ///
    /// # Errors
    ///
    /// `CorruptArchive` if the LFH signature is wrong or the entry data
    /// would run past the end of the archive.
    pub fn get_data_offset(&self, entry: &ZipEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.read_exact_at(entry.lfh_offset, &mut lfh_buf, "Local File Header")?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(ExtractionError::corrupt("invalid Local File Header"));
        }

        let file_name_length = u16::from_le_bytes([lfh_buf[26], lfh_buf[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        let data_offset =
            entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length;

        let in_bounds = data_offset
            .checked_add(entry.compressed_size)
            .is_some_and(|end| end <= self.size);
        if !in_bounds {
            return Err(ExtractionError::corrupt(
                "entry data extends past the end of the archive",
            ));
        }

        Ok(data_offset)
    }
}

/// Parse a Central Directory File Header from a cursor positioned at its
/// signature. The caller has already checked that the whole header is
/// present in the buffer.
fn parse_cdfh(cursor: &mut Cursor<&Vec<u8>>) -> io::Result<ZipEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let _file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Lossy conversion keeps non-UTF8 names readable
    let file_name = String::from_utf8_lossy(&file_name_bytes).to_string();

    // Directory entries end with '/', some Windows tools write '\'
    let is_directory = file_name.ends_with('/') || file_name.ends_with('\\');

    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = (cursor.position() + field_size as u64).min(extra_field_end);

        if header_id == ZIP64_EXTRA_ID {
            // Fields are present only if the header field is saturated
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    Ok(ZipEntry {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        flags,
        lfh_offset,
        data_offset: 0,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}
