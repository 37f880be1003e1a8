use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor};

use crate::error::{ExtractionError, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

fn malformed(record: &'static str) -> impl Fn(io::Error) -> ExtractionError {
    move |e| ExtractionError::corrupt(format!("invalid {record}: {e}"))
}

fn check_signature(data: &[u8], signature: &[u8], min_size: usize, record: &'static str) -> Result<()> {
    if data.len() < min_size || &data[0..4] != signature {
        return Err(ExtractionError::corrupt(format!("invalid {record}")));
    }
    Ok(())
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const RECORD: &str = "End of Central Directory";
        check_signature(data, Self::SIGNATURE, Self::SIZE, RECORD)?;

        let mut cursor = Cursor::new(&data[4..]);
        let parse = |c: &mut Cursor<&[u8]>| -> io::Result<Self> {
            Ok(Self {
                disk_number: c.read_u16::<LittleEndian>()?,
                disk_with_cd: c.read_u16::<LittleEndian>()?,
                disk_entries: c.read_u16::<LittleEndian>()?,
                total_entries: c.read_u16::<LittleEndian>()?,
                cd_size: c.read_u32::<LittleEndian>()?,
                cd_offset: c.read_u32::<LittleEndian>()?,
                comment_len: c.read_u16::<LittleEndian>()?,
            })
        };
        parse(&mut cursor).map_err(malformed(RECORD))
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const RECORD: &str = "ZIP64 locator";
        check_signature(data, Self::SIGNATURE, Self::SIZE, RECORD)?;

        let mut cursor = Cursor::new(&data[4..]);
        let parse = |c: &mut Cursor<&[u8]>| -> io::Result<Self> {
            Ok(Self {
                disk_with_eocd64: c.read_u32::<LittleEndian>()?,
                eocd64_offset: c.read_u64::<LittleEndian>()?,
                total_disks: c.read_u32::<LittleEndian>()?,
            })
        };
        parse(&mut cursor).map_err(malformed(RECORD))
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        const RECORD: &str = "ZIP64 End of Central Directory";
        check_signature(data, Self::SIGNATURE, Self::MIN_SIZE, RECORD)?;

        let mut cursor = Cursor::new(&data[4..]);
        let parse = |c: &mut Cursor<&[u8]>| -> io::Result<Self> {
            Ok(Self {
                eocd64_size: c.read_u64::<LittleEndian>()?,
                version_made_by: c.read_u16::<LittleEndian>()?,
                version_needed: c.read_u16::<LittleEndian>()?,
                disk_number: c.read_u32::<LittleEndian>()?,
                disk_with_cd: c.read_u32::<LittleEndian>()?,
                disk_entries: c.read_u64::<LittleEndian>()?,
                total_entries: c.read_u64::<LittleEndian>()?,
                cd_size: c.read_u64::<LittleEndian>()?,
                cd_offset: c.read_u64::<LittleEndian>()?,
            })
        };
        parse(&mut cursor).map_err(malformed(RECORD))
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag bit marking an encrypted entry
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Parsed ZIP file entry information
///
/// Produced by [`ZipArchive::entries`](super::ZipArchive::entries); it only
/// describes the entry, reading its data goes back through the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub flags: u16,
    pub lfh_offset: u64,
    /// Offset of the first byte of entry data, past the local header
    pub data_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ZipEntry {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
