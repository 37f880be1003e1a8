//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;

pub enum Item<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Build an archive with the `zip` crate.
pub fn build_zip(items: &[Item<'_>], method: zip::CompressionMethod) -> Vec<u8> {
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .unix_permissions(0o644);
    build_zip_with(items, options)
}

/// Build an archive with the `zip` crate using explicit per-file options.
pub fn build_zip_with(items: &[Item<'_>], options: SimpleFileOptions) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

    for item in items {
        match item {
            Item::Dir(name) => writer.add_directory(*name, options).unwrap(),
            Item::File(name, data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
        }
    }

    writer.finish().unwrap().into_inner()
}

pub fn stored(items: &[Item<'_>]) -> Vec<u8> {
    build_zip(items, zip::CompressionMethod::Stored)
}

pub fn deflated(items: &[Item<'_>]) -> Vec<u8> {
    build_zip(items, zip::CompressionMethod::Deflated)
}

/// Hand-assembled archive for inputs the `zip` crate refuses to write:
/// arbitrary names, wrong checksums, unknown methods, encryption flags.
/// Entry data is stored as given whatever method the header claims.
#[derive(Default)]
pub struct RawZip {
    entries: Vec<RawEntry>,
}

struct RawEntry {
    name: Vec<u8>,
    data: Vec<u8>,
    crc: u32,
    method: u16,
    flags: u16,
}

const SATURATED: u32 = 0xFFFF_FFFF;

impl RawZip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, name: &str, data: &[u8]) -> Self {
        let crc = crc32(data);
        self.file_with_crc(name, data, crc)
    }

    pub fn file_with_crc(self, name: &str, data: &[u8], crc: u32) -> Self {
        self.entry(name, data, crc, 0, 0)
    }

    /// Entry whose header declares compression `method` and general
    /// purpose `flags`.
    pub fn entry(mut self, name: &str, data: &[u8], crc: u32, method: u16, flags: u16) -> Self {
        self.entries.push(RawEntry {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            crc,
            method,
            flags,
        });
        self
    }

    pub fn dir(self, name: &str) -> Self {
        self.file(name, b"")
    }

    pub fn finish(self, comment: &[u8]) -> Vec<u8> {
        self.build(comment, false)
    }

    /// Same entries, written the way ZIP64 writers do: saturated sizes and
    /// offsets in every header, the real values in 0x0001 extra fields, and
    /// a ZIP64 End of Central Directory record plus locator.
    pub fn finish_zip64(self, comment: &[u8]) -> Vec<u8> {
        self.build(comment, true)
    }

    fn build(self, comment: &[u8], zip64: bool) -> Vec<u8> {
        let mut out = Vec::new();
        let mut directory = Vec::new();
        let version: u16 = if zip64 { 45 } else { 20 };

        for entry in &self.entries {
            let offset = out.len() as u64;
            let size = entry.data.len() as u64;

            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&version.to_le_bytes());
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes()); // time + date
            out.extend_from_slice(&entry.crc.to_le_bytes());
            if zip64 {
                out.extend_from_slice(&SATURATED.to_le_bytes());
                out.extend_from_slice(&SATURATED.to_le_bytes());
            } else {
                out.extend_from_slice(&(size as u32).to_le_bytes());
                out.extend_from_slice(&(size as u32).to_le_bytes());
            }
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(if zip64 { 20u16 } else { 0 }).to_le_bytes());
            out.extend_from_slice(&entry.name);
            if zip64 {
                out.extend_from_slice(&0x0001u16.to_le_bytes());
                out.extend_from_slice(&16u16.to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
            }
            out.extend_from_slice(&entry.data);

            directory.extend_from_slice(b"PK\x01\x02");
            directory.extend_from_slice(&version.to_le_bytes()); // made by
            directory.extend_from_slice(&version.to_le_bytes()); // needed
            directory.extend_from_slice(&entry.flags.to_le_bytes());
            directory.extend_from_slice(&entry.method.to_le_bytes());
            directory.extend_from_slice(&0u32.to_le_bytes());
            directory.extend_from_slice(&entry.crc.to_le_bytes());
            if zip64 {
                directory.extend_from_slice(&SATURATED.to_le_bytes());
                directory.extend_from_slice(&SATURATED.to_le_bytes());
            } else {
                directory.extend_from_slice(&(size as u32).to_le_bytes());
                directory.extend_from_slice(&(size as u32).to_le_bytes());
            }
            directory.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            directory.extend_from_slice(&(if zip64 { 28u16 } else { 0 }).to_le_bytes()); // extra
            directory.extend_from_slice(&0u16.to_le_bytes()); // comment
            directory.extend_from_slice(&0u16.to_le_bytes()); // disk
            directory.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            directory.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            if zip64 {
                directory.extend_from_slice(&SATURATED.to_le_bytes());
            } else {
                directory.extend_from_slice(&(offset as u32).to_le_bytes());
            }
            directory.extend_from_slice(&entry.name);
            if zip64 {
                // Order is fixed: uncompressed, compressed, header offset
                directory.extend_from_slice(&0x0001u16.to_le_bytes());
                directory.extend_from_slice(&24u16.to_le_bytes());
                directory.extend_from_slice(&size.to_le_bytes());
                directory.extend_from_slice(&size.to_le_bytes());
                directory.extend_from_slice(&offset.to_le_bytes());
            }
        }

        let count = self.entries.len() as u64;
        let cd_offset = out.len() as u64;
        let cd_size = directory.len() as u64;
        out.extend_from_slice(&directory);

        if zip64 {
            let eocd64_offset = out.len() as u64;
            out.extend_from_slice(b"PK\x06\x06");
            out.extend_from_slice(&44u64.to_le_bytes()); // size of the rest
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&cd_size.to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());

            out.extend_from_slice(b"PK\x06\x07");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&eocd64_offset.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
        }

        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        if zip64 {
            out.extend_from_slice(&0xFFFFu16.to_le_bytes());
            out.extend_from_slice(&0xFFFFu16.to_le_bytes());
            out.extend_from_slice(&SATURATED.to_le_bytes());
            out.extend_from_slice(&SATURATED.to_le_bytes());
        } else {
            out.extend_from_slice(&(count as u16).to_le_bytes());
            out.extend_from_slice(&(count as u16).to_le_bytes());
            out.extend_from_slice(&(cd_size as u32).to_le_bytes());
            out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        }
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Descriptors of this process that point at `path` or anything below it.
///
/// Scoped to a path rather than counting all descriptors, so tests running
/// in parallel threads do not disturb each other.
#[cfg(target_os = "linux")]
pub fn open_handles_under(path: &Path) -> Vec<PathBuf> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(|fd| fd.ok())
        .filter_map(|fd| fs::read_link(fd.path()).ok())
        .filter(|link| link.starts_with(&target))
        .collect()
}

#[cfg(not(target_os = "linux"))]
pub fn open_handles_under(_path: &Path) -> Vec<PathBuf> {
    Vec::new()
}

/// Whether the current user can still write into a read-only directory
/// (true for root, which ignores permission bits).
#[cfg(unix)]
pub fn ignores_permissions(dir: &Path) -> bool {
    let marker = dir.join(".writable");
    let writable = fs::write(&marker, b"").is_ok();
    let _ = fs::remove_file(&marker);
    writable
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}
