//! archive decoding backends

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub mod rar;
pub mod sevenz;
pub mod stream;
pub mod tarball;
pub mod zip;

use self::{
    rar::RarReader, sevenz::SevenZReader, stream::StreamReader, tarball::TarReader,
    zip::ZipReader,
};

/// what an archive entry materializes as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// symbolic or hard link
    Link,
    /// devices, fifos and other special records
    Other,
}

/// One entry of an open archive. Only valid for the duration of the visitor call.
pub struct ArchiveEntry<'a> {
    /// relative pathname exactly as stored in the archive
    pub path: PathBuf,
    pub kind: EntryKind,
    /// uncompressed size when the container records it up front
    pub size: Option<u64>,
    pub data: &'a mut dyn Read,
}

pub type EntryVisitor<'v> = dyn FnMut(ArchiveEntry<'_>) -> Result<()> + 'v;

/// A decoder for one container format.
///
/// `open` parses whatever headers the format needs up front and is where a
/// corrupt or unsupported file is rejected. `for_each_entry` walks entries in
/// the order they are stored and stops at the first error, either from the
/// decoder or returned by the visitor. Dropping the reader closes it.
pub trait ArchiveReader: Sized {
    fn open(archive_path: &Path) -> Result<Self>;

    fn for_each_entry(self, visit: &mut EntryVisitor<'_>) -> Result<()>;
}

/// Supported container and compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Zip,
    Tar,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
    SevenZ,
    Rar,
}

impl Format {
    /// Detect format from file contents, falling back to the file name
    pub fn detect(path: &Path) -> Result<Self> {
        // Try magic number detection first (most reliable)
        if let Some(format) = Self::from_magic(path)? {
            return Ok(format);
        }

        // Fall back to extension-based detection
        if let Some(format) = Self::from_extension(path) {
            return Ok(format);
        }

        Err(Error::archive_open(path, "unsupported archive format"))
    }

    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let filename = path.file_name()?.to_str()?.to_lowercase();
        let ends_with_any = |suffixes: &[&str]| suffixes.iter().any(|s| filename.ends_with(s));

        if ends_with_any(&[".zip"]) {
            Some(Format::Zip)
        } else if ends_with_any(&[".tar"]) {
            Some(Format::Tar)
        } else if ends_with_any(&[".tgz", ".gz"]) {
            Some(Format::Gzip)
        } else if ends_with_any(&[".tbz", ".tbz2", ".bz2"]) {
            Some(Format::Bzip2)
        } else if ends_with_any(&[".txz", ".xz"]) {
            Some(Format::Xz)
        } else if ends_with_any(&[".tzst", ".zst", ".zstd"]) {
            Some(Format::Zstd)
        } else if ends_with_any(&[".7z"]) {
            Some(Format::SevenZ)
        } else if ends_with_any(&[".rar"]) {
            Some(Format::Rar)
        } else {
            None
        }
    }

    /// Detect format from leading bytes. Only an unopenable file is an error;
    /// unknown content yields `None`.
    fn from_magic(path: &Path) -> Result<Option<Self>> {
        let mut file = File::open(path).map_err(|e| Error::archive_open(path, e))?;
        let mut buffer = Vec::with_capacity(tarball::BLOCK_SIZE);
        file.by_ref()
            .take(tarball::BLOCK_SIZE as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| Error::archive_open(path, e))?;

        if buffer.len() >= 4 {
            match &buffer[..4] {
                [0x50, 0x4B, 0x03, 0x04] | [0x50, 0x4B, 0x05, 0x06] | [0x50, 0x4B, 0x07, 0x08] => {
                    return Ok(Some(Format::Zip));
                }
                [0x52, 0x61, 0x72, 0x21] => return Ok(Some(Format::Rar)), // Rar!
                [0x28, 0xB5, 0x2F, 0xFD] => return Ok(Some(Format::Zstd)),
                [0xFD, 0x37, 0x7A, 0x58] => return Ok(Some(Format::Xz)),
                [0x1F, 0x8B, _, _] => return Ok(Some(Format::Gzip)),
                [0x42, 0x5A, 0x68, _] => return Ok(Some(Format::Bzip2)), // BZh
                _ => {}
            }
        }

        if buffer.len() >= 6 && &buffer[..6] == b"7z\xBC\xAF\x27\x1C" {
            return Ok(Some(Format::SevenZ));
        }

        if tarball::is_tar_header(&buffer) {
            return Ok(Some(Format::Tar));
        }

        // Use tree_magic_mini as final fallback
        let format = match tree_magic_mini::from_filepath(path).unwrap_or("") {
            "application/zip" => Some(Format::Zip),
            "application/x-tar" => Some(Format::Tar),
            "application/gzip" | "application/x-gzip" => Some(Format::Gzip),
            "application/x-bzip2" | "application/x-bzip" => Some(Format::Bzip2),
            "application/x-xz" => Some(Format::Xz),
            "application/zstd" => Some(Format::Zstd),
            "application/x-7z-compressed" => Some(Format::SevenZ),
            "application/vnd.rar" | "application/x-rar" => Some(Format::Rar),
            _ => None,
        };
        Ok(format)
    }

    /// Get format name for display
    pub fn name(&self) -> &'static str {
        match self {
            Format::Zip => "ZIP",
            Format::Tar => "TAR",
            Format::Gzip => "Gzip",
            Format::Bzip2 => "Bzip2",
            Format::Xz => "XZ",
            Format::Zstd => "Zstandard",
            Format::SevenZ => "7-Zip",
            Format::Rar => "RAR",
        }
    }
}

/// An archive opened with whichever backend its format needs
pub enum OpenArchive {
    Zip(ZipReader),
    Tar(TarReader),
    Stream(StreamReader),
    SevenZ(SevenZReader),
    Rar(RarReader),
}

impl OpenArchive {
    pub fn open(archive_path: &Path) -> Result<Self> {
        let format = Format::detect(archive_path)?;
        tracing::debug!(archive = %archive_path.display(), format = format.name(), "detected format");

        Ok(match format {
            Format::Zip => Self::Zip(ZipReader::open(archive_path)?),
            Format::Tar => Self::Tar(TarReader::open(archive_path)?),
            Format::Gzip | Format::Bzip2 | Format::Xz | Format::Zstd => {
                stream::open(archive_path, format)?
            }
            Format::SevenZ => Self::SevenZ(SevenZReader::open(archive_path)?),
            Format::Rar => Self::Rar(RarReader::open(archive_path)?),
        })
    }

    pub fn for_each_entry(self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        match self {
            Self::Zip(reader) => reader.for_each_entry(visit),
            Self::Tar(reader) => reader.for_each_entry(visit),
            Self::Stream(reader) => reader.for_each_entry(visit),
            Self::SevenZ(reader) => reader.for_each_entry(visit),
            Self::Rar(reader) => reader.for_each_entry(visit),
        }
    }
}
