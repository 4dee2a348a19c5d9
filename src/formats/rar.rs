//! RAR archive format support
//!
//! `unrar` only hands out whole entries, so each file entry is buffered in
//! memory before the chunked write. Memory use peaks at the largest entry.

use crate::error::{Error, Result};
use crate::formats::{ArchiveReader, EntryVisitor};
use std::path::Path;

#[cfg(feature = "rar")]
pub struct RarReader {
    archive_path: std::path::PathBuf,
    archive: unrar::OpenArchive<unrar::Process, unrar::CursorBeforeHeader>,
}

#[cfg(feature = "rar")]
impl ArchiveReader for RarReader {
    fn open(archive_path: &Path) -> Result<Self> {
        let archive = unrar::Archive::new(archive_path)
            .open_for_processing()
            .map_err(|e| Error::archive_open(archive_path, e))?;

        Ok(Self {
            archive_path: archive_path.to_path_buf(),
            archive,
        })
    }

    fn for_each_entry(self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        use crate::formats::{ArchiveEntry, EntryKind};

        let archive_path = self.archive_path;
        let mut archive = self.archive;

        while let Some(header) = archive
            .read_header()
            .map_err(|e| Error::archive_read(&archive_path, e))?
        {
            let entry = header.entry();
            let path = entry.filename.clone();

            archive = if entry.is_directory() {
                visit(ArchiveEntry {
                    path,
                    kind: EntryKind::Directory,
                    size: None,
                    data: &mut std::io::empty(),
                })?;
                header
                    .skip()
                    .map_err(|e| Error::archive_read(&archive_path, e))?
            } else {
                let size = entry.unpacked_size;
                // unrar hands out whole entries, not a stream
                let (data, rest) = header
                    .read()
                    .map_err(|e| Error::archive_read(&archive_path, e))?;
                visit(ArchiveEntry {
                    path,
                    kind: EntryKind::File,
                    size: Some(size),
                    data: &mut data.as_slice(),
                })?;
                rest
            };
        }

        Ok(())
    }
}

#[cfg(not(feature = "rar"))]
pub struct RarReader;

#[cfg(not(feature = "rar"))]
impl ArchiveReader for RarReader {
    fn open(archive_path: &Path) -> Result<Self> {
        Err(Error::archive_open(
            archive_path,
            "RAR support not enabled - compile with --features rar",
        ))
    }

    fn for_each_entry(self, _visit: &mut EntryVisitor<'_>) -> Result<()> {
        Ok(())
    }
}

#[cfg(all(test, not(feature = "rar")))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rar_without_feature_is_open_error() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("x.rar");
        std::fs::write(&archive, b"Rar!\x1a\x07\x00").unwrap();

        let err = RarReader::open(&archive).err().expect("rar is disabled");
        assert!(err.to_string().contains("--features rar"));
    }
}
