//! ZIP format support

use crate::{
    error::{Error, Result},
    formats::{ArchiveEntry, ArchiveReader, EntryKind, EntryVisitor},
};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use zip::ZipArchive;

pub struct ZipReader {
    archive_path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader for ZipReader {
    fn open(archive_path: &Path) -> Result<Self> {
        let file = File::open(archive_path).map_err(|e| Error::archive_open(archive_path, e))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| Error::archive_open(archive_path, e))?;

        Ok(Self {
            archive_path: archive_path.to_path_buf(),
            archive,
        })
    }

    fn for_each_entry(mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        for i in 0..self.archive.len() {
            let mut file = self
                .archive
                .by_index(i)
                .map_err(|e| Error::archive_read(&self.archive_path, e))?;

            // stored name, not mangled: path policy is the extractor's job
            let path = PathBuf::from(file.name());
            let kind = if file.is_dir() {
                EntryKind::Directory
            } else if file.is_symlink() {
                EntryKind::Link
            } else {
                EntryKind::File
            };
            let size = Some(file.size());

            visit(ArchiveEntry {
                path,
                kind,
                size,
                data: &mut file,
            })?;
        }

        Ok(())
    }
}
