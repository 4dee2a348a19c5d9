//! 7-Zip format support

use crate::{
    error::{Error, Result},
    formats::{ArchiveEntry, ArchiveReader, EntryKind, EntryVisitor},
};
use sevenz_rust::Password;
use std::{
    fs::File,
    path::{Path, PathBuf},
};

pub struct SevenZReader {
    archive_path: PathBuf,
    reader: sevenz_rust::SevenZReader<File>,
}

impl ArchiveReader for SevenZReader {
    fn open(archive_path: &Path) -> Result<Self> {
        let reader = sevenz_rust::SevenZReader::open(archive_path, Password::empty())
            .map_err(|e| Error::archive_open(archive_path, e))?;

        Ok(Self {
            archive_path: archive_path.to_path_buf(),
            reader,
        })
    }

    fn for_each_entry(mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        // the callback can only answer "continue?", so our own error is parked here
        let mut failure = None;

        self.reader
            .for_each_entries(|entry, data| {
                let kind = if entry.is_directory() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                let size = (!entry.is_directory()).then_some(entry.size);

                match visit(ArchiveEntry {
                    path: PathBuf::from(&entry.name),
                    kind,
                    size,
                    data,
                }) {
                    Ok(()) => Ok(true),
                    Err(err) => {
                        failure = Some(err);
                        Ok(false)
                    }
                }
            })
            .map_err(|e| Error::archive_read(&self.archive_path, e))?;

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
