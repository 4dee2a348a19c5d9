//! Tar archives, plain or behind a compression stream.

use crate::{
    error::{Error, Result},
    formats::{ArchiveEntry, ArchiveReader, EntryKind, EntryVisitor},
};
use std::{
    fs::File,
    io::{BufReader, Cursor, Read},
    path::{Path, PathBuf},
};
use tar::{Archive, EntryType};

pub const BLOCK_SIZE: usize = 512;

const USTAR_MAGIC_OFFSET: usize = 257;

/// whether `block` starts with a POSIX or GNU tar header
pub fn is_tar_header(block: &[u8]) -> bool {
    block.len() >= USTAR_MAGIC_OFFSET + 5
        && &block[USTAR_MAGIC_OFFSET..USTAR_MAGIC_OFFSET + 5] == b"ustar"
}

const CHECKSUM_FIELD: std::ops::Range<usize> = 148..156;

/// Validate the first header block of a tar stream.
///
/// An empty stream or a zero block is a valid empty archive. Anything else
/// must be a full block whose stored checksum matches its contents.
pub fn check_first_header(block: &[u8]) -> std::result::Result<(), String> {
    if block.iter().all(|&b| b == 0) {
        return Ok(());
    }
    if block.len() < BLOCK_SIZE {
        return Err(format!("truncated tar header ({} bytes)", block.len()));
    }

    let header = tar::Header::from_byte_slice(&block[..BLOCK_SIZE]);
    let stored = header
        .cksum()
        .map_err(|e| format!("invalid tar header: {e}"))?;
    let computed: u32 = block[..BLOCK_SIZE]
        .iter()
        .enumerate()
        .map(|(i, &b)| if CHECKSUM_FIELD.contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();

    if stored != computed {
        return Err(format!(
            "invalid tar header: checksum {stored:o} does not match {computed:o}"
        ));
    }
    Ok(())
}

fn entry_kind(entry_type: EntryType) -> EntryKind {
    if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_file() || entry_type.is_contiguous() {
        EntryKind::File
    } else if entry_type.is_symlink() || entry_type.is_hard_link() {
        EntryKind::Link
    } else {
        EntryKind::Other
    }
}

pub struct TarReader {
    archive_path: PathBuf,
    archive: Archive<Box<dyn Read>>,
}

impl TarReader {
    /// wrap an already-decompressed tar stream
    pub fn from_reader(archive_path: &Path, reader: Box<dyn Read>) -> Self {
        Self {
            archive_path: archive_path.to_path_buf(),
            archive: Archive::new(reader),
        }
    }
}

impl ArchiveReader for TarReader {
    fn open(archive_path: &Path) -> Result<Self> {
        let file = File::open(archive_path).map_err(|e| Error::archive_open(archive_path, e))?;
        let mut reader = BufReader::new(file);

        let mut head = Vec::with_capacity(BLOCK_SIZE);
        reader
            .by_ref()
            .take(BLOCK_SIZE as u64)
            .read_to_end(&mut head)
            .map_err(|e| Error::archive_open(archive_path, e))?;
        check_first_header(&head).map_err(|e| Error::archive_open(archive_path, e))?;

        let reader: Box<dyn Read> = Box::new(Cursor::new(head).chain(reader));
        Ok(Self::from_reader(archive_path, reader))
    }

    fn for_each_entry(mut self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let archive_path = self.archive_path;
        let entries = self
            .archive
            .entries()
            .map_err(|e| Error::archive_read(&archive_path, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| Error::archive_read(&archive_path, e))?;
            let path = entry
                .path()
                .map_err(|e| Error::archive_read(&archive_path, e))?
                .into_owned();
            let kind = entry_kind(entry.header().entry_type());
            let size = Some(entry.size());

            visit(ArchiveEntry {
                path,
                kind,
                size,
                data: &mut entry,
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tar::{Builder, Header};
    use tempfile::TempDir;

    fn build_tar(path: &Path) {
        let mut builder = Builder::new(File::create(path).unwrap());

        let mut dir = Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_cksum();
        builder.append_data(&mut dir, "docs/", std::io::empty()).unwrap();

        let body = b"tar body";
        let mut file = Header::new_gnu();
        file.set_size(body.len() as u64);
        file.set_mode(0o644);
        file.set_cksum();
        builder.append_data(&mut file, "docs/readme.txt", &body[..]).unwrap();

        let mut link = Header::new_gnu();
        link.set_entry_type(EntryType::Symlink);
        link.set_size(0);
        link.set_cksum();
        builder.append_link(&mut link, "docs/latest", "readme.txt").unwrap();

        builder.finish().unwrap();
    }

    #[test]
    fn test_entries_in_stored_order() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("sample.tar");
        build_tar(&archive);

        let mut seen = Vec::new();
        TarReader::open(&archive)
            .unwrap()
            .for_each_entry(&mut |entry| {
                let mut content = String::new();
                entry.data.read_to_string(&mut content).unwrap();
                seen.push((entry.path, entry.kind, content));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (PathBuf::from("docs/"), EntryKind::Directory, String::new()),
                (PathBuf::from("docs/readme.txt"), EntryKind::File, "tar body".to_string()),
                (PathBuf::from("docs/latest"), EntryKind::Link, String::new()),
            ]
        );
    }

    #[test]
    fn test_visitor_error_stops_iteration() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("sample.tar");
        build_tar(&archive);

        let mut calls = 0;
        let result = TarReader::open(&archive).unwrap().for_each_entry(&mut |_| {
            calls += 1;
            Err(Error::Config("stop".into()))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_garbage_header_fails_on_open() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("garbage.tar");
        std::fs::write(&archive, vec![b'x'; 2 * BLOCK_SIZE]).unwrap();

        let err = TarReader::open(&archive).err().expect("garbage must not open");
        assert!(matches!(err, Error::ArchiveOpen { .. }));
    }

    #[test]
    fn test_check_first_header() {
        let mut header = Header::new_ustar();
        header.set_path("a.txt").unwrap();
        header.set_size(3);
        header.set_cksum();
        assert!(check_first_header(header.as_bytes()).is_ok());

        let mut tampered = header.as_bytes().to_vec();
        tampered[0] ^= 0xFF;
        assert!(check_first_header(&tampered).is_err());

        assert!(check_first_header(&[]).is_ok());
        assert!(check_first_header(&[0u8; BLOCK_SIZE]).is_ok());
        assert!(check_first_header(&header.as_bytes()[..100]).is_err());
    }

    #[test]
    fn test_is_tar_header() {
        let mut block = vec![0u8; BLOCK_SIZE];
        assert!(!is_tar_header(&block));
        block[257..262].copy_from_slice(b"ustar");
        assert!(is_tar_header(&block));
        assert!(!is_tar_header(&block[..200]));
    }
}
