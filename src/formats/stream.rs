//! Single-stream compressors: gz, bz2, xz, zst.
//!
//! The decompressed stream is sniffed for a tar header. A tarball is iterated
//! entry by entry, anything else becomes one file entry named after the
//! archive without its compression suffix.

use crate::{
    error::{Error, Result},
    formats::{
        tarball::{self, TarReader},
        ArchiveEntry, EntryKind, EntryVisitor, Format, OpenArchive,
    },
};
use std::{
    fs::File,
    io::{self, BufReader, Cursor, Read},
    path::{Path, PathBuf},
};

/// suffix -> replacement used to name the single entry of a raw stream
const RAW_SUFFIXES: &[(&str, &str)] = &[
    (".tgz", ".tar"),
    (".tbz2", ".tar"),
    (".tbz", ".tar"),
    (".txz", ".tar"),
    (".tzst", ".tar"),
    (".gz", ""),
    (".bz2", ""),
    (".xz", ""),
    (".zstd", ""),
    (".zst", ""),
];

fn decoder(format: Format, file: File) -> io::Result<Box<dyn Read>> {
    let reader: Box<dyn Read> = match format {
        Format::Gzip => Box::new(flate2::read::MultiGzDecoder::new(BufReader::new(file))),
        Format::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(BufReader::new(file))),
        Format::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(BufReader::new(file))),
        Format::Zstd => Box::new(zstd::stream::read::Decoder::new(file)?),
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a stream compressor", other.name()),
            ))
        }
    };
    Ok(reader)
}

/// name of the decompressed file for a raw (non-tar) stream
pub fn raw_entry_name(archive_path: &Path) -> PathBuf {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let lower = name.to_lowercase();

    for (suffix, replacement) in RAW_SUFFIXES {
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            let stem = &name[..name.len() - suffix.len()];
            return PathBuf::from(format!("{stem}{replacement}"));
        }
    }
    PathBuf::from(name)
}

/// Open a compressed file, peeking one tar block to pick the reader.
pub fn open(archive_path: &Path, format: Format) -> Result<OpenArchive> {
    let file = File::open(archive_path).map_err(|e| Error::archive_open(archive_path, e))?;
    let mut decoder = decoder(format, file).map_err(|e| Error::archive_open(archive_path, e))?;

    // a bad stream header surfaces here, before anything is written
    let mut head = Vec::with_capacity(tarball::BLOCK_SIZE);
    decoder
        .by_ref()
        .take(tarball::BLOCK_SIZE as u64)
        .read_to_end(&mut head)
        .map_err(|e| Error::archive_open(archive_path, e))?;

    let is_tar = tarball::is_tar_header(&head);
    let reader: Box<dyn Read> = Box::new(Cursor::new(head).chain(decoder));

    if is_tar {
        Ok(OpenArchive::Tar(TarReader::from_reader(archive_path, reader)))
    } else {
        Ok(OpenArchive::Stream(StreamReader {
            name: raw_entry_name(archive_path),
            reader,
        }))
    }
}

/// a compressed stream holding one file
pub struct StreamReader {
    name: PathBuf,
    reader: Box<dyn Read>,
}

impl StreamReader {
    pub fn for_each_entry(self, visit: &mut EntryVisitor<'_>) -> Result<()> {
        let StreamReader { name, mut reader } = self;
        visit(ArchiveEntry {
            path: name,
            kind: EntryKind::File,
            size: None,
            data: &mut reader,
        })
    }
}
