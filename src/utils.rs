//! filesystem helpers shared by extraction and copying

use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::path::Path;

/// default permission bits for directories created by the pipeline (masked by umask)
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// default size of the buffer used when streaming file data
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Create `path` and every missing ancestor, root-most first.
///
/// An existing directory counts as success, including one that another thread
/// created between our check and our `mkdir`. Anything else in the way (a
/// regular file, a permission problem) is reported as [`Error::CreateDir`].
pub fn create_dir_all(path: &Path, mode: u32) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    builder.create(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// failure while streaming one reader into one writer
#[derive(Debug)]
pub enum ChunkError {
    Read(io::Error),
    Write(io::Error),
    Short { written: usize, expected: usize },
}

impl ChunkError {
    /// attach the destination path; read failures are mapped by the caller since
    /// their meaning depends on the source (archive stream vs. plain file)
    pub fn into_error(self, destination: &Path, on_read: impl FnOnce(io::Error) -> Error) -> Error {
        match self {
            ChunkError::Read(err) => on_read(err),
            ChunkError::Write(source) => Error::Write {
                path: destination.to_path_buf(),
                source,
            },
            ChunkError::Short { written, expected } => Error::ShortWrite {
                path: destination.to_path_buf(),
                written,
                expected,
            },
        }
    }
}

/// Stream `reader` into `writer` through a `chunk_size` buffer.
///
/// Every chunk must be accepted by a single `write` call; a partial write is a
/// failure rather than something to retry. Returns the number of bytes copied.
pub fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> std::result::Result<u64, ChunkError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(ChunkError::Read(err)),
        };

        let written = loop {
            match writer.write(&buffer[..read]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ChunkError::Write(err)),
            }
        };
        if written != read {
            return Err(ChunkError::Short {
                written,
                expected: read,
            });
        }
        total += read as u64;
    }

    writer.flush().map_err(ChunkError::Write)?;
    Ok(total)
}

/// format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
