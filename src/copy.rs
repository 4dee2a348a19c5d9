//! copy fallback for files that are not archives

use crate::error::{Error, Result};
use crate::utils;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Stream `source` into `destination`, truncating any existing file.
///
/// Uses the same chunked, all-or-nothing writes as extraction. Returns the
/// number of bytes copied. When both paths name the same file nothing is
/// written and the file's length is returned.
pub fn copy_file(source: &Path, destination: &Path, chunk_size: usize) -> Result<u64> {
    let mut input = File::open(source).map_err(|err| Error::CopyOpen {
        path: source.to_path_buf(),
        source: err,
    })?;

    if is_same_file(source, destination) {
        debug!(path = %source.display(), "file already in place, nothing to copy");
        let metadata = input.metadata().map_err(|err| Error::Read {
            path: source.to_path_buf(),
            source: err,
        })?;
        return Ok(metadata.len());
    }

    let mut output = File::create(destination).map_err(|err| Error::CopyOpen {
        path: destination.to_path_buf(),
        source: err,
    })?;

    utils::copy_chunked(&mut input, &mut output, chunk_size).map_err(|err| {
        err.into_error(destination, |e| Error::Read {
            path: source.to_path_buf(),
            source: e,
        })
    })
}

// a missing destination cannot be the source
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    }
}
