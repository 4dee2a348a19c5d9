//! error types

use std::io;
use std::path::PathBuf;

/// Failures raised while processing a single job or running the broker bridge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file does not exist: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("failed to open archive {}: {message}", archive.display())]
    ArchiveOpen { archive: PathBuf, message: String },

    #[error("archive read error for {}: {message}", archive.display())]
    ArchiveRead { archive: PathBuf, message: String },

    #[error("failed to extract '{}' from {}: {source}", entry.display(), archive.display())]
    Entry {
        archive: PathBuf,
        entry: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("entry '{}' in {} escapes the output directory", entry.display(), archive.display())]
    UnsafeEntryPath { archive: PathBuf, entry: PathBuf },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to create output file {}: {source}", path.display())]
    CreateFile { path: PathBuf, source: io::Error },

    #[error("failed to open {} for copying: {source}", path.display())]
    CopyOpen { path: PathBuf, source: io::Error },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write data to {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("short write to {}: {written} of {expected} bytes", path.display())]
    ShortWrite {
        path: PathBuf,
        written: usize,
        expected: usize,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to install termination handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Broker(#[from] crate::broker::BrokerError),
}

impl Error {
    pub(crate) fn archive_open(archive: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ArchiveOpen {
            archive: archive.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn archive_read(archive: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::ArchiveRead {
            archive: archive.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
