//! extraction engine: archive entries -> output directory tree

use crate::error::{Error, Result};
use crate::formats::{ArchiveEntry, EntryKind, OpenArchive};
use crate::utils::{self, DEFAULT_CHUNK_SIZE, DEFAULT_DIR_MODE};
use serde::Deserialize;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// What to do with entries whose stored path climbs out of the output root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EntryPathPolicy {
    /// abort the job on any `..` component
    #[default]
    Reject,
    /// join the stored path verbatim, `..` included
    Allow,
}

/// extraction options
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub chunk_size: usize,
    pub dir_mode: u32,
    pub entry_paths: EntryPathPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            dir_mode: DEFAULT_DIR_MODE,
            entry_paths: EntryPathPolicy::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: u64,
    pub directories: u64,
    /// links and special files, which are never materialized
    pub skipped: u64,
    pub bytes: u64,
}

impl ExtractStats {
    pub fn entries(&self) -> u64 {
        self.files + self.directories + self.skipped
    }
}

/// Where `entry` lands under `root`, or `None` when the policy forbids it.
///
/// Root and prefix components are dropped so an absolute entry name nests under
/// `root` the same way `root + "/" + name` would.
pub fn destination_for(root: &Path, entry: &Path, policy: EntryPathPolicy) -> Option<PathBuf> {
    let mut target = root.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::ParentDir => match policy {
                EntryPathPolicy::Reject => return None,
                EntryPathPolicy::Allow => target.push(".."),
            },
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(target)
}

/// Extract every entry of `archive_path` under `output_root`.
///
/// The archive is opened before the output root is created, so an unreadable
/// archive leaves no trace. After that, entries are written one at a time and
/// the first failure aborts: whatever was already written stays on disk.
pub fn extract(archive_path: &Path, output_root: &Path, options: &ExtractOptions) -> Result<ExtractStats> {
    let archive = OpenArchive::open(archive_path)?;
    utils::create_dir_all(output_root, options.dir_mode)?;

    let mut stats = ExtractStats::default();
    archive.for_each_entry(&mut |entry| {
        let entry_path = entry.path.clone();
        extract_entry(archive_path, output_root, options, entry, &mut stats).map_err(|err| {
            match err {
                Error::UnsafeEntryPath { .. } => err,
                other => Error::Entry {
                    archive: archive_path.to_path_buf(),
                    entry: entry_path,
                    source: Box::new(other),
                },
            }
        })
    })?;

    Ok(stats)
}

fn extract_entry(
    archive_path: &Path,
    output_root: &Path,
    options: &ExtractOptions,
    entry: ArchiveEntry<'_>,
    stats: &mut ExtractStats,
) -> Result<()> {
    let target = destination_for(output_root, &entry.path, options.entry_paths).ok_or_else(|| {
        Error::UnsafeEntryPath {
            archive: archive_path.to_path_buf(),
            entry: entry.path.clone(),
        }
    })?;

    if matches!(entry.kind, EntryKind::Link | EntryKind::Other) {
        warn!(
            archive = %archive_path.display(),
            entry = %entry.path.display(),
            "skipping link or special file"
        );
        stats.skipped += 1;
        return Ok(());
    }

    debug!(archive = %archive_path.display(), entry = %entry.path.display(), "extracting");

    if let Some(parent) = target.parent() {
        utils::create_dir_all(parent, options.dir_mode)?;
    }

    if entry.kind == EntryKind::Directory {
        utils::create_dir_all(&target, options.dir_mode)?;
        stats.directories += 1;
        return Ok(());
    }

    let mut output = File::create(&target).map_err(|source| Error::CreateFile {
        path: target.clone(),
        source,
    })?;
    let written = utils::copy_chunked(entry.data, &mut output, options.chunk_size)
        .map_err(|err| err.into_error(&target, |e| Error::archive_read(archive_path, e)))?;

    if let Some(expected) = entry.size {
        if expected != written {
            debug!(entry = %entry.path.display(), expected, written, "entry size differs from header");
        }
    }

    stats.files += 1;
    stats.bytes += written;
    Ok(())
}
