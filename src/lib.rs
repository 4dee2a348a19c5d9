//! intake - archive ingestion service
//!
//! File paths arrive either on the command line or from an AMQP queue. A file
//! counts as an archive when its name ends in .zip .rar .tar .gz .bz2 or .7z,
//! or when it starts with ZIP or RAR magic. Archives are extracted into the
//! output directory, everything else is copied there unchanged, so a `.xz` or
//! `.zst` file is copied unless its name also matches the list. Once a file
//! is classified as an archive its real format is detected from content, and
//! the tar, gzip, bzip2, xz, zstd, 7z, zip and rar readers all apply. Broker
//! mode feeds a bounded task queue drained by a fixed pool of worker threads.

pub mod bridge;
pub mod broker;
pub mod classify;
pub mod cli;
pub mod config;
pub mod copy;
pub mod error;
pub mod extract;
pub mod formats;
pub mod pipeline;
pub mod pool;
pub mod processor;
pub mod queue;
pub mod utils;

// re-export main types for convenience
pub use error::{Error, Result};
