//! per-job routing: missing check, classification, extraction or copy

use crate::classify;
use crate::config::PipelineConfig;
use crate::copy;
use crate::error::{Error, Result};
use crate::extract::{self, ExtractOptions, ExtractStats};
use crate::queue::Job;
use crate::utils;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What happened to a job that finished successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Extracted(ExtractStats),
    Copied { destination: PathBuf, bytes: u64 },
}

/// Completion record sent to the notifier when notifications are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub source: String,
    pub status: ReportStatus,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Failed,
}

impl JobReport {
    fn new(job: &Job, result: &Result<Outcome>) -> Self {
        let (status, content) = match result {
            Ok(Outcome::Extracted(_)) => (ReportStatus::Ok, "Files extracted".to_string()),
            Ok(Outcome::Copied { .. }) => (ReportStatus::Ok, "File copied".to_string()),
            Err(err) => (ReportStatus::Failed, err.to_string()),
        };
        Self {
            source: job.path().display().to_string(),
            status,
            content,
        }
    }
}

/// Turns jobs into output. Shared by the standalone run and every worker.
#[derive(Debug)]
pub struct Processor {
    output_dir: PathBuf,
    options: ExtractOptions,
    reports: Option<Sender<JobReport>>,
}

impl Processor {
    pub fn new(output_dir: impl Into<PathBuf>, pipeline: &PipelineConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            options: ExtractOptions {
                chunk_size: pipeline.chunk_size,
                dir_mode: pipeline.dir_mode,
                entry_paths: pipeline.entry_paths,
            },
            reports: None,
        }
    }

    /// send a [`JobReport`] for every handled job
    pub fn with_reports(mut self, reports: Sender<JobReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process one job and return how it ended. Nothing is touched on disk when
    /// the input is missing.
    pub fn process(&self, job: &Job) -> Result<Outcome> {
        let input = job.path();
        info!(path = %input.display(), "processing file");

        if !input.exists() {
            return Err(Error::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        if classify::is_archive(input) {
            info!(path = %input.display(), "file is an archive, starting extraction");
            let stats = extract::extract(input, &self.output_dir, &self.options)?;
            return Ok(Outcome::Extracted(stats));
        }

        warn!(path = %input.display(), "file is not an archive, copying");
        let file_name = input.file_name().ok_or_else(|| Error::CopyOpen {
            path: input.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })?;
        utils::create_dir_all(&self.output_dir, self.options.dir_mode)?;
        let destination = self.output_dir.join(file_name);
        let bytes = copy::copy_file(input, &destination, self.options.chunk_size)?;

        Ok(Outcome::Copied { destination, bytes })
    }

    /// Process, log, report and discard `job`. Returns whether it succeeded.
    pub fn handle(&self, job: Job) -> bool {
        let result = self.process(&job);
        let path = job.path().display();

        match &result {
            Ok(Outcome::Extracted(stats)) => info!(
                path = %path,
                output = %self.output_dir.display(),
                entries = stats.entries(),
                bytes = %utils::format_bytes(stats.bytes),
                "extraction completed"
            ),
            Ok(Outcome::Copied { destination, bytes }) => info!(
                path = %path,
                destination = %destination.display(),
                bytes = %utils::format_bytes(*bytes),
                "copied non-archive file"
            ),
            Err(err) => error!(path = %path, "{err}"),
        }

        if let Some(reports) = &self.reports {
            if let Err(undelivered) = reports.send(JobReport::new(&job, &result)) {
                let report = undelivered.into_inner();
                warn!(
                    path = %path,
                    status = ?report.status,
                    content = %report.content,
                    "report not delivered, notifier is gone"
                );
            }
        }

        result.is_ok()
    }
}
