//! command line interface

use crate::bridge::AckPolicy;
use crate::config::{Config, Mode};
use crate::error::Result;
use crate::extract::EntryPathPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "intake",
    version,
    about = "intake: archive ingestion service",
    long_about = "Extract archives (zip, tar, gz, bz2, xz, zst, 7z, rar) into an output directory and copy every other file there. \
                  Process a single file, or consume file paths from an AMQP queue with a pool of workers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// output root for extracted and copied files [default: extracted]
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// write buffer size in bytes
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// handling of archive entries containing `..`
    #[arg(long, global = true, value_enum)]
    pub entry_paths: Option<EntryPathPolicy>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// process one file: extract it if it is an archive, copy it otherwise
    #[command(alias = "p")]
    Process {
        /// file to process
        input: PathBuf,
    },

    /// consume file paths from the broker queue until the connection ends
    #[command(alias = "c")]
    Consume {
        /// broker host
        #[arg(long)]
        host: Option<String>,

        /// broker port
        #[arg(long)]
        port: Option<u16>,

        /// broker user name
        #[arg(short, long)]
        username: Option<String>,

        /// broker password
        #[arg(long, env = "INTAKE_BROKER_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// broker virtual host
        #[arg(long)]
        vhost: Option<String>,

        /// queue carrying file paths
        #[arg(short, long)]
        queue: Option<String>,

        /// number of worker threads
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// jobs held before new messages are rejected
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// when deliveries are acknowledged
        #[arg(long, value_enum)]
        ack_policy: Option<AckPolicy>,

        /// queue receiving a JSON report per processed file
        #[arg(long)]
        notify_queue: Option<String>,
    },
}

impl Cli {
    /// Load the configuration file (if any), apply flags on top and pick the mode.
    pub fn resolve(self) -> Result<(Mode, Config)> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.pipeline.chunk_size = chunk_size;
        }
        if let Some(entry_paths) = self.entry_paths {
            config.pipeline.entry_paths = entry_paths;
        }

        let mode = match self.command {
            Commands::Process { input } => Mode::Standalone { input },
            Commands::Consume {
                host,
                port,
                username,
                password,
                vhost,
                queue,
                workers,
                queue_capacity,
                ack_policy,
                notify_queue,
            } => {
                let broker = &mut config.broker;
                if let Some(host) = host {
                    broker.host = host;
                }
                if let Some(port) = port {
                    broker.port = port;
                }
                if let Some(username) = username {
                    broker.username = username;
                }
                if let Some(password) = password {
                    broker.password = password;
                }
                if let Some(vhost) = vhost {
                    broker.vhost = vhost;
                }
                if let Some(queue) = queue {
                    broker.queue = queue;
                }
                if let Some(ack_policy) = ack_policy {
                    broker.ack_policy = ack_policy;
                }
                if notify_queue.is_some() {
                    broker.notify_queue = notify_queue;
                }
                if let Some(workers) = workers {
                    config.pipeline.workers = workers;
                }
                if let Some(queue_capacity) = queue_capacity {
                    config.pipeline.queue_capacity = queue_capacity;
                }
                Mode::Broker
            }
        };

        config.validate()?;
        Ok((mode, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("intake").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_process_uses_defaults() {
        let (mode, config) = parse(&["process", "/data/in.zip"]).resolve().unwrap();
        assert_eq!(
            mode,
            Mode::Standalone {
                input: "/data/in.zip".into()
            }
        );
        assert_eq!(config.output_dir, PathBuf::from("extracted"));
        assert_eq!(config.pipeline.entry_paths, EntryPathPolicy::Reject);
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("intake.toml");
        fs::write(
            &file,
            "output_dir = \"/from/file\"\n[pipeline]\nworkers = 3\n[broker]\nhost = \"file-host\"\n",
        )
        .unwrap();
        let config_arg = file.to_str().unwrap();

        let (mode, config) = parse(&[
            "-c",
            config_arg,
            "consume",
            "--host",
            "flag-host",
            "--ack-policy",
            "after-enqueue",
            "-j",
            "4",
        ])
        .resolve()
        .unwrap();

        assert_eq!(mode, Mode::Broker);
        assert_eq!(config.output_dir, PathBuf::from("/from/file"));
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.broker.host, "flag-host");
        assert_eq!(config.broker.ack_policy, AckPolicy::AfterEnqueue);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let (_, config) = parse(&["process", "x", "-o", "out", "--entry-paths", "allow"])
            .resolve()
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.pipeline.entry_paths, EntryPathPolicy::Allow);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(parse(&["consume", "--queue-capacity", "0"]).resolve().is_err());
    }
}
