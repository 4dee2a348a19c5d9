//! intake - archive ingestion service

use anyhow::Context;
use clap::Parser;
use intake::bridge::StopSignal;
use intake::cli::Cli;
use intake::config::Mode;
use intake::pipeline;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (mode, config) = cli.resolve().context("loading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    match mode {
        Mode::Standalone { input } => {
            pipeline::run_standalone(&input, &config)
                .with_context(|| format!("processing {}", input.display()))?;
        }
        Mode::Broker => {
            let stop = StopSignal::new();
            stop.stop_on_termination().context("installing signal handler")?;
            pipeline::run_broker(&config, stop).context("broker mode")?;
        }
    }

    Ok(())
}
