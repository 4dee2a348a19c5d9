//! Entry points wiring config, queue, workers and bridge together.

use crate::bridge::{MessageBridge, StopSignal};
use crate::broker::{BrokerClient, BrokerError, QueueSpec};
use crate::config::{Config, Mode};
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::processor::{Outcome, Processor};
use crate::queue::{Job, TaskQueue};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Run the configured mode to completion.
pub fn run(mode: Mode, config: &Config) -> Result<()> {
    config.validate()?;
    match mode {
        Mode::Standalone { input } => run_standalone(&input, config).map(|_| ()),
        Mode::Broker => run_broker(config, StopSignal::new()),
    }
}

/// Process exactly one file on the calling thread.
pub fn run_standalone(input: &Path, config: &Config) -> Result<Outcome> {
    let processor = Processor::new(&config.output_dir, &config.pipeline);
    let outcome = processor.process(&Job::new(input))?;

    match &outcome {
        Outcome::Extracted(stats) => info!(
            path = %input.display(),
            output = %config.output_dir.display(),
            files = stats.files,
            directories = stats.directories,
            "extraction completed"
        ),
        Outcome::Copied { destination, .. } => info!(
            path = %input.display(),
            destination = %destination.display(),
            "file copied"
        ),
    }
    Ok(outcome)
}

/// Consume from the configured AMQP broker until `stop` is raised or the
/// connection fails.
#[cfg(feature = "amqp")]
pub fn run_broker(config: &Config, stop: StopSignal) -> Result<()> {
    use crate::broker::amqp::AmqpBroker;

    let broker = config.broker.clone();
    serve(config, stop, move || AmqpBroker::connect(&broker))
}

#[cfg(not(feature = "amqp"))]
pub fn run_broker(_config: &Config, _stop: StopSignal) -> Result<()> {
    Err(Error::Broker(BrokerError::Connect(
        "broker support not enabled - compile with --features amqp".into(),
    )))
}

/// Broker mode against any [`BrokerClient`].
///
/// `connect` runs on the `ingest` thread, so the client itself never crosses
/// threads. Once the bridge returns the queue is closed and the workers finish
/// whatever was already accepted before this returns.
pub fn serve<B, F>(config: &Config, stop: StopSignal, connect: F) -> Result<()>
where
    B: BrokerClient,
    F: FnOnce() -> std::result::Result<B, BrokerError> + Send + 'static,
{
    let queue = Arc::new(TaskQueue::new(config.pipeline.queue_capacity));

    let mut processor = Processor::new(&config.output_dir, &config.pipeline);
    let mut bridge = MessageBridge::new(Arc::clone(&queue), config.broker.ack_policy, stop)
        .with_retry_delay(config.broker.poll_interval());
    if let Some(notify_queue) = &config.broker.notify_queue {
        let (tx, rx) = crossbeam_channel::unbounded();
        processor = processor.with_reports(tx);
        bridge = bridge.with_notifications(rx, notify_queue.clone());
    }

    let pool = WorkerPool::spawn(config.pipeline.workers, Arc::clone(&queue), Arc::new(processor))
        .map_err(Error::Spawn)?;
    info!(
        workers = pool.size(),
        capacity = queue.capacity(),
        output = %config.output_dir.display(),
        "worker pool started"
    );

    let spec = QueueSpec {
        name: config.broker.queue.clone(),
        durable: config.broker.durable,
        exclusive: config.broker.exclusive,
        auto_delete: config.broker.auto_delete,
    };
    let poll_interval = config.broker.poll_interval();

    let ingest = thread::Builder::new()
        .name("ingest".into())
        .spawn(move || -> std::result::Result<(), BrokerError> {
            let broker = connect()?;
            bridge.run(broker, &spec, poll_interval)
        });

    let result = match ingest {
        Ok(handle) => match handle.join() {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Broker(BrokerError::Closed("ingest thread panicked".into()))),
        },
        Err(err) => Err(Error::Spawn(err)),
    };

    if let Err(err) = &result {
        error!("ingestion stopped: {err}");
    }
    info!(pending = queue.len(), "draining task queue");
    pool.shutdown();
    info!("all workers stopped");

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_standalone_copies_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("plain.txt");
        fs::write(&input, "text").unwrap();
        let config = Config {
            output_dir: temp_dir.path().join("extracted"),
            ..Config::default()
        };

        let outcome = run_standalone(&input, &config).unwrap();

        assert!(matches!(outcome, Outcome::Copied { bytes: 4, .. }));
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("extracted/plain.txt")).unwrap(),
            "text"
        );
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let mut config = Config::default();
        config.pipeline.workers = 0;
        let err = run(
            Mode::Standalone {
                input: "whatever".into(),
            },
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_connect_failure_still_stops_workers() {
        struct Never;
        impl BrokerClient for Never {
            fn consume(
                &mut self,
                _: &QueueSpec,
                _: std::time::Duration,
                _: &mut dyn crate::broker::DeliveryHandler,
            ) -> std::result::Result<(), BrokerError> {
                unreachable!()
            }
            fn publish(&mut self, _: &crate::broker::Outbound) -> std::result::Result<(), BrokerError> {
                unreachable!()
            }
            fn close(self) -> std::result::Result<(), BrokerError> {
                Ok(())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            output_dir: temp_dir.path().join("extracted"),
            ..Config::default()
        };

        let err = serve(&config, StopSignal::new(), || {
            Err::<Never, _>(BrokerError::Connect("connection refused".into()))
        })
        .unwrap_err();

        assert!(matches!(err, Error::Broker(BrokerError::Connect(_))));
        assert!(!temp_dir.path().join("extracted").exists());
    }
}
