//! message ingestion bridge: broker deliveries -> task queue

use crate::broker::{BrokerClient, BrokerError, DeliveryHandler, Disposition, Outbound, QueueSpec};
use crate::processor::JobReport;
use crate::queue::{EnqueueError, Job, TaskQueue};
use crossbeam_channel::Receiver;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// When a delivery is acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AckPolicy {
    /// ack after every enqueue attempt; a rejected job is lost (at-most-once)
    #[default]
    Always,
    /// ack only once the job is queued, otherwise requeue it with the broker
    AfterEnqueue,
}

/// Shared flag asking long-running loops to wind down.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise this signal on SIGINT or SIGTERM.
    ///
    /// Installs the process-wide handler, so it succeeds at most once per process.
    pub fn stop_on_termination(&self) -> crate::Result<()> {
        let stop = self.clone();
        ctrlc::set_handler(move || {
            info!("termination requested, finishing accepted jobs");
            stop.stop();
        })?;
        Ok(())
    }
}

/// Turns delivered file paths into jobs on the shared queue.
pub struct MessageBridge {
    queue: Arc<TaskQueue>,
    policy: AckPolicy,
    stop: StopSignal,
    retry_delay: Duration,
    notifications: Option<(Receiver<JobReport>, String)>,
}

impl MessageBridge {
    pub fn new(queue: Arc<TaskQueue>, policy: AckPolicy, stop: StopSignal) -> Self {
        Self {
            queue,
            policy,
            stop,
            retry_delay: Duration::ZERO,
            notifications: None,
        }
    }

    /// pause before handing a rejected delivery back, so a full queue is not
    /// hammered by immediate redeliveries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// publish every report from `reports` to `routing_key`
    pub fn with_notifications(mut self, reports: Receiver<JobReport>, routing_key: impl Into<String>) -> Self {
        self.notifications = Some((reports, routing_key.into()));
        self
    }

    /// Consume `queue` on `broker` until stopped or the broker fails, then
    /// close the broker connection. No reconnect is attempted.
    ///
    /// After a clean stop with notifications enabled, the task queue is closed
    /// and the reports of every job still in flight are published before the
    /// connection goes away.
    pub fn run<B: BrokerClient>(
        mut self,
        mut broker: B,
        queue: &QueueSpec,
        poll_interval: Duration,
    ) -> Result<(), BrokerError> {
        let mut result = broker.consume(queue, poll_interval, &mut self);
        match &result {
            Ok(()) => {
                info!(queue = %queue.name, "consumer stopped");
                result = self.flush_reports(&mut broker);
            }
            Err(err) => error!(queue = %queue.name, "{err}"),
        }
        if let Err(err) = broker.close() {
            warn!("failed to close broker connection: {err}");
        }
        result
    }

    /// Wait for the workers to finish the accepted jobs and publish their reports.
    fn flush_reports<B: BrokerClient>(&mut self, broker: &mut B) -> Result<(), BrokerError> {
        let Some((reports, routing_key)) = self.notifications.take() else {
            return Ok(());
        };
        self.queue.close();

        // ends once every worker has dropped its sender
        for report in reports.iter() {
            if let Some(message) = encode_report(&report, &routing_key) {
                broker.publish(&message)?;
            }
        }
        Ok(())
    }

    fn reject(&self, err: EnqueueError) -> Disposition {
        match self.policy {
            AckPolicy::Always => {
                error!("{err}; message dropped");
                Disposition::Ack
            }
            AckPolicy::AfterEnqueue => {
                warn!("{err}; returning message to broker");
                if !self.retry_delay.is_zero() {
                    std::thread::sleep(self.retry_delay);
                }
                Disposition::Requeue
            }
        }
    }
}

impl DeliveryHandler for MessageBridge {
    fn handle(&mut self, body: &[u8]) -> Disposition {
        let path = match std::str::from_utf8(body) {
            Ok(text) => text.trim(),
            Err(err) => {
                warn!("discarding message with non UTF-8 body: {err}");
                return Disposition::Ack;
            }
        };
        if path.is_empty() {
            warn!("discarding message with empty body");
            return Disposition::Ack;
        }

        match self.queue.enqueue(Job::new(path)) {
            Ok(()) => {
                debug!(path, queued = self.queue.len(), "job enqueued");
                Disposition::Ack
            }
            Err(err) => self.reject(err),
        }
    }

    fn drain_outbound(&mut self) -> Vec<Outbound> {
        let Some((reports, routing_key)) = &self.notifications else {
            return Vec::new();
        };
        reports
            .try_iter()
            .filter_map(|report| encode_report(&report, routing_key))
            .collect()
    }

    fn should_stop(&self) -> bool {
        self.stop.is_stopped()
    }
}

fn encode_report(report: &JobReport, routing_key: &str) -> Option<Outbound> {
    match serde_json::to_vec(report) {
        Ok(body) => Some(Outbound {
            routing_key: routing_key.to_string(),
            body,
        }),
        Err(err) => {
            warn!(source = %report.source, "failed to encode job report: {err}");
            None
        }
    }
}
