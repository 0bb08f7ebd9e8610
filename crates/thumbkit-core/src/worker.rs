//! The poll loop: receive one message, decode it, orchestrate, repeat.
//!
//! Jobs are handled strictly one at a time. Concurrency lives inside a job
//! (fetching and rendering), never across jobs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::backoff_duration;
use crate::codec;
use crate::config::QueueConfig;
use crate::error::{DecodeError, TransportError};
use crate::pipeline::{JobOrchestrator, JobReport};
use crate::queue::{QueueMessage, QueueTransport};

/// What one poll cycle did.
#[derive(Debug)]
pub enum PollOutcome {
    /// The receive returned no message
    Idle,
    /// The receive failed
    TransportError(TransportError),
    /// The body was not a job; the message stays on the queue
    Rejected(DecodeError),
    /// A job ran through the orchestrator
    Processed(JobReport),
}

/// Drives the queue, one job at a time.
pub struct Worker {
    queue: Arc<dyn QueueTransport>,
    orchestrator: JobOrchestrator,
    retry_delay_ms: u64,
    max_backoff_ms: u64,
    idle_delay: Duration,
    consecutive_errors: u32,
    jobs_processed: u64,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn QueueTransport>,
        orchestrator: JobOrchestrator,
        config: &QueueConfig,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            retry_delay_ms: config.retry_delay_ms,
            max_backoff_ms: config.max_backoff_ms,
            idle_delay: Duration::from_millis(config.idle_delay_ms),
            consecutive_errors: 0,
            jobs_processed: 0,
        }
    }

    /// Number of jobs that reached the orchestrator.
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_processed
    }

    /// Perform exactly one receive/dispatch cycle. Never sleeps.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let received = self.queue.receive().await;
        self.dispatch(received).await
    }

    /// How long to wait before the next receive after `outcome`.
    pub fn delay_after(&self, outcome: &PollOutcome) -> Duration {
        match outcome {
            PollOutcome::TransportError(_) => backoff_duration(
                self.consecutive_errors.saturating_sub(1),
                self.retry_delay_ms,
                self.max_backoff_ms,
            ),
            PollOutcome::Idle => self.idle_delay,
            PollOutcome::Rejected(_) | PollOutcome::Processed(_) => Duration::ZERO,
        }
    }

    /// Poll forever.
    pub async fn run(&mut self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Poll until `shutdown` resolves.
    ///
    /// Shutdown interrupts a pending receive or a backoff sleep, but a job
    /// that has been received always runs to its ack decision first.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Worker started");

        loop {
            let received = tokio::select! {
                _ = &mut shutdown => break,
                received = self.queue.receive() => received,
            };

            let outcome = self.dispatch(received).await;
            let delay = self.delay_after(&outcome);
            if !delay.is_zero() {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        tracing::info!("Worker stopped after {} job(s)", self.jobs_processed);
    }

    async fn dispatch(
        &mut self,
        received: Result<Option<QueueMessage>, TransportError>,
    ) -> PollOutcome {
        let message = match received {
            Ok(Some(message)) => {
                self.consecutive_errors = 0;
                message
            }
            Ok(None) => {
                self.consecutive_errors = 0;
                tracing::debug!("No messages received");
                return PollOutcome::Idle;
            }
            Err(e) => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                tracing::error!(
                    "Error receiving message (attempt {}): {e}",
                    self.consecutive_errors
                );
                return PollOutcome::TransportError(e);
            }
        };

        let (job, encoding) = match codec::decode_with_encoding(&message.body) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::error!(
                    "Error parsing job message {}, leaving it on the queue: {e}",
                    message.handle.short()
                );
                return PollOutcome::Rejected(e);
            }
        };
        tracing::debug!(
            "Decoded {encoding} job from message {}",
            message.handle.short()
        );

        let report = self.orchestrator.process(job, &message.handle).await;
        self.jobs_processed += 1;
        PollOutcome::Processed(report)
    }
}
