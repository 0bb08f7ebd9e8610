//! Thumbkit Core - queue-driven image rendition worker.
//!
//! A job message names input resources in object storage and a list of
//! rendition descriptions. The worker fetches the inputs, produces every
//! rendition concurrently, uploads them next to a common prefix, reports the
//! produced keys to an optional webhook and acknowledges the message.
//!
//! # Architecture
//!
//! ```text
//! Queue → Codec → Fetch → Render (transform + upload) → Notify → Ack
//! ```
//!
//! Every collaborator sits behind a trait ([`QueueTransport`], [`ObjectStore`],
//! [`Transformer`]) so the pipeline runs the same against SQS/S3 or local
//! doubles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use thumbkit_core::{Config, Thumbkit};
//!
//! #[tokio::main]
//! async fn main() -> thumbkit_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut thumbkit = Thumbkit::new(config).await?;
//!     thumbkit.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
//!     Ok(())
//! }
//! ```

pub mod aws;
pub mod backoff;
pub mod codec;
pub mod config;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod queue;
pub mod scratch;
pub mod storage;
pub mod transform;
pub mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::BodyEncoding;
pub use config::Config;
pub use error::{
    ConfigError, DecodeError, DeliveryError, FetchError, RenditionError, Result, StorageError,
    ThumbkitError, TransformError, TransportError,
};
pub use notify::Notifier;
pub use pipeline::{JobOrchestrator, JobReport, JobStage, RenditionPipeline, ResourceFetcher};
pub use queue::{QueueMessage, QueueTransport, ReceiptHandle, SqsQueue};
pub use storage::ObjectStore;
pub use transform::{ImageTransformer, Transformer};
pub use types::{Job, RenditionSpec, Strategy};
pub use worker::{PollOutcome, Worker};

use std::future::Future;
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A fully wired worker: configuration in, poll loop out.
pub struct Thumbkit {
    worker: Worker,
}

impl Thumbkit {
    /// Build every collaborator from `config`, using SQS as the queue.
    pub async fn new(config: Config) -> Result<Self> {
        let queue = SqsQueue::from_config(&config).await?;
        Self::with_queue(config, Arc::new(queue)).await
    }

    /// Build every collaborator except the queue from `config`.
    pub async fn with_queue(config: Config, queue: Arc<dyn QueueTransport>) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Initializing thumbkit v{}", VERSION);

        let store = storage::from_config(&config).await;
        let transformer: Arc<dyn Transformer> =
            Arc::new(ImageTransformer::new(config.transform.clone()));
        tracing::info!("Transformer: {}", transformer.name());

        let orchestrator = JobOrchestrator::new(
            ResourceFetcher::new(store.clone(), config.fetch.parallel),
            RenditionPipeline::new(transformer, store),
            Notifier::new(&config.notify)?,
            queue.clone(),
            config.scratch_dir(),
            config.storage.bucket.clone(),
        )
        .with_notify_on_fetch_failure(config.notify.notify_on_fetch_failure);

        let worker = Worker::new(queue, orchestrator, &config.queue);
        Ok(Self { worker })
    }

    pub fn worker_mut(&mut self) -> &mut Worker {
        &mut self.worker
    }

    /// Poll until `shutdown` resolves; see [`Worker::run_until`].
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.worker.run_until(shutdown).await
    }
}
