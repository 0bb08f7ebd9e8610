//! The `thumbkit run` command: the worker process.

use clap::Args;
use std::path::Path;
use thumbkit_core::Thumbkit;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Queue url, overriding `queue.queue_url` from the config
    #[arg(long, env = "THUMBKIT_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Default bucket, overriding `storage.bucket` from the config
    #[arg(long)]
    pub bucket: Option<String>,
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    if let Some(url) = args.queue_url {
        config.queue.queue_url = url;
    }
    if let Some(bucket) = args.bucket {
        config.storage.bucket = bucket;
    }

    tracing::info!("Starting thumbkit worker v{}", thumbkit_core::VERSION);
    let mut thumbkit = Thumbkit::new(config).await?;

    thumbkit
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => {
                    tracing::error!("Cannot listen for shutdown signal: {e}");
                    std::future::pending::<()>().await
                }
            }
        })
        .await;

    Ok(())
}
