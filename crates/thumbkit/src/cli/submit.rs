//! The `thumbkit submit` command: publish a job document to the queue.

use clap::Args;
use std::path::{Path, PathBuf};
use thumbkit_core::codec::{self, BodyEncoding};
use thumbkit_core::SqsQueue;

/// Arguments for the `submit` command.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Job document (reads stdin when omitted)
    pub input: Option<PathBuf>,

    /// Send the body base64 encoded
    #[arg(long)]
    pub base64: bool,

    /// Queue url, overriding `queue.queue_url` from the config
    #[arg(long, env = "THUMBKIT_QUEUE_URL")]
    pub queue_url: Option<String>,
}

/// Execute the submit command.
pub async fn execute(args: SubmitArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let raw = super::read_input(args.input.as_deref())?;
    let body = prepare_body(&raw, args.base64)?;

    let mut config = super::load_config(config_path)?;
    if let Some(url) = args.queue_url {
        config.queue.queue_url = url;
    }

    let queue = SqsQueue::from_config(&config).await?;
    let message_id = queue.send(&body).await?;

    tracing::info!("Submitted job to {}", queue.queue_url());
    println!("{message_id}");
    Ok(())
}

/// Check that `raw` is a job the worker would accept and encode it for the wire.
fn prepare_body(raw: &[u8], base64: bool) -> anyhow::Result<String> {
    let job = codec::decode(raw)?;
    let encoding = if base64 {
        BodyEncoding::Base64Json
    } else {
        BodyEncoding::PlainJson
    };
    Ok(codec::encode(&job, encoding)?)
}
