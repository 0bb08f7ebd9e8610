//! Amazon SQS transport.

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use super::{QueueMessage, QueueTransport, ReceiptHandle};
use crate::aws::load_sdk_config;
use crate::config::{resolve_env_var, Config, QueueConfig};
use crate::error::TransportError;

/// SQS queue client bound to one queue url.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    wait_time_seconds: i32,
    visibility_timeout_seconds: Option<i32>,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>, config: &QueueConfig) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            wait_time_seconds: config.wait_time_seconds,
            visibility_timeout_seconds: config.visibility_timeout_seconds,
        }
    }

    /// Build a client from the `[aws]` and `[queue]` sections.
    ///
    /// When no queue url is configured it is looked up by queue name.
    pub async fn from_config(config: &Config) -> Result<Self, TransportError> {
        let sdk_config = load_sdk_config(&config.aws).await;
        let client = Client::new(&sdk_config);

        let queue_url = match resolve_env_var(&config.queue.queue_url) {
            Some(url) => url,
            None => Self::lookup_url(&client, &config.queue.queue_name).await?,
        };
        tracing::info!("Using queue {queue_url}");

        Ok(Self::new(client, queue_url, &config.queue))
    }

    async fn lookup_url(client: &Client, queue_name: &str) -> Result<String, TransportError> {
        let output = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| {
                TransportError::Setup(format!(
                    "cannot resolve queue '{queue_name}': {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        output
            .queue_url
            .ok_or_else(|| TransportError::Setup(format!("queue '{queue_name}' has no url")))
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Publish a message body. Used by producers, not by the worker loop.
    pub async fn send(&self, body: &str) -> Result<String, TransportError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| TransportError::Send(DisplayErrorContext(&e).to_string()))?;
        Ok(output.message_id.unwrap_or_default())
    }
}

#[async_trait]
impl QueueTransport for SqsQueue {
    async fn receive(&self) -> Result<Option<QueueMessage>, TransportError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(self.wait_time_seconds)
            .set_visibility_timeout(self.visibility_timeout_seconds)
            .send()
            .await
            .map_err(|e| TransportError::Receive(DisplayErrorContext(&e).to_string()))?;

        let Some(message) = output.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        let Some(handle) = message.receipt_handle else {
            tracing::warn!(
                "Received message {:?} without a receipt handle; ignoring",
                message.message_id
            );
            return Ok(None);
        };

        Ok(Some(QueueMessage {
            handle: ReceiptHandle::new(handle),
            body: message.body.unwrap_or_default().into_bytes(),
        }))
    }

    async fn delete(&self, handle: &ReceiptHandle) -> Result<(), TransportError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(handle.as_str())
            .send()
            .await
            .map_err(|e| TransportError::Delete {
                handle: handle.short().to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}
