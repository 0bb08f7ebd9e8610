//! Completion webhook.
//!
//! After rendering, the whole job (with `output` filled in) is POSTed as JSON
//! to the job's `notify` URL. Delivery is best-effort: failures are logged and
//! never affect acknowledgement.

use std::time::Duration;

use crate::config::NotifyConfig;
use crate::error::DeliveryError;
use crate::types::Job;

/// Sends completion notifications.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self { client })
    }

    /// POST `job` to its notify URL. A job without one is a no-op.
    pub async fn deliver(&self, job: &Job) -> Result<(), DeliveryError> {
        let Some(url) = job.notify.as_deref() else {
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(job)
            .send()
            .await
            .map_err(|source| DeliveryError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    /// Like [`deliver`](Self::deliver), but logs failures instead of returning them.
    pub async fn notify(&self, job: &Job) {
        match self.deliver(job).await {
            Ok(()) => {
                if let Some(url) = &job.notify {
                    tracing::info!("Notified {url}");
                }
            }
            Err(e) => tracing::warn!("Error calling notify hook: {e}"),
        }
    }
}
