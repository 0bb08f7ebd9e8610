//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root of the local scratch area; each job gets a subdirectory
    pub scratch_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("thumbkit"),
        }
    }
}

/// Credentials and endpoint shared by the queue and storage clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// Access key id; `${VAR}` is read from the environment.
    /// Empty means the default credential chain.
    pub access_key_id: String,

    /// Secret access key; `${VAR}` is read from the environment
    pub secret_access_key: String,

    /// Custom endpoint for S3/SQS-compatible services
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            access_key_id: "${AWS_ACCESS_KEY_ID}".to_string(),
            secret_access_key: "${AWS_SECRET_ACCESS_KEY}".to_string(),
            endpoint_url: None,
        }
    }
}

/// Queue transport and poll loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Queue name, used to look up the url when `queue_url` is empty
    pub queue_name: String,

    /// Full queue url; `${VAR}` is read from the environment
    pub queue_url: String,

    /// Long-poll wait per receive, in seconds (0..=20)
    pub wait_time_seconds: i32,

    /// Visibility timeout requested on receive, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_timeout_seconds: Option<i32>,

    /// Base delay for backoff after transport errors
    pub retry_delay_ms: u64,

    /// Upper bound for the backoff delay
    pub max_backoff_ms: u64,

    /// Pause after an empty receive
    pub idle_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_name: "thumbnailing".to_string(),
            queue_url: String::new(),
            wait_time_seconds: 20,
            visibility_timeout_seconds: None,
            retry_delay_ms: 1000,
            max_backoff_ms: 30_000,
            idle_delay_ms: 0,
        }
    }
}

/// Which object store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage implementation
    pub backend: StorageBackend,

    /// Bucket used when a job does not name one
    pub bucket: String,

    /// Root directory of the `local` backend (`<root>/<bucket>/<key>`)
    pub local_root: PathBuf,

    /// Path-style addressing, needed by most S3-compatible services
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: String::new(),
            local_root: PathBuf::from("~/.thumbkit/storage"),
            force_path_style: false,
        }
    }
}

/// Resource fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Max concurrent downloads per job
    pub parallel: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { parallel: 5 }
    }
}

/// Built-in image transformer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// JPEG quality when a rendition does not specify one
    pub default_quality: u8,

    /// Per-rendition timeout in milliseconds
    pub timeout_ms: u64,

    /// Inputs wider or taller than this are rejected
    pub max_image_dimension: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            default_quality: 80,
            timeout_ms: 30_000,
            max_image_dimension: 10_000,
        }
    }
}

/// Completion webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Call the webhook (with no `output`) when fetching fails
    pub notify_on_fetch_failure: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            notify_on_fetch_failure: true,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
