//! Error types for the thumbkit worker.
//!
//! Errors are organized by pipeline stage. Only some of them are fatal to a
//! job: a [`DecodeError`] or [`FetchError`] leaves the message on the queue,
//! while [`RenditionError`] and [`DeliveryError`] are recorded and the job
//! carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for thumbkit operations.
#[derive(Error, Debug)]
pub enum ThumbkitError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Queue transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Webhook client errors outside of a job (client setup)
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// A queue message body that is not a usable job.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Neither the raw bytes nor their base64 decoding parse as JSON
    #[error("Malformed message body: not JSON ({plain}) and not base64 JSON ({base64})")]
    Malformed { plain: String, base64: String },

    /// Syntactically valid JSON that does not describe a job
    #[error("Message body is not a valid job: {0}")]
    Shape(#[source] serde_json::Error),

    /// Neither `resources` nor the legacy `original` field is present
    #[error("Job names no input resources (expected `resources` or `original`)")]
    MissingResources,
}

/// Object storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The object does not exist
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Download request failed
    #[error("Download of {bucket}/{key} failed: {message}")]
    Download {
        bucket: String,
        key: String,
        message: String,
    },

    /// Upload request failed
    #[error("Upload to {bucket}/{key} failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    /// Bucket or key does not name a location inside the store
    #[error("Invalid object key: {bucket}/{key}")]
    InvalidKey { bucket: String, key: String },

    /// Local scratch file I/O failed
    #[error("Scratch I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One input resource of a job could not be materialized locally.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The storage client reported an error for this resource
    #[error("Failed to fetch resource {resource}: {source}")]
    Storage {
        resource: String,
        #[source]
        source: StorageError,
    },

    /// The fetch task died before reporting a result
    #[error("Fetch task for {resource} did not complete: {message}")]
    Task { resource: String, message: String },
}

/// The transform capability failed for one rendition.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The job supplied no local inputs
    #[error("No input images to transform")]
    NoInputs,

    /// The rendition parameters cannot be satisfied
    #[error("Invalid rendition spec '{suffix}': {message}")]
    InvalidSpec { suffix: String, message: String },

    /// Input image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Input exceeds the configured dimension limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Requested output format cannot be encoded
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Encoding the rendition failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The transform did not finish in time
    #[error("Transform '{suffix}' timed out after {timeout_ms}ms")]
    Timeout { suffix: String, timeout_ms: u64 },

    /// The blocking transform task died
    #[error("Transform task failed: {0}")]
    Task(String),
}

/// Why a single rendition produced no output. Never fatal to the job.
#[derive(Error, Debug)]
pub enum RenditionError {
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),
}

/// Completion webhook failures. Always logged and swallowed.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The HTTP request could not be sent
    #[error("Webhook request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status
    #[error("Webhook {url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    /// Failed to build the HTTP client
    #[error("Failed to build webhook client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Queue transport failures. These trigger a re-poll, never a shutdown.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to receive from queue: {0}")]
    Receive(String),

    #[error("Failed to delete message {handle}: {message}")]
    Delete { handle: String, message: String },

    #[error("Failed to send message: {0}")]
    Send(String),

    /// The queue could not be located or the client configured
    #[error("Queue setup failed: {0}")]
    Setup(String),
}

/// Convenience type alias for thumbkit results.
pub type Result<T> = std::result::Result<T, ThumbkitError>;
