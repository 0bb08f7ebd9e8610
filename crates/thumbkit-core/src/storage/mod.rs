//! Object storage: where job inputs come from and renditions go to.
//!
//! - **s3**: Amazon S3 or any S3-compatible service
//! - **local**: a directory tree, for development and tests

pub mod local;
pub mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::error::StorageError;

/// Storage client used by the fetcher and the rendition pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging (e.g., "s3", "local").
    fn name(&self) -> &str;

    /// Download `bucket/key` to `dest`, returning the local path.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<PathBuf, StorageError>;

    /// Upload the file at `source` to `bucket/key`, replacing any existing object.
    async fn upload(&self, bucket: &str, source: &Path, key: &str) -> Result<(), StorageError>;
}

/// Build the configured object store.
pub async fn from_config(config: &Config) -> Arc<dyn ObjectStore> {
    let store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::S3 => Arc::new(S3Store::from_config(config).await),
        StorageBackend::Local => Arc::new(LocalStore::new(config.local_storage_root())),
    };
    tracing::info!("Object store: {}", store.name());
    store
}

/// MIME type for an uploaded rendition, from its file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
