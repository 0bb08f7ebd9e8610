//! S3 object store.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::{content_type_for, ObjectStore};
use crate::aws::load_sdk_config;
use crate::config::Config;
use crate::error::StorageError;

/// Object store backed by Amazon S3 or an S3-compatible service.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the `[aws]` and `[storage]` sections.
    pub async fn from_config(config: &Config) -> Self {
        let sdk_config = load_sdk_config(&config.aws).await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.storage.force_path_style)
            .build();
        Self::new(Client::from_conf(s3_config))
    }
}

/// Keys are stored without a leading slash; `/foo/a.jpg` and `foo/a.jpg`
/// name the same object.
fn object_key(key: &str) -> &str {
    key.trim_start_matches('/')
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        tracing::debug!("Downloading s3://{bucket}/{key} to {}", dest.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(object_key(key))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Download {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        message: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        let io_err = |source: std::io::Error| StorageError::Io {
            path: dest.to_path_buf(),
            source,
        };

        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut body = response.body;
        let mut bytes = 0usize;
        while let Some(chunk) = body.try_next().await.map_err(|e| StorageError::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: format!("body stream interrupted: {e}"),
        })? {
            bytes += chunk.len();
            file.write_all(&chunk).await.map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;

        tracing::debug!("Downloaded {bytes} bytes from s3://{bucket}/{key}");
        Ok(dest.to_path_buf())
    }

    async fn upload(&self, bucket: &str, source: &Path, key: &str) -> Result<(), StorageError> {
        tracing::debug!("Uploading {} to s3://{bucket}/{key}", source.display());

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(object_key(key))
            .body(body)
            .content_type(content_type_for(Path::new(key)))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!("Uploaded s3://{bucket}/{key}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_strips_leading_slash() {
        assert_eq!(object_key("/foo/awesome_small.jpg"), "foo/awesome_small.jpg");
        assert_eq!(object_key("foo/awesome.jpg"), "foo/awesome.jpg");
    }
}
