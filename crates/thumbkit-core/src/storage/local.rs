//! Filesystem object store: `<root>/<bucket>/<key>`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::ObjectStore;
use crate::error::StorageError;

/// Object store backed by a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where `bucket/key` lives on disk. The bucket must be a single path
    /// segment and the key may not climb out of it.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let key = key.trim_start_matches('/');
        let bucket_ok = matches!(
            Path::new(bucket).components().collect::<Vec<_>>().as_slice(),
            [Component::Normal(_)]
        );
        let key_ok = Path::new(key).components().any(|c| matches!(c, Component::Normal(_)))
            && Path::new(key)
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !(bucket_ok && key_ok) {
            return Err(StorageError::InvalidKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        let source = self.object_path(bucket, key)?;
        match tokio::fs::copy(&source, dest).await {
            Ok(_) => Ok(dest.to_path_buf()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !source.exists() => {
                Err(StorageError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(e) => Err(StorageError::Download {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn upload(&self, bucket: &str, source: &Path, key: &str) -> Result<(), StorageError> {
        let target = self.object_path(bucket, key)?;
        let upload_err = |e: std::io::Error| StorageError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }
        tokio::fs::copy(source, &target).await.map_err(upload_err)?;

        tracing::info!("Stored {}", target.display());
        Ok(())
    }
}
