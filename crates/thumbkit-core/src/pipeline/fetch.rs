//! Resource fetching with bounded parallelism.
//!
//! All-or-nothing: the inputs are a shared prerequisite of every rendition,
//! so one failed download fails the whole fetch.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{FetchError, StorageError};
use crate::scratch::ScratchDir;
use crate::storage::ObjectStore;
use crate::types::LocalResource;

/// Downloads a job's input resources into its scratch directory.
pub struct ResourceFetcher {
    store: Arc<dyn ObjectStore>,
    parallel: usize,
}

impl ResourceFetcher {
    /// `parallel` caps concurrent downloads; values below 1 are treated as 1.
    pub fn new(store: Arc<dyn ObjectStore>, parallel: usize) -> Self {
        Self {
            store,
            parallel: parallel.max(1),
        }
    }

    /// Fetch every resource, returning local files in input order.
    ///
    /// On the first failure the outstanding downloads are aborted and awaited
    /// before the error is returned, so nothing writes into the scratch
    /// directory afterwards. Files already written stay there until the
    /// orchestrator removes it at the end of the job.
    pub async fn fetch_all(
        &self,
        resources: &[String],
        bucket: &str,
        scratch: &ScratchDir,
    ) -> Result<Vec<LocalResource>, FetchError> {
        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let mut handles: Vec<(String, JoinHandle<Result<LocalResource, StorageError>>)> =
            Vec::with_capacity(resources.len());

        for (index, key) in resources.iter().enumerate() {
            let store = self.store.clone();
            let semaphore = semaphore.clone();
            let bucket = bucket.to_string();
            let key_owned = key.clone();
            let dest = scratch.input_path(index, key);

            let handle = tokio::spawn(async move {
                // Only fails if the semaphore is closed, which never happens here
                let _permit = semaphore.acquire_owned().await.ok();
                let path = store.fetch(&bucket, &key_owned, &dest).await?;
                tracing::debug!("Fetched {bucket}/{key_owned} -> {}", path.display());
                Ok(LocalResource {
                    key: key_owned,
                    path,
                })
            });
            handles.push((key.clone(), handle));
        }

        let mut fetched = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter();

        while let Some((resource, handle)) = pending.next() {
            let failure = match handle.await {
                Ok(Ok(local)) => {
                    fetched.push(local);
                    continue;
                }
                Ok(Err(source)) => FetchError::Storage { resource, source },
                Err(e) => FetchError::Task {
                    resource,
                    message: e.to_string(),
                },
            };

            let rest: Vec<_> = pending.map(|(_, handle)| handle).collect();
            for handle in &rest {
                handle.abort();
            }
            for handle in rest {
                // Cancelled or finished; either way the task is gone
                let _ = handle.await;
            }
            return Err(failure);
        }

        Ok(fetched)
    }
}
