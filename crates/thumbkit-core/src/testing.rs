//! In-memory doubles for the queue, storage and transform seams.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{StorageError, TransformError, TransportError};
use crate::queue::{QueueMessage, QueueTransport, ReceiptHandle};
use crate::storage::ObjectStore;
use crate::transform::Transformer;
use crate::types::RenditionSpec;

/// Tracks how many calls are in flight and the peak.
#[derive(Default)]
struct Gauge {
    current: usize,
    peak: usize,
}

impl Gauge {
    fn enter(&mut self) {
        self.current += 1;
        self.peak = self.peak.max(self.current);
    }

    fn leave(&mut self) {
        self.current -= 1;
    }
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<(String, String), Vec<u8>>,
    delays: HashMap<String, Duration>,
    failing_uploads: HashSet<String>,
    fetches: Gauge,
}

/// Leaves the fetch gauge when a fetch finishes or is cancelled.
struct FetchGuard(Arc<Mutex<StoreState>>);

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.fetches.leave();
        }
    }
}

/// Object store backed by a map. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    /// Delay fetches of `key` by `delay`.
    pub fn set_delay(&self, key: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(key.to_string(), delay);
    }

    /// Make uploads to `key` fail.
    pub fn fail_upload(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(key.to_string());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.state.lock().unwrap().fetches.peak
    }

    pub fn fetches_in_flight(&self) -> usize {
        self.state.lock().unwrap().fetches.current
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<PathBuf, StorageError> {
        let (delay, _in_flight) = {
            let mut state = self.state.lock().unwrap();
            state.fetches.enter();
            (state.delays.get(key).copied(), FetchGuard(self.state.clone()))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let bytes = self
            .state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned();
        let bytes = bytes.ok_or_else(|| StorageError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;

        tokio::fs::write(dest, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: dest.to_path_buf(),
                source,
            })?;
        Ok(dest.to_path_buf())
    }

    async fn upload(&self, bucket: &str, source: &Path, key: &str) -> Result<(), StorageError> {
        if self.state.lock().unwrap().failing_uploads.contains(key) {
            return Err(StorageError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| StorageError::Io {
                path: source.to_path_buf(),
                source: e,
            })?;
        self.put(bucket, key, &bytes);
        Ok(())
    }
}

#[derive(Default)]
struct TransformState {
    failing: HashSet<String>,
    inputs_seen: Vec<PathBuf>,
    calls: usize,
    running: Gauge,
}

/// Transformer that writes a small marker file. Clones share state.
#[derive(Clone, Default)]
pub struct StubTransformer {
    state: Arc<Mutex<TransformState>>,
    delay: Option<Duration>,
}

impl StubTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make renditions with this suffix fail.
    pub fn fail_suffix(&self, suffix: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(suffix.to_string());
    }

    /// Every input path handed to a transform call, in call order.
    pub fn inputs_seen(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().inputs_seen.clone()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().running.peak
    }
}

#[async_trait]
impl Transformer for StubTransformer {
    fn name(&self) -> &str {
        "stub"
    }

    async fn transform(
        &self,
        spec: &RenditionSpec,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf, TransformError> {
        {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            state.inputs_seen.extend(inputs.iter().cloned());
            state.running.enter();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.running.leave();
            state.failing.contains(&spec.suffix)
        };
        if fail {
            return Err(TransformError::InvalidSpec {
                suffix: spec.suffix.clone(),
                message: "injected failure".to_string(),
            });
        }

        tokio::fs::write(output, spec.suffix.as_bytes())
            .await
            .map_err(|e| TransformError::Encode {
                path: output.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(output.to_path_buf())
    }
}

/// One scripted answer to `receive`.
pub enum Delivery {
    Message(QueueMessage),
    Empty,
    Error,
}

#[derive(Default)]
struct QueueState {
    script: VecDeque<Delivery>,
    deleted: Vec<ReceiptHandle>,
    receives: usize,
    fail_deletes: bool,
}

/// Queue that replays a script of deliveries, then reports empty.
/// Clones share state.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&self, handle: &str, body: impl Into<Vec<u8>>) {
        self.push(Delivery::Message(QueueMessage {
            handle: ReceiptHandle::new(handle),
            body: body.into(),
        }));
    }

    pub fn push(&self, delivery: Delivery) {
        self.state.lock().unwrap().script.push_back(delivery);
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn deleted(&self) -> Vec<ReceiptHandle> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn receives(&self) -> usize {
        self.state.lock().unwrap().receives
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn receive(&self) -> Result<Option<QueueMessage>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.receives += 1;
        match state.script.pop_front() {
            Some(Delivery::Message(message)) => Ok(Some(message)),
            Some(Delivery::Error) => Err(TransportError::Receive("injected failure".to_string())),
            Some(Delivery::Empty) | None => Ok(None),
        }
    }

    async fn delete(&self, handle: &ReceiptHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(TransportError::Delete {
                handle: handle.to_string(),
                message: "injected failure".to_string(),
            });
        }
        state.deleted.push(handle.clone());
        Ok(())
    }
}
