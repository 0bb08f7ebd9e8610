//! Job orchestration: fetch -> render -> notify -> acknowledge.
//!
//! The queue message is deleted only when fetching succeeded and rendering
//! ran to completion (partial rendition failures included). Any hard failure
//! leaves the message for redelivery. Scratch files never outlive the job.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

use super::fetch::ResourceFetcher;
use super::render::{RenditionPipeline, RenditionResult};
use crate::notify::Notifier;
use crate::queue::{QueueTransport, ReceiptHandle};
use crate::scratch::{remove_file_logged, ScratchDir};
use crate::types::{Job, LocalResource};

/// Stage a job is in, or ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Fetching,
    Rendering,
    Notifying,
    Acknowledging,
    /// The message was deleted
    Done,
    /// A hard failure; the message stays on the queue
    Failed,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Fetching => "fetching",
            Self::Rendering => "rendering",
            Self::Notifying => "notifying",
            Self::Acknowledging => "acknowledging",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened to one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Identifier used in logs and scratch paths
    pub job_id: String,
    /// `Done` or `Failed`
    pub stage: JobStage,
    /// Stage in which a hard failure happened
    pub failed_in: Option<JobStage>,
    /// The pipeline succeeded, so the message should be deleted
    pub ack_requested: bool,
    /// The delete call succeeded
    pub acknowledged: bool,
    /// Keys of the renditions that were produced
    pub output: Vec<String>,
    /// Number of renditions that produced nothing
    pub failed_renditions: usize,
    /// Human-readable description of the hard failure, if any
    pub error: Option<String>,
}

/// Runs one job through every stage and makes the ack decision.
pub struct JobOrchestrator {
    fetcher: ResourceFetcher,
    pipeline: RenditionPipeline,
    notifier: Notifier,
    queue: Arc<dyn QueueTransport>,
    scratch_root: PathBuf,
    default_bucket: String,
    notify_on_fetch_failure: bool,
}

impl JobOrchestrator {
    pub fn new(
        fetcher: ResourceFetcher,
        pipeline: RenditionPipeline,
        notifier: Notifier,
        queue: Arc<dyn QueueTransport>,
        scratch_root: PathBuf,
        default_bucket: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            pipeline,
            notifier,
            queue,
            scratch_root,
            default_bucket: default_bucket.into(),
            notify_on_fetch_failure: true,
        }
    }

    /// Whether a failed fetch still calls the webhook (without `output`).
    pub fn with_notify_on_fetch_failure(mut self, enabled: bool) -> Self {
        self.notify_on_fetch_failure = enabled;
        self
    }

    /// Process one decoded job received under `handle`.
    pub async fn process(&self, job: Job, handle: &ReceiptHandle) -> JobReport {
        let job_id = uuid::Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!(
            "job",
            id = %job_id,
            handle = handle.short(),
            prefix = %job.prefix
        );
        self.run_stages(job, handle, job_id).instrument(span).await
    }

    async fn run_stages(&self, mut job: Job, handle: &ReceiptHandle, job_id: String) -> JobReport {
        let mut report = JobReport {
            job_id,
            stage: JobStage::Fetching,
            failed_in: None,
            ack_requested: false,
            acknowledged: false,
            output: Vec::new(),
            failed_renditions: 0,
            error: None,
        };

        let scratch = match ScratchDir::create(&self.scratch_root, &report.job_id).await {
            Ok(scratch) => scratch,
            Err(e) => {
                tracing::error!(
                    "Cannot create scratch directory under {}: {e}",
                    self.scratch_root.display()
                );
                return fail(report, format!("scratch directory: {e}"));
            }
        };

        let bucket = job.bucket_or(&self.default_bucket).to_string();

        // Fetching
        tracing::info!(
            "Fetching {} resource(s) from bucket '{bucket}'",
            job.resources.len()
        );
        let inputs = match self.fetcher.fetch_all(&job.resources, &bucket, &scratch).await {
            Ok(inputs) => inputs,
            Err(e) => {
                tracing::error!("Fetch failed, leaving message on the queue: {e}");
                if self.notify_on_fetch_failure {
                    self.notifier.notify(&job).await;
                }
                scratch.remove().await;
                return fail(report, e.to_string());
            }
        };

        // Rendering
        report.stage = JobStage::Rendering;
        let results = self
            .pipeline
            .render(&job.descriptions, &inputs, &bucket, &job.prefix, &scratch)
            .await;
        remove_inputs(&inputs).await;

        let (output, failed) = collect_outputs(results);
        report.failed_renditions = failed;
        tracing::info!(
            "Rendered {} of {} rendition(s)",
            output.len(),
            job.descriptions.len()
        );

        // Notifying
        report.stage = JobStage::Notifying;
        job.output = Some(output.clone());
        report.output = output;
        self.notifier.notify(&job).await;

        // Acknowledging
        report.stage = JobStage::Acknowledging;
        report.ack_requested = true;
        match self.queue.delete(handle).await {
            Ok(()) => {
                tracing::info!("Deleted job message {}", handle.short());
                report.acknowledged = true;
            }
            Err(e) => tracing::error!("Error deleting job message: {e}"),
        }

        scratch.remove().await;
        report.stage = JobStage::Done;
        report
    }
}

fn fail(mut report: JobReport, error: String) -> JobReport {
    report.failed_in = Some(report.stage);
    report.stage = JobStage::Failed;
    report.error = Some(error);
    report
}

/// Delete fetched inputs once every rendition has finished with them.
async fn remove_inputs(inputs: &[LocalResource]) {
    for input in inputs {
        remove_file_logged(input.path()).await;
    }
}

/// Split rendition results into produced keys and a failure count,
/// logging each failure.
fn collect_outputs(results: Vec<RenditionResult>) -> (Vec<String>, usize) {
    let mut output = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(rendition) => output.push(rendition.key),
            Err(failure) => {
                tracing::warn!("{failure}");
                failed += 1;
            }
        }
    }
    (output, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyConfig;
    use crate::testing::{MemoryQueue, MemoryStore, StubTransformer};
    use crate::types::RenditionSpec;
    use std::collections::HashSet;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        _root: tempfile::TempDir,
        scratch_root: PathBuf,
        store: MemoryStore,
        transformer: StubTransformer,
        queue: MemoryQueue,
        orchestrator: JobOrchestrator,
    }

    fn harness() -> Harness {
        let root = tempfile::tempdir().unwrap();
        let scratch_root = root.path().join("scratch");
        let store = MemoryStore::new();
        let transformer = StubTransformer::new();
        let queue = MemoryQueue::new();
        let orchestrator = JobOrchestrator::new(
            ResourceFetcher::new(Arc::new(store.clone()), 5),
            RenditionPipeline::new(Arc::new(transformer.clone()), Arc::new(store.clone())),
            Notifier::new(&NotifyConfig::default()).unwrap(),
            Arc::new(queue.clone()),
            scratch_root.clone(),
            "default-bucket",
        );
        Harness {
            _root: root,
            scratch_root,
            store,
            transformer,
            queue,
            orchestrator,
        }
    }

    fn job(resources: &[&str], descriptions: Vec<RenditionSpec>) -> Job {
        Job {
            resources: resources.iter().map(|r| r.to_string()).collect(),
            bucket: Some("b".to_string()),
            prefix: "out/x".to_string(),
            descriptions,
            notify: None,
            output: None,
            extra: Default::default(),
        }
    }

    fn scratch_is_empty(root: &std::path::Path) -> bool {
        std::fs::read_dir(root)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_single_rendition_job() {
        let h = harness();
        h.store.put("b", "a.jpg", b"pixels");
        let handle = ReceiptHandle::new("h-1");

        let report = h
            .orchestrator
            .process(job(&["a.jpg"], vec![RenditionSpec::new("sm", 64, 64)]), &handle)
            .await;

        assert_eq!(report.stage, JobStage::Done);
        assert_eq!(report.output, vec!["out/x_sm.jpg"]);
        assert!(report.acknowledged);
        assert_eq!(h.queue.deleted(), vec![handle]);
        assert!(h.store.contains("b", "out/x_sm.jpg"));
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_rendering_and_ack() {
        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        h.store.put("b", "c.jpg", b"c");

        let report = h
            .orchestrator
            .process(
                job(&["a.jpg", "gone.jpg", "c.jpg"], vec![RenditionSpec::new("sm", 1, 1)]),
                &ReceiptHandle::new("h-2"),
            )
            .await;

        assert_eq!(report.stage, JobStage::Failed);
        assert_eq!(report.failed_in, Some(JobStage::Fetching));
        assert!(!report.ack_requested);
        assert!(!report.acknowledged);
        assert!(report.error.unwrap().contains("gone.jpg"));
        assert_eq!(h.transformer.calls(), 0);
        assert!(h.queue.deleted().is_empty());
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_fetch_failure_notifies_without_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness();
        let mut job = job(&["gone.jpg"], vec![RenditionSpec::new("sm", 1, 1)]);
        job.notify = Some(server.uri());

        let report = h.orchestrator.process(job, &ReceiptHandle::new("h-8")).await;
        assert_eq!(report.stage, JobStage::Failed);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["prefix"], "out/x");
        assert!(body.get("output").is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_can_stay_silent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let Harness {
            _root,
            orchestrator,
            ..
        } = harness();
        let orchestrator = orchestrator.with_notify_on_fetch_failure(false);
        let mut job = job(&["gone.jpg"], vec![RenditionSpec::new("sm", 1, 1)]);
        job.notify = Some(server.uri());

        let report = orchestrator.process(job, &ReceiptHandle::new("h-9")).await;
        assert_eq!(report.stage, JobStage::Failed);
    }

    #[tokio::test]
    async fn test_webhook_receives_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        let mut job = job(&["a.jpg"], vec![RenditionSpec::new("sm", 1, 1)]);
        job.notify = Some(server.uri());

        h.orchestrator.process(job, &ReceiptHandle::new("h-10")).await;

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["output"], serde_json::json!(["out/x_sm.jpg"]));
    }

    #[tokio::test]
    async fn test_webhook_echoes_legacy_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness();
        h.store.put("b", "/foo/awesome.jpg", b"a");
        let body = format!(
            r#"{{"original": "/foo/awesome.jpg", "bucket": "b", "prefix": "out/x",
                "descriptions": [{{"suffix": "sm", "width": 1, "height": 1}}],
                "notify": "{}"}}"#,
            server.uri()
        );
        let job = crate::codec::decode(body.as_bytes()).unwrap();

        h.orchestrator.process(job, &ReceiptHandle::new("h-11")).await;

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["original"], "/foo/awesome.jpg");
        assert_eq!(body["resources"], serde_json::json!(["/foo/awesome.jpg"]));
        assert_eq!(body["output"], serde_json::json!(["out/x_sm.jpg"]));
    }

    #[tokio::test]
    async fn test_partial_render_is_still_acknowledged() {
        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        h.transformer.fail_suffix("s1");
        h.store.fail_upload("out/x_s3.jpg");

        let specs: Vec<RenditionSpec> = (0..5)
            .map(|i| RenditionSpec::new(format!("s{i}"), 10, 10))
            .collect();
        let report = h
            .orchestrator
            .process(job(&["a.jpg"], specs), &ReceiptHandle::new("h-3"))
            .await;

        assert_eq!(report.stage, JobStage::Done);
        assert!(report.acknowledged);
        assert_eq!(report.failed_renditions, 2);
        let produced: HashSet<&str> = report.output.iter().map(String::as_str).collect();
        assert_eq!(
            produced,
            HashSet::from(["out/x_s0.jpg", "out/x_s2.jpg", "out/x_s4.jpg"])
        );
        assert!(scratch_is_empty(&h.scratch_root));
    }

    #[tokio::test]
    async fn test_inputs_removed_after_rendering() {
        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        h.store.put("b", "b.jpg", b"b");

        h.orchestrator
            .process(
                job(&["a.jpg", "b.jpg"], vec![RenditionSpec::new("sm", 1, 1)]),
                &ReceiptHandle::new("h-4"),
            )
            .await;

        let seen = h.transformer.inputs_seen();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_does_not_block_ack() {
        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        let mut job = job(&["a.jpg"], vec![RenditionSpec::new("sm", 1, 1)]);
        job.notify = Some("http://127.0.0.1:9/unreachable".to_string());

        let report = h.orchestrator.process(job, &ReceiptHandle::new("h-5")).await;

        assert_eq!(report.stage, JobStage::Done);
        assert!(report.acknowledged);
        assert_eq!(h.queue.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_is_reported() {
        let h = harness();
        h.store.put("b", "a.jpg", b"a");
        h.queue.fail_deletes();

        let report = h
            .orchestrator
            .process(
                job(&["a.jpg"], vec![RenditionSpec::new("sm", 1, 1)]),
                &ReceiptHandle::new("h-6"),
            )
            .await;

        assert_eq!(report.stage, JobStage::Done);
        assert!(report.ack_requested);
        assert!(!report.acknowledged);
    }

    #[tokio::test]
    async fn test_default_bucket_used_without_override() {
        let h = harness();
        h.store.put("default-bucket", "a.jpg", b"a");
        let mut job = job(&["a.jpg"], vec![RenditionSpec::new("sm", 1, 1)]);
        job.bucket = None;

        let report = h.orchestrator.process(job, &ReceiptHandle::new("h-7")).await;

        assert!(report.acknowledged);
        assert!(h.store.contains("default-bucket", "out/x_sm.jpg"));
    }
}
