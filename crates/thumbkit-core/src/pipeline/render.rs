//! Rendition pipeline: transform + upload for each description, all at once.
//!
//! Renditions are independent deliverables. A failed transform or upload is
//! reported in that rendition's result and never affects its siblings.

use futures_util::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RenditionError;
use crate::scratch::{remove_file_logged, ScratchDir};
use crate::storage::ObjectStore;
use crate::transform::Transformer;
use crate::types::{LocalResource, RenditionSpec};

/// Storage key for a rendition: `prefix_suffix.format`.
///
/// Deterministic, so a redelivered job overwrites its earlier outputs.
pub fn rendition_key(prefix: &str, spec: &RenditionSpec) -> String {
    format!("{}_{}.{}", prefix, spec.suffix, spec.format_or_default())
}

/// A rendition that was transformed and uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOutput {
    pub suffix: String,
    pub key: String,
}

/// A rendition that produced nothing, and why.
#[derive(Debug, thiserror::Error)]
#[error("rendition '{suffix}' ({key}) failed: {error}")]
pub struct RenditionFailure {
    pub suffix: String,
    pub key: String,
    #[source]
    pub error: RenditionError,
}

/// Outcome of one rendition.
pub type RenditionResult = Result<RenditionOutput, RenditionFailure>;

/// Transforms and uploads every rendition of a job.
pub struct RenditionPipeline {
    transformer: Arc<dyn Transformer>,
    store: Arc<dyn ObjectStore>,
}

impl RenditionPipeline {
    pub fn new(transformer: Arc<dyn Transformer>, store: Arc<dyn ObjectStore>) -> Self {
        Self { transformer, store }
    }

    /// Render all descriptions concurrently.
    ///
    /// Returns one result per description, in description order. Never fails
    /// as a whole; zero descriptions yield zero results.
    pub async fn render(
        &self,
        descriptions: &[RenditionSpec],
        inputs: &[LocalResource],
        bucket: &str,
        prefix: &str,
        scratch: &ScratchDir,
    ) -> Vec<RenditionResult> {
        let input_paths: Vec<PathBuf> = inputs.iter().map(|r| r.path.clone()).collect();

        let work = descriptions
            .iter()
            .map(|spec| self.render_one(spec, &input_paths, bucket, prefix, scratch));

        join_all(work).await
    }

    async fn render_one(
        &self,
        spec: &RenditionSpec,
        inputs: &[PathBuf],
        bucket: &str,
        prefix: &str,
        scratch: &ScratchDir,
    ) -> RenditionResult {
        let key = rendition_key(prefix, spec);
        let fail = |error: RenditionError| RenditionFailure {
            suffix: spec.suffix.clone(),
            key: key.clone(),
            error,
        };

        let planned = scratch.output_path(spec);
        let produced = match self.transformer.transform(spec, inputs, &planned).await {
            Ok(path) => path,
            Err(e) => {
                // A failed transform may still have left a partial file
                remove_file_logged(&planned).await;
                return Err(fail(e.into()));
            }
        };

        let uploaded = self.store.upload(bucket, &produced, &key).await;

        // The local copy goes regardless of the upload outcome
        remove_file_logged(&produced).await;
        if produced != planned {
            remove_file_logged(&planned).await;
        }

        match uploaded {
            Ok(()) => {
                tracing::info!("Rendition '{}' uploaded to {bucket}/{key}", spec.suffix);
                Ok(RenditionOutput {
                    suffix: spec.suffix.clone(),
                    key,
                })
            }
            Err(e) => Err(fail(e.into())),
        }
    }
}
