//! The transform capability: one rendition spec plus the job's inputs in,
//! one local output file out.

pub mod raster;

pub use raster::ImageTransformer;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::TransformError;
use crate::types::RenditionSpec;

/// Produces a rendition file from local inputs.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// Implementation name for logging.
    fn name(&self) -> &str;

    /// Render `spec` from `inputs`, writing to `output`.
    ///
    /// Returns the path actually written, which the caller owns afterwards.
    async fn transform(
        &self,
        spec: &RenditionSpec,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf, TransformError>;
}
