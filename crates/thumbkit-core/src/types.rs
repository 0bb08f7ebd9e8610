//! Core data types: the job decoded from a queue message and its renditions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Output format used when a rendition does not name one.
pub const DEFAULT_FORMAT: &str = "jpg";

/// One unit of queued work: which inputs to fetch, which renditions to
/// produce from them, and where to report completion.
///
/// Everything except `output` is input and is not modified while the job is
/// processed. `output` is written once, after all renditions have finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Resource keys to fetch, in order
    pub resources: Vec<String>,

    /// Bucket override; the configured bucket is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Base path that rendition keys are derived from
    pub prefix: String,

    /// Renditions to produce
    #[serde(default)]
    pub descriptions: Vec<RenditionSpec>,

    /// Completion webhook url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<String>,

    /// Keys of the renditions that were produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,

    /// Fields this worker does not interpret, echoed back in notifications
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// The bucket this job reads from and writes to.
    pub fn bucket_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.bucket.as_deref().filter(|b| !b.is_empty()).unwrap_or(default)
    }
}

/// How a rendition is fitted to its target dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fit inside width x height, keeping aspect ratio; never upscale
    #[default]
    Bounded,
    /// Cover width x height and crop the overflow
    Fill,
    /// Resize to exactly width x height, ignoring aspect ratio
    Strict,
    /// Fit inside, then pad to exactly width x height with the background
    Matted,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bounded => "bounded",
            Self::Fill => "fill",
            Self::Strict => "strict",
            Self::Matted => "matted",
        };
        f.write_str(name)
    }
}

/// Description of one derived rendition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionSpec {
    /// Label that disambiguates this rendition's key, e.g. "small"
    pub suffix: String,

    /// Output format extension; `jpg` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    /// Padding colour for `matted`, as `#rrggbb`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    /// JPEG quality, 1-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,

    /// Parameters for transformers other than the built-in one
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RenditionSpec {
    /// A spec with just a suffix and target box; everything else defaulted.
    pub fn new(suffix: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            suffix: suffix.into(),
            format: None,
            width: Some(width),
            height: Some(height),
            strategy: None,
            background: None,
            quality: None,
            extra: Map::new(),
        }
    }

    /// Requested format, falling back to [`DEFAULT_FORMAT`].
    pub fn format_or_default(&self) -> &str {
        self.format
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_FORMAT)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.unwrap_or_default()
    }
}

/// An input resource materialized in scratch storage for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalResource {
    /// The storage key it was fetched from
    pub key: String,
    /// Where it lives on local disk
    pub path: PathBuf,
}

impl LocalResource {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
