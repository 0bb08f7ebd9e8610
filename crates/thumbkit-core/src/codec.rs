//! Queue message body decoding.
//!
//! A body is either a JSON job document or the base64 encoding of one. The
//! plain form is tried first; only a *syntax* failure sends the body down the
//! base64 path. JSON that parses but does not describe a job is rejected
//! as-is.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::Deserialize;
use serde_json::error::Category;
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::types::{Job, RenditionSpec};

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Which wire encoding a body arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    PlainJson,
    Base64Json,
}

impl std::fmt::Display for BodyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlainJson => f.write_str("json"),
            Self::Base64Json => f.write_str("base64+json"),
        }
    }
}

/// Result of the two-step body parse, before normalization.
#[derive(Debug)]
pub enum ParsedBody {
    PlainJson(WireJob),
    Base64Json(WireJob),
    Invalid(DecodeError),
}

/// The job document as it appears on the wire, legacy field included.
#[derive(Debug, Deserialize)]
pub struct WireJob {
    /// Legacy single-resource form
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    resources: Option<Vec<String>>,
    #[serde(default)]
    bucket: Option<String>,
    prefix: String,
    #[serde(default)]
    descriptions: Vec<RenditionSpec>,
    #[serde(default)]
    notify: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl WireJob {
    /// Normalize into a [`Job`]. A legacy `original` wins over `resources`
    /// and is kept in `extra` so notifications echo it back.
    pub fn into_job(self) -> Result<Job, DecodeError> {
        let resources = match (&self.original, self.resources) {
            (Some(original), _) if !original.is_empty() => vec![original.clone()],
            (_, Some(resources)) => resources,
            _ => return Err(DecodeError::MissingResources),
        };

        // `output` is produced by this worker, never taken from the producer
        let mut extra = self.extra;
        extra.remove("output");
        if let Some(original) = self.original {
            extra.insert("original".to_string(), Value::String(original));
        }

        Ok(Job {
            resources,
            bucket: self.bucket,
            prefix: self.prefix,
            descriptions: self.descriptions,
            notify: self.notify.filter(|url| !url.is_empty()),
            output: None,
            extra,
        })
    }
}

/// Parse a raw body, trying plain JSON first and base64 JSON second.
pub fn parse_body(raw: &[u8]) -> ParsedBody {
    let plain_err = match serde_json::from_slice::<WireJob>(raw) {
        Ok(wire) => return ParsedBody::PlainJson(wire),
        Err(e) if is_syntax_error(&e) => e,
        Err(e) => return ParsedBody::Invalid(DecodeError::Shape(e)),
    };

    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let decoded = match LENIENT_BASE64.decode(&compact) {
        Ok(bytes) => bytes,
        Err(e) => {
            return ParsedBody::Invalid(DecodeError::Malformed {
                plain: plain_err.to_string(),
                base64: e.to_string(),
            })
        }
    };

    match serde_json::from_slice::<WireJob>(&decoded) {
        Ok(wire) => ParsedBody::Base64Json(wire),
        Err(e) if is_syntax_error(&e) => ParsedBody::Invalid(DecodeError::Malformed {
            plain: plain_err.to_string(),
            base64: e.to_string(),
        }),
        Err(e) => ParsedBody::Invalid(DecodeError::Shape(e)),
    }
}

/// Decode a message body into a normalized [`Job`], reporting the encoding.
pub fn decode_with_encoding(raw: &[u8]) -> Result<(Job, BodyEncoding), DecodeError> {
    match parse_body(raw) {
        ParsedBody::PlainJson(wire) => Ok((wire.into_job()?, BodyEncoding::PlainJson)),
        ParsedBody::Base64Json(wire) => Ok((wire.into_job()?, BodyEncoding::Base64Json)),
        ParsedBody::Invalid(e) => Err(e),
    }
}

/// Decode a message body into a normalized [`Job`].
pub fn decode(raw: &[u8]) -> Result<Job, DecodeError> {
    decode_with_encoding(raw).map(|(job, _)| job)
}

/// Encode a job document for the queue.
pub fn encode(job: &Job, encoding: BodyEncoding) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(job)?;
    Ok(match encoding {
        BodyEncoding::PlainJson => json,
        BodyEncoding::Base64Json => base64::engine::general_purpose::STANDARD.encode(json),
    })
}

fn is_syntax_error(e: &serde_json::Error) -> bool {
    matches!(e.classify(), Category::Syntax | Category::Eof | Category::Io)
}
