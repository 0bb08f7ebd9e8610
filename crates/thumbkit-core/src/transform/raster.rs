//! Built-in transformer on top of the `image` crate.
//!
//! Renders from the first input only. Decoding, resizing and encoding run on
//! the blocking pool under the configured timeout; the output file is written
//! only once the encoded bytes are back within that timeout.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;

use super::Transformer;
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::types::{RenditionSpec, Strategy};

const FILTER: FilterType = FilterType::Lanczos3;

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Jpeg,
    Other(ImageFormat),
}

impl OutputFormat {
    fn parse(format: &str) -> Result<Self, TransformError> {
        match format.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Other(ImageFormat::Png)),
            "webp" => Ok(Self::Other(ImageFormat::WebP)),
            "gif" => Ok(Self::Other(ImageFormat::Gif)),
            "bmp" => Ok(Self::Other(ImageFormat::Bmp)),
            "tif" | "tiff" => Ok(Self::Other(ImageFormat::Tiff)),
            _ => Err(TransformError::UnsupportedFormat(format.to_string())),
        }
    }
}

/// Resizes and re-encodes images per rendition spec.
pub struct ImageTransformer {
    config: TransformConfig,
}

impl ImageTransformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    /// Decode, resize and encode in memory.
    fn render_sync(
        spec: &RenditionSpec,
        input: &Path,
        output: &Path,
        config: &TransformConfig,
    ) -> Result<Vec<u8>, TransformError> {
        let format = OutputFormat::parse(spec.format_or_default())?;

        let source = image::ImageReader::open(input)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| TransformError::Decode {
                path: input.to_path_buf(),
                message: e.to_string(),
            })?
            .decode()
            .map_err(|e| TransformError::Decode {
                path: input.to_path_buf(),
                message: e.to_string(),
            })?;

        let (width, height) = source.dimensions();
        if width > config.max_image_dimension || height > config.max_image_dimension {
            return Err(TransformError::ImageTooLarge {
                path: input.to_path_buf(),
                width,
                height,
                max_dim: config.max_image_dimension,
            });
        }

        let rendered = resize(&source, spec, config.max_image_dimension)?;
        let quality = spec
            .quality
            .unwrap_or(config.default_quality)
            .clamp(1, 100);
        encode(&rendered, format, quality, output)
    }
}

#[async_trait]
impl Transformer for ImageTransformer {
    fn name(&self) -> &str {
        "image"
    }

    async fn transform(
        &self,
        spec: &RenditionSpec,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<PathBuf, TransformError> {
        let input = inputs.first().ok_or(TransformError::NoInputs)?.clone();
        let spec_owned = spec.clone();
        let output_owned = output.to_path_buf();
        let config = self.config.clone();
        let timeout_duration = Duration::from_millis(self.config.timeout_ms);

        let result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || {
                Self::render_sync(&spec_owned, &input, &output_owned, &config)
            })
            .await
        })
        .await;

        let bytes = match result {
            Ok(Ok(rendered)) => rendered?,
            Ok(Err(e)) => return Err(TransformError::Task(e.to_string())),
            Err(_) => {
                return Err(TransformError::Timeout {
                    suffix: spec.suffix.clone(),
                    timeout_ms: self.config.timeout_ms,
                })
            }
        };

        tokio::fs::write(output, bytes)
            .await
            .map_err(|e| TransformError::Encode {
                path: output.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(output.to_path_buf())
    }
}

/// Apply the spec's strategy to the source image. Requested dimensions are
/// capped by `max_dim`, the same limit applied to inputs.
fn resize(
    source: &DynamicImage,
    spec: &RenditionSpec,
    max_dim: u32,
) -> Result<DynamicImage, TransformError> {
    let invalid = |message: &str| TransformError::InvalidSpec {
        suffix: spec.suffix.clone(),
        message: message.to_string(),
    };

    if spec.width == Some(0) || spec.height == Some(0) {
        return Err(invalid("width and height must be > 0"));
    }
    if spec.width.unwrap_or(0) > max_dim || spec.height.unwrap_or(0) > max_dim {
        return Err(invalid(&format!("width and height must be <= {max_dim}")));
    }

    let strategy = spec.strategy();
    if strategy == Strategy::Bounded {
        return Ok(match (spec.width, spec.height) {
            (None, None) => source.clone(),
            (w, h) => fit_within(source, w.unwrap_or(u32::MAX), h.unwrap_or(u32::MAX)),
        });
    }

    let (Some(width), Some(height)) = (spec.width, spec.height) else {
        return Err(invalid(&format!(
            "strategy '{strategy}' needs both width and height"
        )));
    };

    Ok(match strategy {
        Strategy::Bounded => fit_within(source, width, height),
        Strategy::Fill => source.resize_to_fill(width, height, FILTER),
        Strategy::Strict => source.resize_exact(width, height, FILTER),
        Strategy::Matted => {
            let background = match spec.background.as_deref() {
                Some(color) => parse_color(color)
                    .ok_or_else(|| invalid(&format!("invalid background colour '{color}'")))?,
                None => Rgba([255, 255, 255, 255]),
            };
            let fitted = fit_within(source, width, height);
            let mut canvas = RgbaImage::from_pixel(width, height, background);
            let x = i64::from((width - fitted.width()) / 2);
            let y = i64::from((height - fitted.height()) / 2);
            imageops::overlay(&mut canvas, &fitted.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(canvas)
        }
    })
}

/// Shrink to fit inside `width` x `height` keeping aspect ratio; never upscale.
fn fit_within(source: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if source.width() <= width && source.height() <= height {
        source.clone()
    } else {
        source.resize(width, height, FILTER)
    }
}

/// Parse `#rrggbb` or `#rrggbbaa` (leading `#` optional).
fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Encode into a buffer; `output` only names the target in errors.
fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    output: &Path,
) -> Result<Vec<u8>, TransformError> {
    let encode_err = |message: String| TransformError::Encode {
        path: output.to_path_buf(),
        message,
    };

    let mut writer = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| encode_err(e.to_string()))?;
        }
        OutputFormat::Other(format) => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            rgba.write_to(&mut writer, format)
                .map_err(|e| encode_err(e.to_string()))?;
        }
    }

    Ok(writer.into_inner())
}
