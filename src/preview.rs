//! # Preview Encoder
//!
//! Renders a normalized page as a small PNG thumbnail wrapped in a
//! `data:image/png;base64,` URI, ready to embed in a review page.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GrayImage;
use tracing::debug;

use crate::models::{encode_png, NormalizedImage};

pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";
pub const DEFAULT_MAX_DIMENSION: u32 = 300;

/// Errors raised while building a preview
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewError {
    /// Bounding box side of zero
    InvalidMaxDimension(u32),
    /// PNG encoding failed
    Encoding(String),
}

impl std::fmt::Display for PreviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreviewError::InvalidMaxDimension(value) => {
                write!(f, "Preview bounding box must be positive, got {}", value)
            }
            PreviewError::Encoding(msg) => write!(f, "Failed to encode preview PNG: {}", msg),
        }
    }
}

impl std::error::Error for PreviewError {}

/// Builds thumbnails that fit within a square bounding box
#[derive(Debug, Clone)]
pub struct PreviewEncoder {
    max_dimension: u32,
}

impl Default for PreviewEncoder {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl PreviewEncoder {
    pub fn new(max_dimension: u32) -> Result<Self, PreviewError> {
        if max_dimension == 0 {
            return Err(PreviewError::InvalidMaxDimension(max_dimension));
        }
        Ok(Self { max_dimension })
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Thumbnail size for an image, preserving aspect ratio. Images that
    /// already fit are left at their size.
    pub fn thumbnail_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width <= self.max_dimension && height <= self.max_dimension {
            return (width, height);
        }
        let scale = f64::min(
            self.max_dimension as f64 / width as f64,
            self.max_dimension as f64 / height as f64,
        );
        let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, self.max_dimension);
        (scaled(width), scaled(height))
    }

    /// Downscale the image to fit the bounding box, averaging the source
    /// pixels each output pixel covers.
    pub fn thumbnail(&self, image: &NormalizedImage) -> GrayImage {
        let (width, height) = image.dimensions();
        let (target_width, target_height) = self.thumbnail_dimensions(width, height);
        if (target_width, target_height) == (width, height) {
            return image.image().clone();
        }
        image::imageops::thumbnail(image.image(), target_width, target_height)
    }

    /// Encode the thumbnail as a PNG data URI.
    pub fn encode(&self, image: &NormalizedImage) -> Result<String, PreviewError> {
        let thumbnail = self.thumbnail(image);
        let png = encode_png(&thumbnail).map_err(|e| PreviewError::Encoding(e.to_string()))?;
        let b64 = STANDARD.encode(&png);

        debug!(
            "Encoded {}x{} preview -> {} bytes base64",
            thumbnail.width(),
            thumbnail.height(),
            b64.len()
        );

        Ok(format!("{DATA_URI_PREFIX}{b64}"))
    }
}
