//! # Pipeline Data Model
//!
//! Images and results that flow through the page pipeline. Stages never
//! mutate their input: each one consumes a borrowed image and produces a new
//! owned buffer.

use image::{DynamicImage, GrayImage, RgbImage};
use serde::Serialize;
use std::io::Cursor;

use crate::preprocessing::PreprocessingError;

/// A rasterized page as produced by the PDF converter.
///
/// Pixels are stored row-major, interleaved, 8 bits per channel. The channel
/// count is recorded as received; the normalizer decides whether it can be
/// handled.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl PageImage {
    /// Wrap a raw pixel buffer, checking that its length matches the geometry.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, PreprocessingError> {
        if width == 0 || height == 0 {
            return Err(PreprocessingError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(PreprocessingError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel page from a grayscale buffer
    pub fn from_gray(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 1,
            data: image.into_raw(),
        }
    }

    /// Three-channel page from an RGB buffer
    pub fn from_rgb(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            data: image.into_raw(),
        }
    }

    /// Convert a decoded image into a page, dropping alpha and widening
    /// 16-bit samples to the 8-bit grid the pipeline works on.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb(rgb),
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
                Self::from_gray(image.to_luma8())
            }
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Raw interleaved pixel bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Single-channel, binarized, denoised, contrast-stretched page.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage(GrayImage);

impl NormalizedImage {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn image(&self) -> &GrayImage {
        &self.0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Encode as PNG, the format handed to both the OCR engine and the preview.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.0)
    }
}

/// PNG-encode a grayscale buffer in memory.
pub(crate) fn encode_png(image: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    image.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// A VIN that passed the check-digit validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedVin {
    pub page_number: u32,
    pub vin: String,
    /// Placeholder score, not an OCR-derived confidence. See
    /// `PipelineConfig::placeholder_confidence`.
    pub confidence: f64,
}

/// A candidate that matched the VIN shape but failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedCandidate {
    pub candidate: String,
    pub reason: String,
}

/// Whether a processed page produced any VINs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    VinsFound,
    /// Valid empty result, not an error
    NoValidVinsFound,
}

/// Everything extracted from one successfully processed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// 1-based page number, matching the rasterizer's ordering
    pub page_number: u32,
    pub vins: Vec<ValidatedVin>,
    /// `data:image/png;base64,...` thumbnail of the normalized page
    pub preview: String,
    /// Shape matches whose checksum failed, kept for diagnostics
    pub rejected_candidates: Vec<RejectedCandidate>,
    /// Mean engine confidence (0-100) when the backend reports one
    pub ocr_confidence: Option<f32>,
}

impl PageResult {
    pub fn outcome(&self) -> PageOutcome {
        if self.vins.is_empty() {
            PageOutcome::NoValidVinsFound
        } else {
            PageOutcome::VinsFound
        }
    }
}

/// A page the pipeline had to drop, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPage {
    pub page_number: u32,
    pub error: crate::errors::AppError,
}

/// Aggregated results for a whole document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentResult {
    /// Results for pages that were processed, in page order
    pub pages: Vec<PageResult>,
    /// All validated VINs across the document, in page order
    pub vins: Vec<ValidatedVin>,
    /// Pages that failed and are absent from `pages`
    pub skipped_pages: Vec<SkippedPage>,
    /// Number of pages handed to the pipeline
    pub total_pages: usize,
}

impl DocumentResult {
    pub fn page(&self, page_number: u32) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    pub fn has_vins(&self) -> bool {
        !self.vins.is_empty()
    }
}
