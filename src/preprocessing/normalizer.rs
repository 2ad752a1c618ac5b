//! # Page Normalizer
//!
//! Runs the fixed normalization chain that turns a rasterized page into an
//! OCR-ready image: grayscale, Otsu binarization, non-local means denoising,
//! then a linear contrast stretch.

use tracing::debug;

use super::color::to_grayscale;
use super::contrast::apply_linear_contrast;
use super::filtering::denoise_non_local_means;
use super::thresholding::apply_otsu_threshold;
use super::types::{PreprocessingConfig, PreprocessingError};
use crate::models::{NormalizedImage, PageImage};

/// Applies the normalization chain with a fixed set of parameters.
///
/// The normalizer holds no mutable state, so one instance can be shared by
/// every page of a document and the same input always yields the same output.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: PreprocessingConfig,
}

impl ImageNormalizer {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Normalize a page.
    ///
    /// # Errors
    ///
    /// `InvalidDimensions` for an empty page;
    /// `UnsupportedImageFormat` when the page has neither 1 nor 3 channels;
    /// `InvalidParameter` when the configured denoise parameters are out of range.
    pub fn normalize(&self, page: &PageImage) -> Result<NormalizedImage, PreprocessingError> {
        let start_time = std::time::Instant::now();

        let (width, height) = page.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessingError::InvalidDimensions { width, height });
        }

        let gray = to_grayscale(page)?;
        let thresholded = apply_otsu_threshold(&gray);
        let denoised = denoise_non_local_means(
            &thresholded.image,
            self.config.denoise_strength,
            self.config.template_window,
            self.config.search_window,
        )?;
        let contrasted = apply_linear_contrast(
            &denoised.image,
            self.config.contrast_alpha,
            self.config.contrast_beta,
        );

        debug!(
            target: "ocr_preprocessing",
            "Page normalized in {}ms: {}x{}, {} channel(s), otsu threshold {}",
            start_time.elapsed().as_millis(),
            page.width(),
            page.height(),
            page.channels(),
            thresholded.threshold
        );

        Ok(NormalizedImage::new(contrasted))
    }
}
