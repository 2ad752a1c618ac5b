//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types, structs, and enums used across
//! the preprocessing sub-modules.

use image::GrayImage;

use crate::errors::{AppError, AppResult};

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessingError {
    /// Page image has neither 1 nor 3 channels
    UnsupportedImageFormat { channels: u8 },
    /// Width or height is zero
    InvalidDimensions { width: u32, height: u32 },
    /// Pixel buffer length does not match width * height * channels
    BufferSizeMismatch { expected: usize, actual: usize },
    /// A filter parameter is out of range
    InvalidParameter { name: &'static str, message: String },
    /// Image processing operation failed
    ProcessingFailed { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::UnsupportedImageFormat { channels } => {
                write!(
                    f,
                    "Unsupported image format: {} channels (expected 1 or 3)",
                    channels
                )
            }
            PreprocessingError::InvalidDimensions { width, height } => {
                write!(f, "Invalid image dimensions: {}x{}", width, height)
            }
            PreprocessingError::BufferSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Pixel buffer size mismatch: expected {} bytes, got {}",
                    expected, actual
                )
            }
            PreprocessingError::InvalidParameter { name, message } => {
                write!(f, "Invalid preprocessing parameter {}: {}", name, message)
            }
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Fixed parameters of the normalization chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Linear contrast gain applied last
    pub contrast_alpha: f32,
    /// Linear contrast offset applied last
    pub contrast_beta: f32,
    /// Non-local means filter strength (h)
    pub denoise_strength: f32,
    /// Side of the square patch compared by the denoiser (odd)
    pub template_window: u32,
    /// Side of the square area searched for similar patches (odd)
    pub search_window: u32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            contrast_alpha: 1.5,
            contrast_beta: 0.0,
            denoise_strength: 3.0,
            template_window: 7,
            search_window: 21,
        }
    }
}

impl PreprocessingConfig {
    /// Validate preprocessing parameters
    pub fn validate(&self) -> AppResult<()> {
        if !(self.contrast_alpha.is_finite() && self.contrast_alpha > 0.0) {
            return Err(AppError::Config(format!(
                "contrast_alpha must be a positive number, got {}",
                self.contrast_alpha
            )));
        }
        if !self.contrast_beta.is_finite() {
            return Err(AppError::Config("contrast_beta must be finite".to_string()));
        }
        if !(self.denoise_strength > 0.0 && self.denoise_strength <= super::filtering::MAX_DENOISE_STRENGTH) {
            return Err(AppError::Config(format!(
                "denoise_strength must be in (0, {}], got {}",
                super::filtering::MAX_DENOISE_STRENGTH,
                self.denoise_strength
            )));
        }
        if self.template_window == 0 || self.template_window % 2 == 0 {
            return Err(AppError::Config(format!(
                "template_window must be odd, got {}",
                self.template_window
            )));
        }
        if self.search_window % 2 == 0 || self.search_window > super::filtering::MAX_SEARCH_WINDOW {
            return Err(AppError::Config(format!(
                "search_window must be odd and at most {}, got {}",
                super::filtering::MAX_SEARCH_WINDOW,
                self.search_window
            )));
        }
        if self.template_window > self.search_window {
            return Err(AppError::Config(format!(
                "template_window ({}) cannot exceed search_window ({})",
                self.template_window, self.search_window
            )));
        }
        Ok(())
    }
}

/// Result of image thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The thresholded binary image
    pub image: GrayImage,
    /// Optimal threshold value found by Otsu's method
    pub threshold: u8,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of image noise reduction operation.
#[derive(Debug, Clone)]
pub struct DenoisedImageResult {
    /// The denoised image
    pub image: GrayImage,
    /// Filter strength used for patch weighting
    pub strength: f32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
