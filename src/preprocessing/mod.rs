//! # Image Preprocessing Module
//!
//! This module turns rasterized pages into OCR-ready images.
//!
//! The module is organized into focused sub-modules:
//! - `color`: Grayscale conversion
//! - `thresholding`: Binary thresholding using Otsu's method
//! - `filtering`: Non-local means noise reduction
//! - `contrast`: Linear contrast stretch
//! - `normalizer`: The full chain behind a single entry point
//! - `types`: Shared types and error definitions

pub mod color;
pub mod contrast;
pub mod filtering;
pub mod normalizer;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{DenoisedImageResult, PreprocessingConfig, PreprocessingError, ThresholdedImageResult};

// Re-export main functions from sub-modules
pub use color::to_grayscale;
pub use contrast::apply_linear_contrast;
pub use filtering::denoise_non_local_means;
pub use normalizer::ImageNormalizer;
pub use thresholding::{apply_binary_threshold, apply_otsu_threshold};
