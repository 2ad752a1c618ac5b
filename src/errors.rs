//! # Application Error Types
//!
//! This module defines the crate-level error type. Layer-specific errors
//! (preprocessing, OCR, preview) are lifted into [`AppError`] so the page
//! pipeline can classify every per-page failure.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Input validation errors (oversized or non-PDF uploads)
    Validation(String),
    /// Page image has a channel count the normalizer cannot handle
    UnsupportedImageFormat(String),
    /// OCR engine unavailable or failed on a page
    RecognitionFailed(String),
    /// Upstream PDF rasterization failed
    ConversionFailed(String),
    /// The rasterizer could not determine how many pages the PDF has
    PageCountUnavailable(String),
    /// Preview thumbnail could not be produced
    Preview(String),
    /// Internal application errors
    Internal(String),
}

impl AppError {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "INVALID_INPUT",
            AppError::UnsupportedImageFormat(_) => "UNSUPPORTED_IMAGE_FORMAT",
            AppError::RecognitionFailed(_) => "RECOGNITION_FAILED",
            AppError::ConversionFailed(_) => "CONVERSION_FAILED",
            AppError::PageCountUnavailable(_) => "PAGE_COUNT_UNAVAILABLE",
            AppError::Preview(_) => "PREVIEW_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::UnsupportedImageFormat(msg) => write!(f, "[IMAGE_FORMAT] {}", msg),
            AppError::RecognitionFailed(msg) => write!(f, "[OCR] {}", msg),
            AppError::ConversionFailed(msg) => write!(f, "[CONVERSION] {}", msg),
            AppError::PageCountUnavailable(msg) => write!(f, "[PAGE_COUNT] {}", msg),
            AppError::Preview(msg) => write!(f, "[PREVIEW] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<crate::ocr_errors::OcrError> for AppError {
    fn from(err: crate::ocr_errors::OcrError) -> Self {
        AppError::RecognitionFailed(err.to_string())
    }
}

impl From<crate::preprocessing::PreprocessingError> for AppError {
    fn from(err: crate::preprocessing::PreprocessingError) -> Self {
        match err {
            crate::preprocessing::PreprocessingError::UnsupportedImageFormat { .. } => {
                AppError::UnsupportedImageFormat(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<crate::preview::PreviewError> for AppError {
    fn from(err: crate::preview::PreviewError) -> Self {
        AppError::Preview(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use tracing::error;

    /// Log a page that was skipped by the pipeline
    pub fn log_page_error(
        error: &impl std::fmt::Display,
        page_number: u32,
        stage: &str,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            page_number = %page_number,
            stage = %stage,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "Page processing failed, page skipped"
        );
    }

    /// Log OCR processing errors with image and processing context
    pub fn log_recognition_error(
        error: &impl std::fmt::Display,
        operation: &str,
        backend: &str,
        image_dimensions: Option<(u32, u32)>,
        processing_duration: Option<std::time::Duration>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            backend = %backend,
            image_dimensions = ?image_dimensions,
            processing_duration_ms = ?processing_duration.map(|d| d.as_millis()),
            "OCR processing failed"
        );
    }

    /// Log PDF rasterization errors with document context
    pub fn log_conversion_error(
        error: &impl std::fmt::Display,
        operation: &str,
        document_size: Option<usize>,
        command: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            document_size_bytes = ?document_size,
            command = ?command,
            "PDF conversion failed"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr_errors::OcrError;
    use crate::preprocessing::PreprocessingError;

    #[test]
    fn test_unsupported_channels_lift_to_unsupported_image_format() {
        let err: AppError = PreprocessingError::UnsupportedImageFormat { channels: 2 }.into();
        assert!(matches!(err, AppError::UnsupportedImageFormat(_)));
        assert_eq!(err.code(), "UNSUPPORTED_IMAGE_FORMAT");
        assert!(err.to_string().contains("2"));
    }

    #[test]
    fn test_ocr_errors_lift_to_recognition_failed() {
        let err: AppError = OcrError::Initialization("no tessdata".to_string()).into();
        assert!(matches!(err, AppError::RecognitionFailed(_)));
        assert!(err.to_string().starts_with("[OCR]"));
    }

    #[test]
    fn test_conversion_errors_are_distinguishable() {
        let conversion = AppError::ConversionFailed("pdftocairo exited 1".to_string());
        let page_count = AppError::PageCountUnavailable("no Pages line".to_string());
        assert_ne!(conversion.code(), page_count.code());
        assert_eq!(conversion.code(), "CONVERSION_FAILED");
    }
}
