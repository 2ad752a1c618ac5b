//! # OCR Error Types Module
//!
//! This module defines the error type returned by text recognizer backends.
//! Every variant is a recognition failure: the page pipeline treats any of
//! them as fatal for the current page only.

/// Custom error types for OCR operations
#[derive(Debug, Clone, PartialEq)]
pub enum OcrError {
    /// OCR engine initialization errors (missing tessdata, bad language)
    Initialization(String),
    /// The external engine could not be started
    EngineUnavailable(String),
    /// Image could not be handed to the engine
    ImageLoad(String),
    /// Text extraction errors
    Extraction(String),
}

impl std::fmt::Display for OcrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrError::Initialization(msg) => write!(f, "[OCR_INIT] OCR engine initialization failed: {}", msg),
            OcrError::EngineUnavailable(msg) => write!(f, "[OCR_UNAVAILABLE] OCR engine could not be started: {}", msg),
            OcrError::ImageLoad(msg) => write!(f, "[IMAGE_LOAD] Failed to load image for OCR processing: {}", msg),
            OcrError::Extraction(msg) => write!(f, "[OCR_EXTRACT] Text extraction from image failed: {}", msg),
        }
    }
}

impl std::error::Error for OcrError {}
