//! # VIN Extractor
//!
//! Extracts manufacturer VINs from scanned PDF documents. Each rasterized page
//! is normalized for OCR, recognized with Tesseract under a VIN-only alphabet,
//! scanned for prefixed VIN candidates, and filtered through the ISO 3779
//! check-digit algorithm. Every processed page also yields a thumbnail preview
//! for operator review.

pub mod config;
pub mod errors;
pub mod instance_manager;
pub mod models;
pub mod observability;
pub mod observability_config;
pub mod ocr;
pub mod ocr_config;
pub mod ocr_errors;
pub mod pipeline;
pub mod preprocessing;
pub mod preview;
pub mod rasterizer;
pub mod response;
pub mod text_processing;
pub mod validation;

// Re-export types for easier access
pub use models::{DocumentResult, NormalizedImage, PageImage, PageOutcome, PageResult, ValidatedVin};
pub use pipeline::PagePipeline;
pub use validation::{check_vin, review_vin, validate_vin};
