//! # Document Response
//!
//! JSON shapes handed back to callers: the per-document success response
//! and the error object returned on total failure.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::{DocumentResult, ValidatedVin};

/// Preview of one processed page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImage {
    pub page_number: u32,
    /// `data:image/png;base64,...`
    pub image: String,
}

/// A page that was skipped and why
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageError {
    pub page_number: u32,
    pub error: String,
}

/// Successful extraction response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub success: bool,
    pub vins: Vec<ValidatedVin>,
    pub processed_images: Vec<ProcessedImage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PageError>,
}

/// Response body when no result can be produced at all
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn from_error(error: &AppError) -> Self {
        Self {
            message: error.to_string(),
            error: error.code().to_string(),
        }
    }
}

impl DocumentResult {
    /// Convert into the wire response. Pages without VINs still contribute
    /// their preview; skipped pages contribute only an entry in `errors`.
    pub fn to_response(&self) -> DocumentResponse {
        DocumentResponse {
            success: true,
            vins: self.vins.clone(),
            processed_images: self
                .pages
                .iter()
                .map(|page| ProcessedImage {
                    page_number: page.page_number,
                    image: page.preview.clone(),
                })
                .collect(),
            errors: self
                .skipped_pages
                .iter()
                .map(|skipped| PageError {
                    page_number: skipped.page_number,
                    error: skipped.error.to_string(),
                })
                .collect(),
        }
    }
}
