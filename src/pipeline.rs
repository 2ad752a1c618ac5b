//! # Page Pipeline
//!
//! Sequences normalization, recognition, candidate extraction, checksum
//! validation and preview encoding for every page of a document.
//!
//! A page that fails at any step, including by panicking, is logged and
//! left out of the result; the remaining pages are still processed. Only a
//! document without any pages is an error for the caller.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::errors::error_logging::{log_page_error, log_recognition_error};
use crate::errors::{AppError, AppResult};
use crate::models::{DocumentResult, PageImage, PageResult, RejectedCandidate, SkippedPage, ValidatedVin};
use crate::observability;
use crate::ocr::{build_recognizer, TextRecognizer};
use crate::preprocessing::ImageNormalizer;
use crate::preview::PreviewEncoder;
use crate::text_processing::find_candidates;
use crate::validation::check_vin;

/// Orchestrates per-page VIN extraction.
///
/// Holds only immutable collaborators, so one pipeline can serve any number
/// of documents.
pub struct PagePipeline {
    normalizer: ImageNormalizer,
    recognizer: Box<dyn TextRecognizer>,
    preview: PreviewEncoder,
    placeholder_confidence: f64,
}

impl PagePipeline {
    /// Build a pipeline with the recognizer selected by `config.ocr`.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        Self::with_recognizer(config, build_recognizer(&config.ocr))
    }

    /// Build a pipeline around a caller-supplied recognizer.
    pub fn with_recognizer(config: &AppConfig, recognizer: Box<dyn TextRecognizer>) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: ImageNormalizer::new(config.preprocessing.clone()),
            recognizer,
            preview: PreviewEncoder::new(config.preview.max_dimension)?,
            placeholder_confidence: config.pipeline.placeholder_confidence,
        })
    }

    /// Process a single page.
    ///
    /// Returns a [`PageResult`] whose `vins` may be empty; that is the
    /// no-valid-VINs outcome, not an error.
    ///
    /// # Errors
    ///
    /// - `UnsupportedImageFormat` when the page is neither grayscale nor RGB
    /// - `RecognitionFailed` when the OCR engine fails
    /// - `Preview` when the thumbnail cannot be encoded
    pub fn normalize_and_extract(&self, page: &PageImage, page_number: u32) -> AppResult<PageResult> {
        let _page_span = observability::page_span(page_number).entered();

        let normalized = self.normalizer.normalize(page)?;

        let recognized = {
            let _ocr_span = observability::ocr_span("recognize").entered();
            let ocr_start = Instant::now();
            let result = self.recognizer.recognize(&normalized);
            let ocr_duration = ocr_start.elapsed();
            observability::record_ocr_metrics(self.recognizer.name(), result.is_ok(), ocr_duration);

            result.map_err(|err| {
                log_recognition_error(
                    &err,
                    "recognize",
                    self.recognizer.name(),
                    Some(normalized.dimensions()),
                    Some(ocr_duration),
                );
                AppError::from(err)
            })?
        };

        let candidates = find_candidates(&recognized.text);
        let mut vins = Vec::new();
        let mut rejected_candidates = Vec::new();
        for candidate in candidates.iter() {
            match check_vin(&candidate.value) {
                Ok(()) => vins.push(ValidatedVin {
                    page_number,
                    vin: candidate.value.clone(),
                    confidence: self.placeholder_confidence,
                }),
                Err(reason) => {
                    debug!(
                        "Rejected VIN candidate {} on page {}: {}",
                        candidate.value, page_number, reason
                    );
                    observability::record_checksum_failure(reason.reason());
                    rejected_candidates.push(RejectedCandidate {
                        candidate: candidate.value.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }
        observability::record_candidate_metrics(candidates.len(), vins.len());

        let preview = self.preview.encode(&normalized)?;

        Ok(PageResult {
            page_number,
            vins,
            preview,
            rejected_candidates,
            ocr_confidence: recognized.mean_confidence,
        })
    }

    /// Process every page of a document, in order.
    ///
    /// Page numbers are 1-based positions in `pages`. Failed pages end up in
    /// `skipped_pages` and contribute neither VINs nor a preview.
    ///
    /// # Errors
    ///
    /// `ConversionFailed` when `pages` is empty.
    pub fn process_document(&self, pages: &[PageImage]) -> AppResult<DocumentResult> {
        if pages.is_empty() {
            observability::record_document_metrics("failure", 0);
            return Err(AppError::ConversionFailed(
                "No pages could be extracted from the document".to_string(),
            ));
        }

        let _document_span = observability::document_span(pages.len()).entered();
        let start_time = Instant::now();
        let mut result = DocumentResult {
            total_pages: pages.len(),
            ..DocumentResult::default()
        };

        for (index, page) in pages.iter().enumerate() {
            let page_number = index as u32 + 1;
            let page_start = Instant::now();

            let outcome = catch_unwind(AssertUnwindSafe(|| self.normalize_and_extract(page, page_number)))
                .unwrap_or_else(|payload| {
                    Err(AppError::Internal(format!(
                        "Unexpected panic while processing page: {}",
                        panic_message(payload.as_ref())
                    )))
                });

            match outcome {
                Ok(page_result) => {
                    let label = if page_result.vins.is_empty() { "no_vins" } else { "vins_found" };
                    observability::record_page_metrics(label, page_start.elapsed());
                    info!(
                        page_number = page_number,
                        vins = page_result.vins.len(),
                        rejected = page_result.rejected_candidates.len(),
                        "Page processed in {}ms",
                        page_start.elapsed().as_millis()
                    );
                    result.vins.extend(page_result.vins.iter().cloned());
                    result.pages.push(page_result);
                }
                Err(error) => {
                    observability::record_page_metrics("skipped", page_start.elapsed());
                    log_page_error(&error, page_number, failure_stage(&error), Some(page_start.elapsed()));
                    result.skipped_pages.push(SkippedPage { page_number, error });
                }
            }
        }

        if result.pages.is_empty() {
            warn!("Every page of the document was skipped");
        }
        observability::record_document_metrics("success", pages.len());
        info!(
            "Document processed in {}ms: {} page(s), {} skipped, {} VIN(s)",
            start_time.elapsed().as_millis(),
            result.total_pages,
            result.skipped_pages.len(),
            result.vins.len()
        );

        Ok(result)
    }
}

/// Pipeline step a page error came from, for logs
fn failure_stage(error: &AppError) -> &'static str {
    match error {
        AppError::UnsupportedImageFormat(_) => "normalize",
        AppError::RecognitionFailed(_) => "recognize",
        AppError::Preview(_) => "preview",
        _ => "page",
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
