//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - A Prometheus metrics recorder whose snapshot can be rendered on demand
//! - Span constructors for documents, pages and OCR calls
//! - Metric recording helpers used by the page pipeline

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Initialize logging and, when enabled, the metrics recorder.
///
/// Returns the handle used to render a metrics snapshot, or `None` when
/// metrics export is disabled. Must be called at most once per process.
pub fn init_observability_with_config(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing_with_config(config)?;

    let metrics_handle = if config.enable_metrics_export {
        Some(init_metrics_with_config(config)?)
    } else {
        None
    };

    tracing::info!(
        environment = %config.environment,
        metrics_enabled = %config.enable_metrics_export,
        "Observability stack initialized successfully"
    );
    Ok(metrics_handle)
}

/// Initialize structured logging with tracing and configuration
fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("vin_extractor={}", config.log_level).parse()?);

    // Logs go to stderr; stdout carries the JSON response
    if config.use_pretty_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus recorder as the global metrics recorder
fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Suffix("duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
        )?
        .install_recorder()?;

    tracing::info!(
        environment = %config.environment,
        "Metrics collection initialized"
    );
    Ok(handle)
}

/// Create a span covering one document
pub fn document_span(page_count: usize) -> tracing::Span {
    tracing::info_span!("document", page_count = page_count, component = "pipeline")
}

/// Create a span covering one page
pub fn page_span(page_number: u32) -> tracing::Span {
    tracing::info_span!("page", page_number = page_number, component = "pipeline")
}

/// Create a span for OCR operations
pub fn ocr_span(operation: &str) -> tracing::Span {
    tracing::info_span!("ocr_operation", operation = operation, component = "ocr")
}

/// Record the outcome of one page: "vins_found", "no_vins" or "skipped"
pub fn record_page_metrics(result: &'static str, duration: std::time::Duration) {
    metrics::counter!("pages_processed_total", "result" => result).increment(1);
    metrics::histogram!("page_duration_seconds").record(duration.as_secs_f64());
}

/// Record OCR operation metrics
pub fn record_ocr_metrics(backend: &'static str, success: bool, duration: std::time::Duration) {
    metrics::counter!(
        "ocr_operations_total",
        "backend" => backend,
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
    metrics::histogram!("ocr_duration_seconds").record(duration.as_secs_f64());
}

/// Record how many candidates a page produced and how many were accepted
pub fn record_candidate_metrics(candidates: usize, validated: usize) {
    metrics::counter!("vin_candidates_total").increment(candidates as u64);
    metrics::counter!("vins_validated_total").increment(validated as u64);
}

/// Record a candidate rejected by the checksum validator
pub fn record_checksum_failure(reason: &'static str) {
    metrics::counter!("vin_checksum_failures_total", "reason" => reason).increment(1);
}

/// Record the outcome of a whole document: "success" or "failure"
pub fn record_document_metrics(result: &'static str, pages: usize) {
    metrics::counter!("documents_processed_total", "result" => result).increment(1);
    metrics::histogram!("document_pages").record(pages as f64);
}
