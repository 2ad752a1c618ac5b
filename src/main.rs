use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};
use vin_extractor::config::AppConfig;
use vin_extractor::errors::error_logging::log_config_error;
use vin_extractor::errors::{AppError, AppResult};
use vin_extractor::observability;
use vin_extractor::pipeline::PagePipeline;
use vin_extractor::rasterizer::PdfRasterizer;
use vin_extractor::response::ErrorResponse;
use vin_extractor::DocumentResult;

/// Extract check-digit validated VINs from a scanned PDF
#[derive(Parser, Debug)]
#[command(
    name = "vin-extractor",
    version,
    long_about = "Rasterizes every page, runs OCR under a VIN-only alphabet and prints \
                  the validated VINs with a preview per page as JSON on stdout. \
                  Logs go to stderr."
)]
struct Cli {
    /// PDF document to process
    input: PathBuf,

    /// Pretty-print the JSON response
    #[arg(long)]
    pretty: bool,

    /// Print a Prometheus metrics snapshot to stderr when done
    #[arg(long)]
    metrics: bool,
}

/// Load and validate configuration at startup
fn load_configuration() -> Result<AppConfig> {
    let config = AppConfig::from_env().map_err(|e| {
        log_config_error(&e, "environment", "load");
        anyhow::anyhow!("Configuration loading failed: {}. Please check your environment variables.", e)
    })?;

    config.validate().map_err(|e| {
        log_config_error(&e, "app_config", "validate");
        anyhow::anyhow!("Configuration validation failed: {}. Please check your configuration values.", e)
    })?;

    Ok(config)
}

/// Rasterize and process one document. Runs on a blocking thread.
fn extract_document(config: &AppConfig, pdf_bytes: &[u8]) -> AppResult<DocumentResult> {
    let pipeline = PagePipeline::new(config)?;
    let pages = PdfRasterizer::new(config.rasterizer.clone()).rasterize(pdf_bytes)?;
    pipeline.process_document(&pages)
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let mut config = load_configuration()?;
    if args.metrics {
        config.observability.enable_metrics_export = true;
    }

    let metrics_handle = observability::init_observability_with_config(&config.observability)?;
    info!("{}", config.summary());

    let outcome = match tokio::fs::read(&args.input).await {
        Ok(pdf_bytes) => {
            info!(path = %args.input.display(), size = pdf_bytes.len(), "Processing PDF document");
            let task_config = config.clone();
            tokio::task::spawn_blocking(move || extract_document(&task_config, &pdf_bytes))
                .await
                .unwrap_or_else(|e| Err(AppError::Internal(format!("Processing task failed: {e}"))))
        }
        Err(e) => Err(AppError::Validation(format!(
            "Failed to read '{}': {e}",
            args.input.display()
        ))),
    };

    let exit_code = match outcome {
        Ok(result) => {
            if !result.has_vins() {
                warn!(
                    pages = result.total_pages,
                    skipped = result.skipped_pages.len(),
                    "No valid VINs found in document"
                );
            }
            print_json(&result.to_response(), args.pretty)?;
            0
        }
        Err(err) => {
            error!(error = %err, code = err.code(), "Document processing failed");
            print_json(&ErrorResponse::from_error(&err), args.pretty)?;
            1
        }
    };

    if let Some(handle) = metrics_handle {
        if args.metrics {
            eprintln!("{}", handle.render());
        }
    }

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
