//! # Text Recognizer Module
//!
//! This module hands normalized pages to Tesseract and returns the recognized
//! text. Two backends implement the [`TextRecognizer`] seam:
//!
//! - [`TesseractCli`] runs the `tesseract` executable on a temporary PNG and
//!   applies every configured option, including the engine mode.
//! - [`EmbeddedTesseract`] drives an in-process engine through leptess,
//!   reusing instances via [`OcrInstanceManager`].
//!
//! Neither backend retries. Any failure is returned as an [`OcrError`] and the
//! caller decides what to skip.

use std::io::Write;
use std::process::Command;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::instance_manager::OcrInstanceManager;
use crate::models::NormalizedImage;
use crate::ocr_config::{EngineMode, OcrBackend, OcrConfig};
use crate::ocr_errors::OcrError;

/// Text produced by one recognizer call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecognizedText {
    /// Cleaned text, one recognized line per line
    pub text: String,
    /// Engine mean word confidence (0-100), when the backend reports one
    pub mean_confidence: Option<f32>,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mean_confidence: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Something that can turn a normalized page into text.
///
/// Implementations are shared by reference across pages, so they must not
/// keep per-page state.
pub trait TextRecognizer: Send + Sync {
    /// Short backend name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Recognize the text on one page. An empty result is not an error.
    fn recognize(&self, image: &NormalizedImage) -> Result<RecognizedText, OcrError>;
}

/// Build the recognizer selected by `config.backend`.
pub fn build_recognizer(config: &OcrConfig) -> Box<dyn TextRecognizer> {
    match config.backend {
        OcrBackend::Embedded => Box::new(EmbeddedTesseract::new(config.clone())),
        OcrBackend::Cli => Box::new(TesseractCli::new(config.clone())),
    }
}

/// Trim every line and drop blank ones. Lines are never joined, so a VIN can
/// not be stitched together from fragments on adjacent lines.
///
/// ```
/// use vin_extractor::ocr::clean_recognized_text;
///
/// let cleaned = clean_recognized_text("  5YJSA1E13MF123456 \n\n  7SA \n");
/// assert_eq!(cleaned, "5YJSA1E13MF123456\n7SA");
/// ```
pub fn clean_recognized_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Recognizer backed by the `tesseract` command line tool
#[derive(Debug, Clone)]
pub struct TesseractCli {
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Arguments passed after the input image path
    fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            "stdout".to_string(),
            "-l".to_string(),
            self.config.languages.clone(),
            "--oem".to_string(),
            self.config.engine_mode.as_str().to_string(),
            "--psm".to_string(),
            self.config.psm_mode.as_str().to_string(),
            "--dpi".to_string(),
            self.config.source_dpi.to_string(),
        ];
        if let Some(dir) = &self.config.tessdata_dir {
            args.push("--tessdata-dir".to_string());
            args.push(dir.clone());
        }
        if let Some(whitelist) = &self.config.character_whitelist {
            args.push("-c".to_string());
            args.push(format!("tessedit_char_whitelist={whitelist}"));
        }
        args
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &'static str {
        OcrBackend::Cli.as_str()
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<RecognizedText, OcrError> {
        let start_time = std::time::Instant::now();

        let png = image
            .to_png_bytes()
            .map_err(|e| OcrError::ImageLoad(format!("Failed to encode page as PNG: {e}")))?;

        // Removed when dropped, on every return path.
        let mut tmp = tempfile::Builder::new()
            .prefix("vin-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::ImageLoad(format!("Failed to create temp file for OCR: {e}")))?;
        tmp.write_all(&png)
            .and_then(|_| tmp.flush())
            .map_err(|e| OcrError::ImageLoad(format!("Failed to write temp image for OCR: {e}")))?;

        let output = Command::new(&self.config.tesseract_cmd)
            .arg(tmp.path())
            .args(self.arguments())
            .output()
            .map_err(|e| {
                OcrError::EngineUnavailable(format!(
                    "Failed to run '{}' (is it installed?): {e}",
                    self.config.tesseract_cmd
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "tesseract exited with {} after {}ms",
                output.status,
                start_time.elapsed().as_millis()
            );
            return Err(OcrError::Extraction(format!(
                "tesseract failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = clean_recognized_text(&String::from_utf8_lossy(&output.stdout));

        info!(
            "OCR processing completed in {}ms, extracted {} characters",
            start_time.elapsed().as_millis(),
            text.len()
        );

        Ok(RecognizedText::new(text))
    }
}

/// Recognizer backed by an in-process Tesseract instance
pub struct EmbeddedTesseract {
    config: OcrConfig,
    instances: Arc<OcrInstanceManager>,
}

impl EmbeddedTesseract {
    pub fn new(config: OcrConfig) -> Self {
        Self::with_manager(config, Arc::new(OcrInstanceManager::new()))
    }

    /// Share an instance pool between several recognizers
    pub fn with_manager(config: OcrConfig, instances: Arc<OcrInstanceManager>) -> Self {
        // leptess always initializes with the default engine mode
        if config.engine_mode != EngineMode::Default {
            warn!(
                "Embedded OCR ignores engine mode {}; use the cli backend to apply it",
                config.engine_mode.as_str()
            );
        }
        Self { config, instances }
    }
}

impl TextRecognizer for EmbeddedTesseract {
    fn name(&self) -> &'static str {
        OcrBackend::Embedded.as_str()
    }

    fn recognize(&self, image: &NormalizedImage) -> Result<RecognizedText, OcrError> {
        let start_time = std::time::Instant::now();

        let png = image
            .to_png_bytes()
            .map_err(|e| OcrError::ImageLoad(format!("Failed to encode page as PNG: {e}")))?;

        let instance = self
            .instances
            .get_instance(&self.config)
            .map_err(|e| OcrError::Initialization(e.to_string()))?;

        let (raw_text, confidence) = {
            let mut tess = instance.lock();

            tess.set_image_from_mem(&png).map_err(|e| {
                OcrError::ImageLoad(format!("Failed to load image for OCR: {e}"))
            })?;
            tess.set_source_resolution(self.config.source_dpi as i32);

            let text = tess.get_utf8_text().map_err(|e| {
                OcrError::Extraction(format!("Failed to extract text from image: {e}"))
            })?;
            (text, tess.mean_text_conf())
        };

        let text = clean_recognized_text(&raw_text);
        debug!("Embedded OCR mean confidence: {}", confidence);

        info!(
            "OCR processing completed in {}ms, extracted {} characters",
            start_time.elapsed().as_millis(),
            text.len()
        );

        Ok(RecognizedText {
            text,
            // Tesseract reports -1 when nothing was recognized
            mean_confidence: (confidence >= 0).then_some(confidence as f32),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr_config::{EngineMode, PageSegMode};
    use image::GrayImage;

    #[test]
    fn test_clean_recognized_text_keeps_lines_apart() {
        let raw = "\n  5YJSA1E1\n3MF123456  \n\n";
        assert_eq!(clean_recognized_text(raw), "5YJSA1E1\n3MF123456");
        assert_eq!(clean_recognized_text("   \n\t\n"), "");
    }

    #[test]
    fn test_cli_arguments_carry_configuration() {
        let config = OcrConfig {
            psm_mode: PageSegMode::SingleLine,
            engine_mode: EngineMode::LstmOnly,
            tessdata_dir: Some("/opt/tessdata".to_string()),
            ..OcrConfig::default()
        };
        let args = TesseractCli::new(config).arguments();

        assert_eq!(args[0], "stdout");
        assert!(args.windows(2).any(|w| w[0] == "--oem" && w[1] == "1"));
        assert!(args.windows(2).any(|w| w[0] == "--psm" && w[1] == "7"));
        assert!(args.windows(2).any(|w| w[0] == "--tessdata-dir" && w[1] == "/opt/tessdata"));
        assert!(args
            .iter()
            .any(|a| a == "tessedit_char_whitelist=0123456789ABCDEFGHJKLMNPRSTUVWXYZ"));
    }

    #[test]
    fn test_cli_without_whitelist_omits_variable() {
        let config = OcrConfig {
            character_whitelist: None,
            ..OcrConfig::default()
        };
        let args = TesseractCli::new(config).arguments();
        assert!(!args.iter().any(|a| a == "-c"));
    }

    #[test]
    fn test_missing_executable_is_engine_unavailable() {
        let config = OcrConfig {
            tesseract_cmd: "/nonexistent/bin/tesseract-for-tests".to_string(),
            ..OcrConfig::default()
        };
        let image = NormalizedImage::new(GrayImage::from_pixel(8, 8, image::Luma([255])));

        let err = TesseractCli::new(config).recognize(&image).unwrap_err();

        assert!(matches!(err, OcrError::EngineUnavailable(_)));
    }

    #[test]
    fn test_build_recognizer_honours_backend() {
        let cli = build_recognizer(&OcrConfig::default());
        assert_eq!(cli.name(), "cli");

        let embedded = build_recognizer(&OcrConfig {
            backend: OcrBackend::Embedded,
            ..OcrConfig::default()
        });
        assert_eq!(embedded.name(), "embedded");
    }
}
