//! # Unified Application Configuration
//!
//! This module gathers every setting of the extractor into a single
//! structured object. Executable paths and tuning parameters travel inside
//! this object to the components that need them; nothing is read from
//! process-wide state after startup.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::ocr_config::{EngineMode, OcrBackend, OcrConfig, PageSegMode};
use crate::preprocessing::PreprocessingConfig;
use std::str::FromStr;

/// Preview thumbnail settings
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewConfig {
    /// Side of the square bounding box thumbnails must fit in
    pub max_dimension: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_dimension: crate::preview::DEFAULT_MAX_DIMENSION,
        }
    }
}

impl PreviewConfig {
    /// Validate preview configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.max_dimension == 0 {
            return Err(AppError::Config("Preview max dimension cannot be 0".to_string()));
        }
        if self.max_dimension > 4096 {
            return Err(AppError::Config(
                "Preview max dimension cannot be greater than 4096".to_string(),
            ));
        }
        Ok(())
    }
}

/// PDF rasterization settings
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizerConfig {
    /// Path or name of the `pdftocairo` executable
    pub pdftocairo_cmd: String,
    /// Path or name of the `pdfinfo` executable
    pub pdfinfo_cmd: String,
    /// Render resolution in dots per inch
    pub dpi: u32,
    /// Largest accepted PDF, in bytes
    pub max_document_bytes: usize,
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self {
            pdftocairo_cmd: "pdftocairo".to_string(),
            pdfinfo_cmd: "pdfinfo".to_string(),
            dpi: 300,
            max_document_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl RasterizerConfig {
    /// Validate rasterizer configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.pdftocairo_cmd.trim().is_empty() {
            return Err(AppError::Config("pdftocairo command cannot be empty".to_string()));
        }
        if self.pdfinfo_cmd.trim().is_empty() {
            return Err(AppError::Config("pdfinfo command cannot be empty".to_string()));
        }
        if !(72..=1200).contains(&self.dpi) {
            return Err(AppError::Config(format!(
                "Raster DPI must be between 72 and 1200, got {}",
                self.dpi
            )));
        }
        if self.max_document_bytes == 0 {
            return Err(AppError::Config("Max document size cannot be 0".to_string()));
        }
        Ok(())
    }
}

/// Page pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Confidence attached to every validated VIN. A fixed placeholder, not
    /// derived from the OCR engine.
    pub placeholder_confidence: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            placeholder_confidence: 0.95,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline configuration
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.placeholder_confidence) {
            return Err(AppError::Config(format!(
                "Placeholder confidence must be between 0 and 1, got {}",
                self.placeholder_confidence
            )));
        }
        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    /// OCR processing configuration
    pub ocr: OcrConfig,
    /// Image normalization parameters
    pub preprocessing: PreprocessingConfig,
    /// Preview thumbnail configuration
    pub preview: PreviewConfig,
    /// PDF rasterization configuration
    pub rasterizer: RasterizerConfig,
    /// Page pipeline configuration
    pub pipeline: PipelineConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable source. Unset
    /// variables keep their defaults; malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = Self::default();

        // OCR configuration
        if let Some(backend) = lookup("OCR_BACKEND") {
            config.ocr.backend = OcrBackend::parse(&backend).ok_or_else(|| {
                AppError::Config(format!("OCR_BACKEND must be 'cli' or 'embedded', got '{backend}'"))
            })?;
        }
        if let Some(cmd) = lookup("TESSERACT_CMD") {
            config.ocr.tesseract_cmd = cmd;
        }
        config.ocr.tessdata_dir = lookup("TESSDATA_DIR").or(config.ocr.tessdata_dir);
        if let Some(languages) = lookup("OCR_LANGUAGES") {
            config.ocr.languages = languages;
        }
        if let Some(psm) = lookup("OCR_PSM") {
            config.ocr.psm_mode = PageSegMode::from_number(&psm)
                .ok_or_else(|| AppError::Config(format!("OCR_PSM '{psm}' is not a supported mode")))?;
        }
        if let Some(oem) = lookup("OCR_OEM") {
            config.ocr.engine_mode = EngineMode::from_number(&oem)
                .ok_or_else(|| AppError::Config(format!("OCR_OEM '{oem}' must be 0-3")))?;
        }
        config.ocr.source_dpi = parse_var(&lookup, "OCR_SOURCE_DPI", config.ocr.source_dpi)?;

        // Normalization parameters
        config.preprocessing.contrast_alpha =
            parse_var(&lookup, "CONTRAST_ALPHA", config.preprocessing.contrast_alpha)?;
        config.preprocessing.contrast_beta =
            parse_var(&lookup, "CONTRAST_BETA", config.preprocessing.contrast_beta)?;
        config.preprocessing.denoise_strength =
            parse_var(&lookup, "DENOISE_STRENGTH", config.preprocessing.denoise_strength)?;
        config.preprocessing.template_window =
            parse_var(&lookup, "DENOISE_TEMPLATE_WINDOW", config.preprocessing.template_window)?;
        config.preprocessing.search_window =
            parse_var(&lookup, "DENOISE_SEARCH_WINDOW", config.preprocessing.search_window)?;

        config.preview.max_dimension =
            parse_var(&lookup, "PREVIEW_MAX_DIMENSION", config.preview.max_dimension)?;

        // Rasterizer configuration
        if let Some(cmd) = lookup("PDFTOCAIRO_CMD") {
            config.rasterizer.pdftocairo_cmd = cmd;
        }
        if let Some(cmd) = lookup("PDFINFO_CMD") {
            config.rasterizer.pdfinfo_cmd = cmd;
        }
        config.rasterizer.dpi = parse_var(&lookup, "RASTER_DPI", config.rasterizer.dpi)?;
        config.rasterizer.max_document_bytes =
            parse_var(&lookup, "MAX_DOCUMENT_BYTES", config.rasterizer.max_document_bytes)?;

        config.pipeline.placeholder_confidence = parse_var(
            &lookup,
            "PLACEHOLDER_CONFIDENCE",
            config.pipeline.placeholder_confidence,
        )?;

        config.observability = ObservabilityConfig::from_lookup(&lookup);

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.ocr.validate()?;
        self.preprocessing.validate()?;
        self.preview.validate()?;
        self.rasterizer.validate()?;
        self.pipeline.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: ocr_backend={}, ocr_languages={}, psm={}, oem={}, raster_dpi={}, preview_max={}, denoise_h={}, metrics_enabled={}",
            self.ocr.backend.as_str(),
            self.ocr.languages,
            self.ocr.psm_mode.as_str(),
            self.ocr.engine_mode.as_str(),
            self.rasterizer.dpi,
            self.preview.max_dimension,
            self.preprocessing.denoise_strength,
            self.observability.enable_metrics_export
        )
    }
}

/// Parse `key` when it is set, keep `default` otherwise.
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a valid number, got '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.placeholder_confidence, 0.95);
        assert_eq!(config.rasterizer.dpi, 300);
        assert_eq!(config.preview.max_dimension, 300);
    }

    #[test]
    fn test_from_lookup_without_variables_is_default() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OCR_BACKEND", "embedded"),
            ("OCR_PSM", "7"),
            ("OCR_OEM", "1"),
            ("TESSERACT_CMD", "/opt/bin/tesseract"),
            ("RASTER_DPI", "200"),
            ("PREVIEW_MAX_DIMENSION", "150"),
            ("PDFTOCAIRO_CMD", "/usr/local/bin/pdftocairo"),
        ]))
        .unwrap();

        assert_eq!(config.ocr.backend, OcrBackend::Embedded);
        assert_eq!(config.ocr.psm_mode, PageSegMode::SingleLine);
        assert_eq!(config.ocr.engine_mode, EngineMode::LstmOnly);
        assert_eq!(config.ocr.tesseract_cmd, "/opt/bin/tesseract");
        assert_eq!(config.rasterizer.dpi, 200);
        assert_eq!(config.preview.max_dimension, 150);
        assert_eq!(config.rasterizer.pdftocairo_cmd, "/usr/local/bin/pdftocairo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_rejects_malformed_values() {
        assert!(AppConfig::from_lookup(lookup_from(&[("RASTER_DPI", "high")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("OCR_OEM", "9")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("OCR_BACKEND", "gpu")])).is_err());
    }

    #[test]
    #[allow(unused_assignments)]
    fn test_section_validation() {
        let mut rasterizer = RasterizerConfig::default();
        rasterizer.dpi = 10;
        assert!(rasterizer.validate().is_err());
        rasterizer.dpi = 300;
        rasterizer.pdfinfo_cmd = " ".to_string();
        assert!(rasterizer.validate().is_err());

        let pipeline = PipelineConfig {
            placeholder_confidence: 1.5,
        };
        assert!(pipeline.validate().is_err());

        let preview = PreviewConfig { max_dimension: 0 };
        assert!(preview.validate().is_err());
    }

    #[test]
    fn test_summary_mentions_backend() {
        let summary = AppConfig::default().summary();
        assert!(summary.contains("ocr_backend=cli"));
        assert!(summary.contains("oem=2"));
    }
}
