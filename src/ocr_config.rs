//! # OCR Configuration Module
//!
//! This module defines configuration structures for the text recognizer:
//! which backend to use, how Tesseract is invoked, and the restricted
//! alphabet it may recognize.

// Constants for OCR configuration
pub const DEFAULT_LANGUAGES: &str = "eng";
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";
pub const DEFAULT_SOURCE_DPI: u32 = 300;

/// The 33 characters a VIN may contain: digits and uppercase letters
/// other than I, O and Q.
pub const VIN_ALPHABET: &str = "0123456789ABCDEFGHJKLMNPRSTUVWXYZ";

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSegMode {
    /// Fully automatic page segmentation
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of text
    #[default]
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Find as much text as possible in no particular order
    SparseText = 11,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SparseText => "11",
        }
    }

    /// Parse the numeric form used on the Tesseract command line
    pub fn from_number(value: &str) -> Option<Self> {
        match value.trim() {
            "3" => Some(PageSegMode::Auto),
            "4" => Some(PageSegMode::SingleColumn),
            "6" => Some(PageSegMode::SingleBlock),
            "7" => Some(PageSegMode::SingleLine),
            "11" => Some(PageSegMode::SparseText),
            _ => None,
        }
    }
}

/// Tesseract OCR engine mode (`--oem`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Legacy character classifier only
    TesseractOnly = 0,
    /// LSTM neural network only
    LstmOnly = 1,
    /// Legacy and LSTM engines combined
    #[default]
    TesseractLstmCombined = 2,
    /// Whatever the installed traineddata supports
    Default = 3,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::TesseractOnly => "0",
            EngineMode::LstmOnly => "1",
            EngineMode::TesseractLstmCombined => "2",
            EngineMode::Default => "3",
        }
    }

    pub fn from_number(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(EngineMode::TesseractOnly),
            "1" => Some(EngineMode::LstmOnly),
            "2" => Some(EngineMode::TesseractLstmCombined),
            "3" => Some(EngineMode::Default),
            _ => None,
        }
    }
}

/// Which Tesseract integration recognizes the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrBackend {
    /// In-process Tesseract through leptess. Uses the engine mode the
    /// library initializes with; `engine_mode` is not applied.
    Embedded,
    /// The `tesseract` executable, invoked once per page
    #[default]
    Cli,
}

impl OcrBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackend::Embedded => "embedded",
            OcrBackend::Cli => "cli",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "embedded" | "leptess" => Some(OcrBackend::Embedded),
            "cli" | "tesseract" => Some(OcrBackend::Cli),
            _ => None,
        }
    }
}

/// Configuration structure for OCR processing
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    /// Recognition backend
    pub backend: OcrBackend,
    /// Path or name of the `tesseract` executable (CLI backend)
    pub tesseract_cmd: String,
    /// Directory holding traineddata files, `None` for the engine default
    pub tessdata_dir: Option<String>,
    /// OCR language codes (e.g., "eng")
    pub languages: String,
    /// Page segmentation mode for OCR
    pub psm_mode: PageSegMode,
    /// Recognition engine variant
    pub engine_mode: EngineMode,
    /// Characters the engine is allowed to produce
    pub character_whitelist: Option<String>,
    /// Resolution the pages were rasterized at, passed to the engine
    pub source_dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            tesseract_cmd: DEFAULT_TESSERACT_CMD.to_string(),
            tessdata_dir: None,
            languages: DEFAULT_LANGUAGES.to_string(),
            psm_mode: PageSegMode::default(),
            engine_mode: EngineMode::default(),
            character_whitelist: Some(VIN_ALPHABET.to_string()),
            source_dpi: DEFAULT_SOURCE_DPI,
        }
    }
}

impl OcrConfig {
    /// Validate OCR configuration parameters
    pub fn validate(&self) -> crate::errors::AppResult<()> {
        if self.languages.trim().is_empty() {
            return Err(crate::errors::AppError::Config(
                "languages cannot be empty".to_string(),
            ));
        }

        if self.backend == OcrBackend::Cli && self.tesseract_cmd.trim().is_empty() {
            return Err(crate::errors::AppError::Config(
                "tesseract_cmd cannot be empty when using the cli backend".to_string(),
            ));
        }

        if let Some(whitelist) = &self.character_whitelist {
            if whitelist.is_empty() {
                return Err(crate::errors::AppError::Config(
                    "character_whitelist cannot be empty; use None to disable it".to_string(),
                ));
            }
            if whitelist.chars().any(char::is_whitespace) {
                return Err(crate::errors::AppError::Config(
                    "character_whitelist cannot contain whitespace".to_string(),
                ));
            }
        }

        if !(70..=1200).contains(&self.source_dpi) {
            return Err(crate::errors::AppError::Config(format!(
                "source_dpi must be between 70 and 1200, got {}",
                self.source_dpi
            )));
        }

        Ok(())
    }
}
