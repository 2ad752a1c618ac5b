//! # OCR Instance Manager Module
//!
//! This module provides thread-safe management of embedded Tesseract instances.
//! Creating an instance loads the language model, so instances are created
//! lazily and reused across pages.

use leptess::LepTess;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::ocr_config::OcrConfig;

/// Thread-safe pool of Tesseract instances
///
/// Instances are keyed by every setting applied at creation time (languages,
/// tessdata directory, segmentation mode and whitelist), so two configurations
/// never share an engine that was set up for the other.
///
/// # Instance Lifecycle
///
/// - Instances are created on the first request for a configuration
/// - Instances are reused for subsequent requests with the same configuration
/// - Instances persist until removed or the manager is dropped
pub struct OcrInstanceManager {
    instances: Mutex<HashMap<String, Arc<Mutex<LepTess>>>>,
}

impl OcrInstanceManager {
    /// Create a new OCR instance manager
    ///
    /// # Examples
    ///
    /// ```rust
    /// use vin_extractor::instance_manager::OcrInstanceManager;
    ///
    /// let manager = OcrInstanceManager::new();
    /// assert_eq!(manager.instance_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create an OCR instance for the given configuration
    ///
    /// # Errors
    ///
    /// Returns error if Tesseract cannot be initialized (missing traineddata,
    /// unknown language code) or rejects one of the configured variables.
    pub fn get_instance(&self, config: &OcrConfig) -> anyhow::Result<Arc<Mutex<LepTess>>> {
        let key = Self::instance_key(config);

        // Held across creation so concurrent callers never build the same
        // instance twice.
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(&key) {
            return Ok(Arc::clone(instance));
        }

        info!(
            "Creating new OCR instance for languages: {} (psm {}, tessdata: {})",
            config.languages,
            config.psm_mode.as_str(),
            config.tessdata_dir.as_deref().unwrap_or("default")
        );

        let mut tess = LepTess::new(config.tessdata_dir.as_deref(), &config.languages)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Tesseract OCR instance: {}", e))?;

        tess.set_variable(
            leptess::Variable::TesseditPagesegMode,
            config.psm_mode.as_str(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to set PSM mode: {}", e))?;

        if let Some(whitelist) = &config.character_whitelist {
            tess.set_variable(leptess::Variable::TesseditCharWhitelist, whitelist)
                .map_err(|e| anyhow::anyhow!("Failed to set character whitelist: {}", e))?;
            info!(
                "Configured Tesseract with character whitelist: {} characters",
                whitelist.len()
            );
        }

        let instance = Arc::new(Mutex::new(tess));
        instances.insert(key, Arc::clone(&instance));

        Ok(instance)
    }

    fn instance_key(config: &OcrConfig) -> String {
        format!(
            "{}:{}:{}:{}",
            config.languages,
            config.tessdata_dir.as_deref().unwrap_or(""),
            config.psm_mode.as_str(),
            config.character_whitelist.as_deref().unwrap_or("")
        )
    }

    /// Drop every cached instance
    pub fn clear(&self) {
        let mut instances = self.instances.lock();
        let count = instances.len();
        instances.clear();
        if count > 0 {
            info!("Cleared {count} OCR instances");
        }
    }

    /// Get the number of cached instances
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }
}

impl Default for OcrInstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr_config::PageSegMode;

    #[test]
    fn test_instance_key_separates_configurations() {
        let base = OcrConfig::default();
        let single_line = OcrConfig {
            psm_mode: PageSegMode::SingleLine,
            ..OcrConfig::default()
        };
        let no_whitelist = OcrConfig {
            character_whitelist: None,
            ..OcrConfig::default()
        };

        let key = OcrInstanceManager::instance_key(&base);
        assert_eq!(key, OcrInstanceManager::instance_key(&OcrConfig::default()));
        assert_ne!(key, OcrInstanceManager::instance_key(&single_line));
        assert_ne!(key, OcrInstanceManager::instance_key(&no_whitelist));
    }

    #[test]
    fn test_clear_on_empty_manager() {
        let manager = OcrInstanceManager::default();
        manager.clear();
        assert_eq!(manager.instance_count(), 0);
    }
}
