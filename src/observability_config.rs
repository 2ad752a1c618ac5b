//! # Observability Configuration
//!
//! Environment-specific settings for logging and metrics.

use crate::errors::{AppError, AppResult};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Observability configuration for different environments
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for this crate's targets
    pub log_level: String,
    /// Log output format: "json" or "pretty"; `None` picks by environment
    pub log_format: Option<String>,
    /// Whether to install the Prometheus metrics recorder
    pub enable_metrics_export: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            log_level: "info".to_string(),
            log_format: None,
            enable_metrics_export: true,
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration through an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: lookup("LOG_LEVEL")
                .map(|level| level.to_lowercase())
                .unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT").map(|format| format.to_lowercase()),
            enable_metrics_export: lookup("ENABLE_METRICS_EXPORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.enable_metrics_export),
        }
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Pretty output when asked for, or in development unless JSON is asked for
    pub fn use_pretty_logs(&self) -> bool {
        match self.log_format.as_deref() {
            Some("pretty") => true,
            Some(_) => false,
            None => self.is_development(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        if let Some(format) = &self.log_format {
            if format != "json" && format != "pretty" {
                return Err(AppError::Config(format!(
                    "Invalid log format '{}', expected json or pretty",
                    format
                )));
            }
        }

        Ok(())
    }
}

/// Environment-specific configuration presets
pub mod presets {
    use super::ObservabilityConfig;

    /// Development configuration with verbose pretty logs
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            ..Default::default()
        }
    }

    /// Production configuration with JSON logs
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            log_level: "info".to_string(),
            log_format: Some("json".to_string()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "production");
        assert_eq!(config.log_level, "info");
        assert!(config.enable_metrics_export);
        assert!(!config.use_pretty_logs());
    }

    #[test]
    fn test_json_logs_unless_development_or_asked() {
        let unset = ObservabilityConfig::from_lookup(|_| None);
        assert!(!unset.use_pretty_logs());

        let dev = ObservabilityConfig::from_lookup(|key| (key == "ENVIRONMENT").then(|| "development".to_string()));
        assert!(dev.use_pretty_logs());

        let asked = ObservabilityConfig::from_lookup(|key| (key == "LOG_FORMAT").then(|| "Pretty".to_string()));
        assert!(asked.use_pretty_logs());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
        config.log_level = "warn".to_string();

        config.log_format = Some("xml".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ENVIRONMENT", "production"),
            ("LOG_LEVEL", "DEBUG"),
            ("ENABLE_METRICS_EXPORT", "false"),
        ]);
        let config = ObservabilityConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert!(config.is_production());
        assert_eq!(config.log_level, "debug");
        assert!(!config.enable_metrics_export);
        assert!(!config.use_pretty_logs());
    }

    #[test]
    fn test_presets() {
        let dev = presets::development();
        assert!(dev.is_development());
        assert!(dev.use_pretty_logs());

        let prod = presets::production();
        assert!(prod.is_production());
        assert!(!prod.use_pretty_logs());
        assert!(prod.validate().is_ok());
    }
}
