//! Logging configuration shared by the encoder binaries.

use std::collections::HashMap;
use thiserror::Error;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "encoder=info";

/// Errors raised while reading observability settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObservabilityConfigError {
    /// `LOG_FORMAT` holds something other than `text` or `json`.
    #[error("Invalid LOG_FORMAT: {0} (expected 'text' or 'json')")]
    InvalidLogFormat(String),
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive string (e.g. `encoder_control=debug`)
    pub log_filter: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Load from `RUST_LOG` and `LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns `ObservabilityConfigError::InvalidLogFormat` for an unknown format.
    pub fn from_env() -> Result<Self, ObservabilityConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load from a variable map (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ObservabilityConfigError::InvalidLogFormat` for an unknown format.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ObservabilityConfigError> {
        let log_filter = vars
            .get("RUST_LOG")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let json_logs = match vars.get("LOG_FORMAT").map(|v| v.to_ascii_lowercase()) {
            None => false,
            Some(format) if format == "text" || format.is_empty() => false,
            Some(format) if format == "json" => true,
            Some(other) => return Err(ObservabilityConfigError::InvalidLogFormat(other)),
        };

        Ok(Self {
            log_filter,
            json_logs,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ObservabilityConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, ObservabilityConfig::default());
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_rust_log_and_json_format() {
        let vars = HashMap::from([
            ("RUST_LOG".to_string(), "encoder_control=trace".to_string()),
            ("LOG_FORMAT".to_string(), "JSON".to_string()),
        ]);
        let config = ObservabilityConfig::from_vars(&vars).unwrap();
        assert_eq!(config.log_filter, "encoder_control=trace");
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let vars = HashMap::from([("LOG_FORMAT".to_string(), "xml".to_string())]);
        let err = ObservabilityConfig::from_vars(&vars).unwrap_err();
        assert_eq!(err, ObservabilityConfigError::InvalidLogFormat("xml".to_string()));
    }
}
