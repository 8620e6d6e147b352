//! Encoder client configuration.
//!
//! Configuration is loaded from environment variables. The device password
//! is redacted in Debug output.

use crate::errors::EncoderError;
use crate::retry::{RetryPolicy, DEFAULT_MAX_RETRIES};
use crate::transport::{Credentials, HttpTransport};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default Basic auth user on the appliance.
pub const DEFAULT_USERNAME: &str = "root";

/// Default delay between 503 retries, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Encoder client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Device base URL, e.g. `http://192.168.1.50`.
    pub base_url: String,

    pub username: String,

    /// Basic auth password. `None` disables authentication.
    pub password: Option<SecretString>,

    pub max_retries: u32,

    pub retry_delay: Duration,

    /// Pause after each command (`SLEEP_AFTER_COMMAND`, ms). Zero disables it.
    pub settle_delay: Duration,

    /// Log every request at info level.
    pub log_requests: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field(
                "password",
                &self.password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("settle_delay", &self.settle_delay)
            .field("log_requests", &self.log_requests)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl ClientConfig {
    /// A config for `host` with every other setting at its default.
    pub fn new(host: &str) -> Self {
        Self {
            base_url: normalize_base_url(host),
            username: DEFAULT_USERNAME.to_string(),
            password: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            settle_delay: Duration::ZERO,
            log_requests: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let host = vars
            .get("ENCODER_HOST")
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("ENCODER_HOST".to_string()))?;

        let mut config = Self::new(host);

        if let Some(username) = vars.get("ENCODER_USERNAME") {
            config.username.clone_from(username);
        }

        config.password = vars
            .get("ENCODER_PASSWORD")
            .map(|p| SecretString::from(p.clone()));

        config.max_retries = parse_var(vars, "ENCODER_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES);

        config.retry_delay = Duration::from_millis(
            parse_var(vars, "ENCODER_RETRY_DELAY_MS")?.unwrap_or(DEFAULT_RETRY_DELAY_MS),
        );

        config.settle_delay =
            Duration::from_millis(parse_var(vars, "SLEEP_AFTER_COMMAND")?.unwrap_or(0));

        config.log_requests = match vars.get("ENCODER_LOG_REQUESTS").map(String::as_str) {
            None | Some("" | "0" | "false" | "no") => false,
            Some("1" | "true" | "yes") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue(format!(
                    "ENCODER_LOG_REQUESTS must be true or false, got '{other}'"
                )))
            }
        };

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    /// Build the HTTP transport this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns `EncoderError::Configuration` if the HTTP client cannot be built.
    pub fn transport(&self) -> Result<HttpTransport, EncoderError> {
        let mut transport = HttpTransport::new(self.base_url.clone())?
            .with_retry_policy(self.retry_policy())
            .with_settle_delay(self.settle_delay)
            .with_request_logging(self.log_requests);

        if let Some(password) = &self.password {
            transport = transport.with_credentials(Credentials {
                username: self.username.clone(),
                password: password.clone(),
            });
        }

        Ok(transport)
    }
}

/// A bare host or `host:port` gets `http://`; URLs keep their scheme.
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    vars.get(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                ConfigError::InvalidValue(format!("{name} must be a non-negative integer, got '{raw}'"))
            })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([("ENCODER_HOST".to_string(), "192.168.1.50".to_string())])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = ClientConfig::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.base_url, "http://192.168.1.50");
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert!(config.password.is_none());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.settle_delay, Duration::ZERO);
        assert!(!config.log_requests);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("ENCODER_HOST".to_string(), "https://encoder.lan/".to_string());
        vars.insert("ENCODER_USERNAME".to_string(), "admin".to_string());
        vars.insert("ENCODER_PASSWORD".to_string(), "edgeedge".to_string());
        vars.insert("ENCODER_MAX_RETRIES".to_string(), "2".to_string());
        vars.insert("ENCODER_RETRY_DELAY_MS".to_string(), "250".to_string());
        vars.insert("SLEEP_AFTER_COMMAND".to_string(), "500".to_string());
        vars.insert("ENCODER_LOG_REQUESTS".to_string(), "true".to_string());

        let config = ClientConfig::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.base_url, "https://encoder.lan");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.as_ref().unwrap().expose_secret(), "edgeedge");
        assert_eq!(config.retry_policy(), RetryPolicy::new(2, Duration::from_millis(250)));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
        assert!(config.log_requests);
    }

    #[test]
    fn test_from_vars_missing_host() {
        let result = ClientConfig::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "ENCODER_HOST"));
    }

    #[test]
    fn test_from_vars_invalid_number() {
        let mut vars = base_vars();
        vars.insert("ENCODER_MAX_RETRIES".to_string(), "many".to_string());

        let result = ClientConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("ENCODER_MAX_RETRIES")));
    }

    #[test]
    fn test_from_vars_invalid_bool() {
        let mut vars = base_vars();
        vars.insert("ENCODER_LOG_REQUESTS".to_string(), "maybe".to_string());
        assert!(ClientConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut vars = base_vars();
        vars.insert("ENCODER_PASSWORD".to_string(), "edgeedge".to_string());
        let config = ClientConfig::from_vars(&vars).unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("edgeedge"));
    }

    #[test]
    fn test_transport_uses_config() {
        let config = ClientConfig::new("10.0.0.9:8080");
        let transport = config.transport().unwrap();

        assert_eq!(transport.base_url(), "http://10.0.0.9:8080");
        assert_eq!(transport.retry_policy(), config.retry_policy());
    }
}
