//! Command transport for the device's CGI interface.
//!
//! Every command is a `GET /command/<module>.cgi?<params>`. The device
//! answers 503 while it is busy applying an earlier command; those are
//! retried by the transport's [`RetryPolicy`]. Any other non-success status
//! fails the command at once.
//!
//! # Security
//!
//! - Credentials are sent as HTTP Basic auth and held as `SecretString`
//! - Certificate validation is disabled: the appliance ships a self-signed
//!   certificate and is addressed by IP

pub mod mock;

use crate::errors::{EncoderError, Result};
use crate::params::ParameterSet;
use crate::retry::RetryPolicy;
use crate::types::CgiModule;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Basic auth credentials for the device.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Relative request path for a module command, e.g.
/// `video.cgi?EncVidCodec1=h264`. An empty set yields the bare module path.
pub fn command_path(module: CgiModule, params: &ParameterSet) -> String {
    if params.is_empty() {
        module.path()
    } else {
        format!("{}?{}", module.path(), params.to_query())
    }
}

/// Delivers commands to the device.
#[async_trait::async_trait]
pub trait CommandTransport: Send + Sync {
    /// Apply a parameter set to a CGI module.
    ///
    /// # Errors
    ///
    /// Same as [`CommandTransport::get`].
    async fn send(&self, module: CgiModule, params: &ParameterSet) -> Result<String> {
        self.get(&command_path(module, params)).await
    }

    /// GET a path relative to `/command/` and return the response body.
    ///
    /// # Errors
    ///
    /// - `EncoderError::CommandFailed` on a non-success, non-503 status
    /// - `EncoderError::MaxRetriesExceeded` when the device stays busy
    /// - `EncoderError::Http` when the device cannot be reached
    async fn get(&self, path: &str) -> Result<String>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    credentials: Option<Credentials>,
    retry: RetryPolicy,
    settle_delay: Option<Duration>,
    log_requests: bool,
}

impl HttpTransport {
    /// Create a transport for the device at `base_url`
    /// (e.g. `http://192.168.1.50`).
    ///
    /// # Errors
    ///
    /// Returns `EncoderError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // No request timeout: the device can take several seconds to apply
        // a pipeline change. Callers bound the wait instead.
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| EncoderError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            retry: RetryPolicy::default(),
            settle_delay: None,
            log_requests: false,
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pause after every successful `send`, giving the device time to
    /// settle before the next command.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Log each request at info instead of debug.
    #[must_use]
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    async fn get_once(&self, url: &str, path: &str) -> Result<String> {
        if self.log_requests {
            info!(target: "encoder.transport", path = %path, "GET");
        } else {
            debug!(target: "encoder.transport", path = %path, "GET");
        }

        let mut request = self.client.get(url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(creds.password.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            debug!(target: "encoder.transport", path = %path, error = %e, "Request failed");
            EncoderError::Http(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EncoderError::Http(e.to_string()))?;

        if status.is_success() || status.is_redirection() {
            Ok(body)
        } else {
            Err(EncoderError::CommandFailed {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait::async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, module: CgiModule, params: &ParameterSet) -> Result<String> {
        let body = self.get(&command_path(module, params)).await?;

        if let Some(delay) = self.settle_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}/command/{}", self.base_url, path);
        self.retry
            .run(path, || self.get_once(&url, path), EncoderError::is_retryable)
            .await
    }
}
