//! Mock encoder device for integration tests.
//!
//! Provides `MockDevice`, a `wiremock` server that answers
//! `/command/<module>.cgi` requests and records what it received.

use encoder_control::retry::RetryPolicy;
use encoder_control::transport::{Credentials, HttpTransport};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Retry delay used by harness transports, short enough to keep tests fast.
pub const TEST_RETRY_DELAY: Duration = Duration::from_millis(20);

/// A command the mock device received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    /// CGI module without the `.cgi` suffix, e.g. `av_input`.
    pub module: String,
    /// Query parameters, in request order.
    pub params: Vec<(String, String)>,
}

impl RecordedCommand {
    /// Value of the first parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameter names, in request order.
    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Wiremock-backed encoder device.
///
/// # Example
/// ```rust,ignore
/// let device = MockDevice::start().await;
/// device.respond_busy("video.cgi", 2).await;
/// device.accept_all().await;
/// ```
pub struct MockDevice {
    server: MockServer,
}

impl MockDevice {
    /// Start a device on a random local port. No routes are mounted.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// A transport pointed at this device with a fast retry policy.
    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(self.uri())
            .expect("HTTP client should build")
            .with_retry_policy(RetryPolicy::new(5, TEST_RETRY_DELAY))
    }

    /// Like [`MockDevice::transport`], with Basic auth credentials.
    pub fn transport_with_credentials(&self, username: &str, password: &str) -> HttpTransport {
        self.transport().with_credentials(Credentials {
            username: username.to_string(),
            password: password.to_string().into(),
        })
    }

    /// Answer every command with 200 and an empty body.
    pub async fn accept_all(&self) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/command/[a-z_]+\.cgi$"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.server)
            .await;
    }

    /// Answer the first `times` requests to `cgi` (e.g. `video.cgi`) with 503.
    ///
    /// Takes precedence over [`MockDevice::accept_all`] regardless of mount
    /// order.
    pub async fn respond_busy(&self, cgi: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/command/{cgi}")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(times)
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer requests to `cgi` with `status` and `body`.
    pub async fn respond_with_status(&self, cgi: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/command/{cgi}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// Answer `inquiry.cgi` with the given declaration text.
    pub async fn respond_inquiry(&self, body: &str) {
        self.respond_with_status("inquiry.cgi", 200, body).await;
    }

    /// Every command received so far, in arrival order.
    pub async fn received_commands(&self) -> Vec<RecordedCommand> {
        let requests = self
            .server
            .received_requests()
            .await
            .expect("request recording is enabled");

        requests
            .iter()
            .map(|request| {
                let module = request
                    .url
                    .path()
                    .trim_start_matches("/command/")
                    .trim_end_matches(".cgi")
                    .to_string();
                let params = request
                    .url
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                RecordedCommand { module, params }
            })
            .collect()
    }

    /// Commands received for one module.
    pub async fn commands_for(&self, module: &str) -> Vec<RecordedCommand> {
        self.received_commands()
            .await
            .into_iter()
            .filter(|c| c.module == module)
            .collect()
    }
}
