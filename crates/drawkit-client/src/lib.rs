//! Async client for the draw backend.
//!
//! JSON calls go to `api_base`; WebSocket feeds go to the origin resolved from
//! the [`StreamConfig`]; SSE feeds are plain GETs under `api_base`.
//!
//! ```no_run
//! # async fn demo() -> Result<(), drawkit_client::ClientError> {
//! use drawkit_client::{Client, ClientConfig, endpoints};
//! use drawkit_core::{DrawConfig, PageLocation, StreamConfig};
//! use futures::StreamExt;
//!
//! let page = PageLocation::parse("http://localhost:5173/").unwrap();
//! let client = Client::new(ClientConfig::new("http://localhost:8000", StreamConfig::new(page)))?;
//!
//! let job = client.start_draw(&DrawConfig::new(vec!["clock_jitter".into()], 4096, 6, 49)).await?;
//! let mut feed = client.stream_ws(&endpoints::draw_ws(&job.job_id)).await?;
//! while let Some(message) = feed.next().await {
//!     println!("{:?}", message?);
//! }
//! let result = client.draw_result(&job.job_id).await?;
//! println!("{:?}", result.draw);
//! # Ok(())
//! # }
//! ```

pub mod endpoints;
pub mod error;
pub mod feed;

use std::time::Duration;

use drawkit_core::{
    AuditInput, AuditResult, BitsResult, DrawConfig, DrawResult, NistReport, NistStartResponse,
    PageLocation, StreamConfig, ValidationError, build_stream_url,
};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::ClientError;
pub use feed::MessageStream;

/// Environment variable holding the HTTP API base.
pub const HTTP_BASE_ENV: &str = "DRAWKIT_HTTP_BASE";

/// API base used when nothing is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for JSON calls and SSE feeds, without trailing slash.
    pub api_base: String,
    pub stream: StreamConfig,
    /// Per-request timeout for JSON calls and for opening feeds. An open feed
    /// may run for as long as the job does.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>, stream: StreamConfig) -> Self {
        let api_base: String = api_base.into();
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            stream,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `DRAWKIT_HTTP_BASE` (or the local default) plus `DRAWKIT_WS_BASE`.
    pub fn from_env(location: PageLocation) -> Self {
        let api_base = std::env::var(HTTP_BASE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        Self::new(api_base, StreamConfig::from_env(location))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .user_agent(concat!("drawkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.api_base)
        } else {
            format!("{}/{path}", self.config.api_base)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        log::debug!("GET {url}");
        let response = self
            .http
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await?;
        decode(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(body)
            .send()
            .await?;
        decode(response).await
    }

    /// Start a draw job. The returned `job_id` addresses its feed and result.
    pub async fn start_draw(&self, config: &DrawConfig) -> Result<NistStartResponse, ClientError> {
        self.post_json(endpoints::START_DRAW, config).await
    }

    pub async fn draw_result(&self, job_id: &str) -> Result<DrawResult, ClientError> {
        self.get_json(&endpoints::draw_result(job_id)).await
    }

    pub async fn draw_bits(&self, job_id: &str) -> Result<BitsResult, ClientError> {
        self.get_json(&endpoints::draw_bits(job_id)).await
    }

    /// Run a synchronous audit.
    ///
    /// The input is sent as-is; an input with both or neither field set is the
    /// backend's to reject.
    pub async fn audit(&self, input: &AuditInput) -> Result<AuditResult, ClientError> {
        if !input.is_well_formed() {
            log::warn!("audit input should carry exactly one of sequence_bits/numbers");
        }
        self.post_json(endpoints::AUDIT, input).await
    }

    /// Start an asynchronous NIST audit job.
    pub async fn start_nist(&self, input: &AuditInput) -> Result<NistStartResponse, ClientError> {
        if !input.is_well_formed() {
            log::warn!("audit input should carry exactly one of sequence_bits/numbers");
        }
        self.post_json(endpoints::START_NIST, input).await
    }

    pub async fn nist_report(&self, job_id: &str) -> Result<NistReport, ClientError> {
        self.get_json(&endpoints::nist_report(job_id)).await
    }

    /// Full WebSocket URL for a feed path.
    pub fn stream_url(&self, path: &str) -> String {
        build_stream_url(&self.config.stream, path)
    }

    /// Open a WebSocket feed; `path` is resolved against the stream origin.
    ///
    /// The handshake is bounded by the configured timeout.
    pub async fn stream_ws(&self, path: &str) -> Result<MessageStream, ClientError> {
        feed::connect_ws(&self.stream_url(path), self.config.timeout).await
    }

    /// Open an SSE feed under the API base.
    pub async fn stream_sse(&self, path: &str) -> Result<MessageStream, ClientError> {
        let url = self.url(path);
        log::debug!("GET {url} (event-stream)");
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(feed::sse_messages(response))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            log::debug!("could not read {status} response body: {e}");
            String::new()
        }
    };
    Err(status_error(status, body))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    let value = serde_json::from_slice(&bytes).map_err(drawkit_core::ContractError::from)?;
    Ok(value)
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::BAD_REQUEST {
        let parsed = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| ValidationError::from_value(&v));
        if let Some(err) = parsed {
            return ClientError::Validation(err);
        }
    }
    ClientError::Status {
        status: status.as_u16(),
        body,
    }
}
