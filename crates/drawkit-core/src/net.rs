//! Stream origin resolution.
//!
//! Real-time connections (WebSocket, SSE) go to an origin derived from where the
//! page is served:
//!
//! 1. An explicit override (`DRAWKIT_WS_BASE`) wins outright.
//! 2. A loopback page (`localhost`, `127.0.0.1`) talks to the local backend on
//!    port 8000.
//! 3. Anything else talks to its own host.
//!
//! The scheme follows the page: `https:` pages use `wss`, everything else `ws`.
//!
//! Nothing here reads globals. Build a [`StreamConfig`] once at startup and pass
//! it around.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ContractError;

/// Environment variable holding the stream origin override.
pub const WS_BASE_ENV: &str = "DRAWKIT_WS_BASE";

/// Backend port used when the page is served from a loopback host.
pub const LOCAL_BACKEND_PORT: u16 = 8000;

const LOOPBACK_HOSTNAMES: &[&str] = &["localhost", "127.0.0.1"];

/// The parts of a page location the resolver cares about.
///
/// Field semantics follow the browser `Location` object: `protocol` keeps its
/// trailing colon (`"https:"`), `host` includes an explicit port when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub protocol: String,
    pub hostname: String,
    pub host: String,
}

impl PageLocation {
    pub fn new(
        protocol: impl Into<String>,
        hostname: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            host: host.into(),
        }
    }

    /// Build a location from a full page URL such as `https://example.com:8443/draw`.
    pub fn parse(page_url: &str) -> Result<Self, ContractError> {
        let url = Url::parse(page_url).map_err(|e| ContractError::InvalidUrl {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;
        let hostname = match url.host_str() {
            Some(h) => h.to_string(),
            None => {
                return Err(ContractError::InvalidUrl {
                    url: page_url.to_string(),
                    reason: "missing host".to_string(),
                });
            }
        };
        // `Url::port` is None for the scheme's default port, matching `Location.host`.
        let host = match url.port() {
            Some(port) => format!("{hostname}:{port}"),
            None => hostname.clone(),
        };
        Ok(Self {
            protocol: format!("{}:", url.scheme()),
            hostname,
            host,
        })
    }

    /// True when the page is served over TLS.
    pub fn is_secure(&self) -> bool {
        self.protocol == "https:"
    }

    /// True for the loopback names that route to the local backend.
    pub fn is_loopback(&self) -> bool {
        LOOPBACK_HOSTNAMES.contains(&self.hostname.as_str())
    }
}

/// Inputs to stream origin resolution, built once and passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Origin that replaces the derived one when set and non-empty.
    pub override_origin: Option<String>,
    pub location: PageLocation,
}

impl StreamConfig {
    pub fn new(location: PageLocation) -> Self {
        Self {
            override_origin: None,
            location,
        }
    }

    pub fn with_override(mut self, origin: impl Into<String>) -> Self {
        self.override_origin = Some(origin.into());
        self
    }

    /// Build a config for `location`, taking the override from `DRAWKIT_WS_BASE`.
    pub fn from_env(location: PageLocation) -> Self {
        let override_origin = std::env::var(WS_BASE_ENV).ok().filter(|v| !v.is_empty());
        Self {
            override_origin,
            location,
        }
    }

    fn active_override(&self) -> Option<&str> {
        self.override_origin.as_deref().filter(|o| !o.is_empty())
    }
}

/// Real-time scheme matching the page protocol.
pub fn stream_scheme(location: &PageLocation) -> &'static str {
    if location.is_secure() { "wss" } else { "ws" }
}

/// Compute the origin (scheme and authority, no trailing slash) for stream
/// connections. Never fails.
pub fn resolve_stream_origin(config: &StreamConfig) -> String {
    if let Some(origin) = config.active_override() {
        return origin.strip_suffix('/').unwrap_or(origin).to_string();
    }

    let scheme = stream_scheme(&config.location);
    if config.location.is_loopback() {
        format!("{scheme}://localhost:{LOCAL_BACKEND_PORT}")
    } else {
        format!("{scheme}://{}", config.location.host)
    }
}

/// Join `path` onto the resolved stream origin with exactly one separator.
///
/// `"foo"` and `"/foo"` produce the same URL.
pub fn build_stream_url(config: &StreamConfig, path: &str) -> String {
    let origin = resolve_stream_origin(config);
    let url = if path.starts_with('/') {
        format!("{origin}{path}")
    } else {
        format!("{origin}/{path}")
    };
    log::debug!("stream url resolved: {url}");
    url
}
