pub mod audit;
pub mod draw;
pub mod proxy;
pub mod report;
pub mod routes;
pub mod url;

use drawkit_client::{Client, ClientConfig};
use drawkit_core::{PageLocation, StreamConfig};

use crate::BackendArgs;

/// Print `message` to stderr and exit with status 1.
pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

/// Client configuration from the environment, with flags taking precedence.
pub fn client_config(backend: &BackendArgs) -> Result<ClientConfig, String> {
    let location = PageLocation::parse(&backend.page)
        .map_err(|e| format!("invalid --page '{}': {e}", backend.page))?;

    let mut config = ClientConfig::from_env(location.clone());
    if let Some(api) = backend.api.as_deref() {
        config = ClientConfig::new(api, config.stream);
    }
    if let Some(origin) = backend.ws_base.as_deref() {
        config.stream = StreamConfig::new(location).with_override(origin);
    }
    Ok(config)
}

/// Build the backend client or exit.
pub fn make_client(backend: &BackendArgs) -> Client {
    let config = client_config(backend).unwrap_or_else(|e| fail(e));
    log::debug!(
        "api base {}, stream origin {}",
        config.api_base,
        drawkit_core::resolve_stream_origin(&config.stream)
    );
    Client::new(config).unwrap_or_else(|e| fail(format!("cannot build HTTP client: {e}")))
}

/// Runtime for the async client calls.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap_or_else(|e| fail(format!("cannot start runtime: {e}")))
}

/// Parse a comma-separated list of integers.
pub fn parse_numbers(list: &str) -> Result<Vec<i64>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| format!("'{s}' is not an integer"))
        })
        .collect()
}

/// One-line rendering of a feed payload for progress output.
pub fn compact(data: &drawkit_core::JsonMap) -> String {
    let text = serde_json::to_string(data).unwrap_or_default();
    if text.chars().count() > 96 {
        let head: String = text.chars().take(93).collect();
        format!("{head}...")
    } else {
        text
    }
}
