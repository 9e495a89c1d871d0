//! Local development server.
//!
//! Forwards everything under `/api` to the draw backend with the prefix
//! stripped, so a page served from `localhost:5173` can call `/api/draw` and
//! reach `http://localhost:8000/draw`. Other GETs are answered from the page
//! route table: `/` redirects to `/draw`, known pages describe themselves,
//! anything else is a 404.
//!
//! Requests are only served for allow-listed hosts (port ignored).

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Redirect, Response},
    routing::any,
};
use serde::Serialize;
use url::Url;

use drawkit_core::{RouteTable, RouteTarget};

/// Environment variable holding the backend origin to proxy to.
pub const HTTP_BASE_ENV: &str = "DRAWKIT_HTTP_BASE";

/// Backend origin used when nothing is configured.
pub const DEFAULT_TARGET: &str = "http://localhost:8000";

/// Prefix of proxied paths.
pub const API_PREFIX: &str = "/api";

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Hop-by-hop headers never forwarded in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Proxy settings, built once at startup.
///
/// Only loopback hosts are allowed by default; a public dev hostname such as
/// `hackathon48.ru` has to be added with [`ProxyConfig::allow_host`] (the CLI's
/// `--allow-host`). WebSocket upgrades under `/api` are not forwarded: feeds
/// connect to the stream origin directly.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Backend origin, no trailing slash.
    pub target: String,
    /// Hostnames allowed in the `Host` header.
    pub allowed_hosts: Vec<String>,
}

impl ProxyConfig {
    pub fn new(target: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(target)?;
        if parsed.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        Ok(Self {
            target: target.trim_end_matches('/').to_string(),
            allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        })
    }

    /// Target from `DRAWKIT_HTTP_BASE`, falling back to the local backend.
    pub fn from_env() -> Result<Self, url::ParseError> {
        let target = std::env::var(HTTP_BASE_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        Self::new(&target)
    }

    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    fn is_allowed(&self, host_header: &str) -> bool {
        let hostname = strip_port(host_header);
        self.allowed_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(hostname))
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [::1]:5173
        return rest.split(']').next().unwrap_or(rest);
    }
    host.rsplit_once(':').map_or(host, |(name, _)| name)
}

/// Map a proxied path (with query) to the backend path.
///
/// `/api/draw?x=1` → `/draw?x=1`, `/api` → `/`. Paths that merely share the
/// prefix (`/apiary`) are not proxied.
pub fn rewrite_api_path(path_and_query: &str) -> Option<String> {
    let rest = path_and_query.strip_prefix(API_PREFIX)?;
    if rest.is_empty() || rest.starts_with('?') {
        Some(format!("/{rest}"))
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

/// Shared server state.
struct AppState {
    config: ProxyConfig,
    http: reqwest::Client,
    routes: RouteTable,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn check_host(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("");
    if !state.config.is_allowed(host) {
        log::warn!("blocked request for host '{host}'");
        return error_response(
            StatusCode::FORBIDDEN,
            format!("Blocked request. Host '{host}' is not allowed."),
        );
    }
    next.run(req).await
}

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        let lower = name.as_str();
        if HOP_BY_HOP.contains(&lower) || lower == "host" || lower == "content-length" {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

async fn handle_proxy(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or(API_PREFIX);
    let Some(backend_path) = rewrite_api_path(path_and_query) else {
        return error_response(StatusCode::NOT_FOUND, "not an api path");
    };
    let url = format!("{}{backend_path}", state.config.target);

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::PAYLOAD_TOO_LARGE, e.to_string()),
    };

    let mut headers = HeaderMap::new();
    copy_headers(&parts.headers, &mut headers);

    log::debug!("proxy {} {path_and_query} -> {url}", parts.method);
    let upstream = state
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            log::warn!("backend unreachable at {url}: {e}");
            return error_response(StatusCode::BAD_GATEWAY, format!("backend unreachable: {e}"));
        }
    };

    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    copy_headers(upstream.headers(), &mut response_headers);
    // Streamed so event-stream responses flow through as they arrive.
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}

#[derive(Serialize)]
struct PageResponse {
    page: &'static str,
    path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirected_from: Option<String>,
}

async fn handle_page(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let path = req.uri().path();

    // A direct redirect route answers with a real redirect.
    let direct = state.routes.routes().iter().find(|r| r.path == path);
    if let Some(RouteTarget::Redirect(to)) = direct.map(|r| r.target) {
        return Redirect::temporary(to).into_response();
    }

    match state.routes.resolve(path) {
        Ok(resolved) => Json(PageResponse {
            page: resolved.page.name(),
            path: resolved.path,
            redirected_from: resolved.redirected_from,
        })
        .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let pages: Vec<_> = state
        .routes
        .routes()
        .iter()
        .map(|r| match r.target {
            RouteTarget::Page(page) => serde_json::json!({"path": r.path, "page": page.name()}),
            RouteTarget::Redirect(to) => serde_json::json!({"path": r.path, "redirect": to}),
        })
        .collect();
    Json(serde_json::json!({
        "name": "drawkit dev server",
        "version": drawkit_core::VERSION,
        "proxy": {
            "prefix": API_PREFIX,
            "target": state.config.target,
        },
        "allowed_hosts": state.config.allowed_hosts,
        "routes": pages,
    }))
}

/// Build the axum router.
pub fn build_router(config: ProxyConfig) -> Router {
    let state = Arc::new(AppState {
        config,
        http: reqwest::Client::new(),
        routes: RouteTable::default(),
    });

    Router::new()
        .route("/api", any(handle_proxy))
        .route("/api/{*rest}", any(handle_proxy))
        .route("/__drawkit", axum::routing::get(handle_index))
        .fallback(handle_page)
        .layer(middleware::from_fn_with_state(state.clone(), check_host))
        .with_state(state)
}

/// Run the dev server until the process is stopped.
pub async fn run_server(config: ProxyConfig, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(config);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("dev server listening on {addr}");
    axum::serve(listener, app).await
}
