//! # drawkit-core
//!
//! **Contracts and plumbing for talking to a verifiable random draw service.**
//!
//! The backend does the hard work: it harvests entropy, whitens it, seeds a
//! generator, draws numbers and runs a NIST SP 800-22 style battery over the
//! bits. This crate describes what goes over the wire and where it goes.
//!
//! ## Quick Start
//!
//! ```
//! use drawkit_core::{PageLocation, StreamConfig, build_stream_url};
//!
//! let page = PageLocation::parse("https://example.com/draw").unwrap();
//! let config = StreamConfig::new(page);
//! assert_eq!(
//!     build_stream_url(&config, "/ws/draw/123"),
//!     "wss://example.com/ws/draw/123"
//! );
//! ```
//!
//! ## Layout
//!
//! - [`net`]: stream origin resolution from the page location and an override
//! - [`draw`], [`audit`]: request/response records for draws and audits
//! - [`stream`], [`sse`]: live feed payloads and an incremental SSE decoder
//! - [`session`]: draw page state driven by the feed, plus a results log
//! - [`routes`]: page navigation with session-cached views

pub mod audit;
pub mod draw;
pub mod error;
pub mod net;
pub mod routes;
pub mod session;
pub mod sse;
pub mod stream;

/// JSON object with arbitrary fields.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

pub use audit::{
    AuditInput, AuditResult, NistReport, NistStartResponse, NistSummary, NistTestCase,
    normalize_bits,
};
pub use draw::{BitsResult, DrawConfig, DrawLive, DrawResult};
pub use error::ContractError;
pub use net::{
    LOCAL_BACKEND_PORT, PageLocation, StreamConfig, WS_BASE_ENV, build_stream_url,
    resolve_stream_origin, stream_scheme,
};
pub use routes::{
    Navigator, Page, Resolved, Route, RouteError, RouteTable, RouteTarget, ViewLoader,
};
pub use session::{DrawState, ResultsLog};
pub use sse::{SseDecoder, SseFrame};
pub use stream::{
    EventKind, LocSegment, StreamEvent, StreamMessage, ValidationError, ValidationIssue,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
