use std::time::Duration;

use drawkit_core::{ContractError, ValidationError};
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// The feed connection was not established in time.
    #[error("connection not established within {0:?}")]
    ConnectTimeout(Duration),

    /// Non-success status whose body is not a validation report.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// `422`-style rejection with per-field issues.
    #[error("backend rejected the request: {0}")]
    Validation(ValidationError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ClientError {
    /// HTTP status for errors that came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
