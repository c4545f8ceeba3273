//! Error types for the HTTP server.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No WebSocket URL was given on the command line or in the environment.
    #[error("NEURO_SDK_WS_URL not configured")]
    WsUrlNotConfigured,

    /// The listener could not be bound (port in use, permission denied).
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::WsUrlNotConfigured => StatusCode::NOT_FOUND,
            Self::Bind { .. } | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
