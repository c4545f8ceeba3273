//! Environment lookup endpoint.
//!
//! Lets games fetch the Neuro SDK WebSocket URL from the server instead of
//! reading it from a query parameter.

use std::sync::Arc;

use axum::extract::State;

use crate::error::ServerError;
use crate::state::AppState;

/// Path of the WebSocket URL lookup.
pub const WS_URL_PATH: &str = "/$env/NEURO_SDK_WS_URL";

/// Handle GET /$env/NEURO_SDK_WS_URL.
pub(crate) async fn get_ws_url(State(state): State<Arc<AppState>>) -> Result<String, ServerError> {
    state.ws_url.clone().ok_or(ServerError::WsUrlNotConfigured)
}
