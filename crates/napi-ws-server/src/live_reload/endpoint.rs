//! Server-sent events endpoint for live reload.
//!
//! Browsers connect with `EventSource('/__livereload')` and receive a
//! `data: reload` event for every change under the game directory.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use tokio_stream::StreamExt;

use crate::state::AppState;

/// Path of the push endpoint.
pub const LIVE_RELOAD_PATH: &str = "/__livereload";

/// Handle `GET /__livereload`.
///
/// The response is returned before any event is produced, so the client sees
/// the headers immediately. The subscription lives inside the event stream
/// and unsubscribes when the connection drops the body. No keep-alive
/// comments are sent.
pub(crate) async fn sse_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(live_reload) = &state.live_reload else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let events = live_reload
        .subscribe()
        .into_stream()
        .map(|data| Ok::<_, Infallible>(Event::default().data(data)));

    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(events),
    )
        .into_response()
}
