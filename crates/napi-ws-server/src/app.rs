//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::ServerConfig;
use crate::handlers;
use crate::live_reload;
use crate::middleware::inject;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `config` - Server configuration (game directory, query-parameter mode)
pub(crate) fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let mut router = Router::new();

    // Games that accept the URL as a query parameter don't need the lookup
    if !config.use_query_param {
        router = router.route(
            handlers::env::WS_URL_PATH,
            get(handlers::env::get_ws_url),
        );
    }

    // Static files for everything else
    router = router.merge(static_files::static_router(&config.game_dir));

    if state.live_reload_enabled() {
        // Routes above get the reload client injected. The push endpoint is
        // added afterwards so its event stream is never buffered.
        router = router
            .layer(middleware::from_fn(inject::inject_reload_client))
            .route(live_reload::LIVE_RELOAD_PATH, get(live_reload::sse_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use axum::body::{Body, Bytes};
    use axum::http::{HeaderMap, Request, StatusCode, header};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;
    use tower::ServiceExt;

    /// Wire form of one reload event.
    const RELOAD_FRAME: &str = "data: reload\n\n";

    const INDEX: &str = "<!DOCTYPE html>\n<html><body><canvas id=\"game\"></canvas></body></html>\n";

    fn game_dir() -> TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), INDEX).unwrap();
        std::fs::write(
            temp_dir.path().join("data.json"),
            r#"{"template":"</body>"}"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("partial.html"), "<div>no body</div>").unwrap();
        temp_dir
    }

    fn config(game_dir: &Path, watch: bool) -> ServerConfig {
        ServerConfig {
            game_dir: game_dir.to_path_buf(),
            watch,
            ws_url: Some("ws://localhost:8000".to_owned()),
            ..ServerConfig::default()
        }
    }

    fn build(config: &ServerConfig) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::from_config(config));
        (create_router(Arc::clone(&state), config), state)
    }

    async fn get_response(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        let response = get_response(router, uri).await;
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body)
    }

    fn content_length(headers: &HeaderMap) -> usize {
        headers[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_gets_reload_client_in_watch_mode() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), true));

        let (status, headers, body) = get_body(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .contains("text/html")
        );
        let body = std::str::from_utf8(&body).unwrap();
        assert_eq!(body.matches("EventSource('/__livereload')").count(), 1);
        assert!(body.contains("</script>\n</body>"));
        assert_eq!(content_length(&headers), body.len());
    }

    #[tokio::test]
    async fn test_non_html_untouched_in_watch_mode() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), true));

        let (status, headers, body) = get_body(router, "/data.json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], br#"{"template":"</body>"}"#);
        assert_eq!(content_length(&headers), body.len());
    }

    #[tokio::test]
    async fn test_html_without_body_tag_untouched() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), true));

        let (_, headers, body) = get_body(router, "/partial.html").await;

        assert_eq!(&body[..], b"<div>no body</div>");
        assert_eq!(content_length(&headers), 18);
    }

    #[tokio::test]
    async fn test_index_untouched_without_watch_mode() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), false));

        let (status, headers, body) = get_body(router, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], INDEX.as_bytes());
        assert_eq!(content_length(&headers), INDEX.len());
    }

    #[tokio::test]
    async fn test_push_endpoint_absent_without_watch_mode() {
        let dir = game_dir();
        let (router, state) = build(&config(dir.path(), false));

        let response = get_response(router, "/__livereload").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(state.live_reload.is_none());
    }

    #[tokio::test]
    async fn test_push_endpoint_headers() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), true));

        let response = get_response(router, "/__livereload").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
    }

    #[tokio::test]
    async fn test_push_endpoint_streams_reload_frames() {
        let dir = game_dir();
        let (router, state) = build(&config(dir.path(), true));
        let channel = state.live_reload.as_ref().unwrap().channel().clone();

        let response = get_response(router, "/__livereload").await;
        let mut frames = response.into_body().into_data_stream();
        assert_eq!(channel.len(), 1);

        assert_eq!(channel.broadcast(), 1);
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], RELOAD_FRAME.as_bytes());

        drop(frames);
        assert!(channel.is_empty());
        assert_eq!(channel.broadcast(), 0);
    }

    #[tokio::test]
    async fn test_push_endpoint_every_client_gets_one_frame() {
        let dir = game_dir();
        let (router, state) = build(&config(dir.path(), true));
        let channel = state.live_reload.as_ref().unwrap().channel().clone();

        let mut streams = Vec::new();
        for _ in 0..3 {
            let response = get_response(router.clone(), "/__livereload").await;
            streams.push(response.into_body().into_data_stream());
        }
        let gone = get_response(router, "/__livereload").await;
        drop(gone);

        assert_eq!(channel.broadcast(), 3);
        state.shutdown();

        for mut stream in streams {
            assert_eq!(
                &stream.next().await.unwrap().unwrap()[..],
                RELOAD_FRAME.as_bytes()
            );
            assert!(stream.next().await.is_none());
        }
    }

    #[tokio::test]
    async fn test_ws_url_endpoint() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), false));

        let (status, headers, body) = get_body(router, "/$env/NEURO_SDK_WS_URL").await;

        assert_eq!(status, StatusCode::OK);
        assert!(
            headers[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        assert_eq!(&body[..], b"ws://localhost:8000");
    }

    #[tokio::test]
    async fn test_ws_url_endpoint_unconfigured() {
        let dir = game_dir();
        let config = ServerConfig {
            ws_url: None,
            ..config(dir.path(), false)
        };
        let (router, _state) = build(&config);

        let (status, _, body) = get_body(router, "/$env/NEURO_SDK_WS_URL").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(&body[..], b"NEURO_SDK_WS_URL not configured");
    }

    #[tokio::test]
    async fn test_ws_url_endpoint_absent_in_query_param_mode() {
        let dir = game_dir();
        let config = ServerConfig {
            use_query_param: true,
            ..config(dir.path(), false)
        };
        let (router, _state) = build(&config);

        let (status, _, body) = get_body(router, "/$env/NEURO_SDK_WS_URL").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let dir = game_dir();
        let (router, _state) = build(&config(dir.path(), true));

        let (status, _, _) = get_body(router, "/missing.js").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_watch_mode_with_missing_game_dir_still_serves_push_endpoint() {
        let dir = game_dir();
        let (router, _state) = build(&config(&dir.path().join("missing"), true));

        let response = get_response(router, "/__livereload").await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
