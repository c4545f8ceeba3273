//! Static file serving.
//!
//! Serves the game directory for every path no other route claims.
//! Directory requests resolve to their `index.html`.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Create the fallback router serving `game_dir`.
pub(crate) fn static_router(game_dir: &Path) -> Router<Arc<AppState>> {
    Router::new().fallback_service(ServeDir::new(game_dir))
}
