//! Application state.
//!
//! Shared state for all request handlers.

use crate::ServerConfig;
use crate::live_reload::LiveReloadManager;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// WebSocket URL served by the environment endpoint.
    pub(crate) ws_url: Option<String>,
    /// Live reload manager (watch mode only).
    pub(crate) live_reload: Option<LiveReloadManager>,
}

impl AppState {
    /// Build the state for `config`, starting the watcher in watch mode.
    ///
    /// Must be called from within a tokio runtime when watch mode is on.
    pub(crate) fn from_config(config: &ServerConfig) -> Self {
        let live_reload = config.watch.then(|| {
            let mut manager = LiveReloadManager::new(config.game_dir.clone())
                .with_debounce_ms(config.debounce_ms);
            manager.start();
            manager
        });

        Self {
            ws_url: config.ws_url.clone(),
            live_reload,
        }
    }

    /// Check if watch mode is enabled.
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.live_reload.is_some()
    }

    /// Stop watching and close all push connections.
    pub(crate) fn shutdown(&self) {
        if let Some(live_reload) = &self.live_reload {
            live_reload.shutdown();
        }
    }
}
