//! HTTP server for Neuro API game development.
//!
//! Serves a game directory over HTTP and, in watch mode, reloads every open
//! browser tab when a file in that directory changes:
//!
//! - Static files from the game directory
//! - `GET /$env/NEURO_SDK_WS_URL` so games can discover the SDK WebSocket
//! - `GET /__livereload` server-sent events stream (watch mode)
//! - Reload client injected into HTML pages (watch mode)
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use napi_ws_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         port: 8080,
//!         game_dir: PathBuf::from("game"),
//!         ws_url: Some("ws://localhost:8000".to_string()),
//!         watch: true,
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (napi-ws-server)
//!                        │
//!                        ├─► inject middleware (watch mode, HTML only)
//!                        │       │
//!                        │       ├─► /$env/NEURO_SDK_WS_URL
//!                        │       └─► static files (tower-http ServeDir)
//!                        │
//!                        └─► /__livereload (SSE, watch mode)
//!                                │
//!                                └─► BroadcastChannel ◄── ChangeWatcher ◄── notify
//! ```

mod app;
mod error;
mod handlers;
pub mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::ServerError;
pub use handlers::env::WS_URL_PATH;
pub use middleware::inject::{CLOSING_BODY, RELOAD_CLIENT_SCRIPT};
use state::AppState;

/// Environment variable holding the default WebSocket URL.
pub const WS_URL_ENV: &str = "NEURO_SDK_WS_URL";

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Game directory to serve (and watch in watch mode).
    pub game_dir: PathBuf,
    /// WebSocket URL for the Neuro SDK (`None` makes the lookup answer 404).
    pub ws_url: Option<String>,
    /// Games read the WebSocket URL from a query parameter; disables the lookup endpoint.
    pub use_query_param: bool,
    /// Enable watch mode (live reload).
    pub watch: bool,
    /// Coalescing window for file changes in milliseconds.
    pub debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            game_dir: PathBuf::from("game"),
            ws_url: None,
            use_query_param: false,
            watch: false,
            debounce_ms: live_reload::DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// A bound server, ready to serve.
///
/// Binding and serving are separate so callers can report the bound address
/// before blocking on [`serve`](Self::serve).
pub struct Server {
    listener: TcpListener,
    router: axum::Router,
    state: Arc<AppState>,
}

impl Server {
    /// Bind the listener and prepare the router.
    ///
    /// In watch mode this also starts watching the game directory, so it
    /// must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source,
            })?;

        let state = Arc::new(AppState::from_config(config));
        let router = app::create_router(Arc::clone(&state), config);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve requests until `shutdown` completes.
    ///
    /// On shutdown the watcher stops and every push connection is closed so
    /// open event streams don't hold the graceful shutdown open.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::clone(&self.state);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                state.shutdown();
            })
            .await?;

        self.state.shutdown();
        Ok(())
    }
}

/// Run the server until Ctrl-C.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let server = Server::bind(&config).await?;
    tracing::info!(address = %server.local_addr()?, "Starting server");

    server.serve(shutdown_signal()).await
}

/// Wait for shutdown signal (Ctrl-C).
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
