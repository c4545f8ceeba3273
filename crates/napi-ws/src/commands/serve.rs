//! Serve command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use napi_ws_server::live_reload::DEFAULT_DEBOUNCE_MS;
use napi_ws_server::{Server, ServerConfig, WS_URL_ENV, shutdown_signal};

use crate::error::CliError;
use crate::output::Output;

/// Directory served when none is given, relative to the working directory.
const DEFAULT_GAME_DIR: &str = "game";

/// Arguments for serving a game directory.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Game directory to serve (default: ./game).
    #[arg(value_name = "GAME_DIRECTORY")]
    game_dir: Option<PathBuf>,

    /// Server port.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// WebSocket URL for Neuro SDK.
    #[arg(
        short = 'u',
        long = "ws-url",
        visible_alias = "websocket-url",
        env = WS_URL_ENV
    )]
    ws_url: Option<String>,

    /// Allow WebSocketURL query parameter.
    #[arg(short, long = "query-param", visible_alias = "use-query-param")]
    query_param: bool,

    /// Watch mode flag (for development).
    #[arg(short, long, visible_aliases = ["watch-mode", "hot-reload"])]
    watch: bool,

    /// Milliseconds to coalesce file changes for in watch mode.
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    debounce_ms: u64,
}

impl ServeArgs {
    /// Bind the server, print where it runs, and serve until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory cannot be read or the
    /// server fails to bind.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let cwd = std::env::current_dir()?;
        let config = self.server_config(&cwd);

        let server = Server::bind(&config).await?;
        let port = server.local_addr()?.port();

        output.link("Web server running on", &format!("http://localhost:{port}"));
        if self.game_dir.is_some() {
            output.info(&format!(
                "Serving game files from: {}",
                config.game_dir.display()
            ));
        } else {
            output.info("No directory provided, serving from default (game/)...");
        }
        if let Some(ws_url) = &config.ws_url {
            output.info(&format!("WebSocket URL: {ws_url}"));
        }
        if config.watch {
            output.notice("Hot reload enabled - watching directory for changes");
        }

        server.serve(shutdown_signal()).await?;
        Ok(())
    }

    /// Resolve arguments into a server configuration.
    ///
    /// A relative game directory is taken relative to `cwd`.
    fn server_config(&self, cwd: &Path) -> ServerConfig {
        let game_dir = cwd.join(
            self.game_dir
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_GAME_DIR)),
        );

        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            game_dir,
            ws_url: self.ws_url.clone(),
            use_query_param: self.query_param,
            watch: self.watch,
            debounce_ms: self.debounce_ms,
        }
    }
}
