//! Neuro API Web Server CLI.
//!
//! Serves a game directory for local development. With `--watch`, every open
//! page reloads when a file in the directory changes.

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::ServeArgs;
use error::CliError;
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

const AFTER_HELP: &str = "\
Environment Variables:
  NEURO_SDK_WS_URL              WebSocket URL (can be overridden by --ws-url)

Examples:
  napi-ws
  napi-ws -p 3000
  napi-ws ./dist --ws-url ws://localhost:8000
  napi-ws ./my-game -p 8080";

/// Neuro API Web Server.
#[derive(Parser)]
#[command(name = "napi-ws", about, after_help = AFTER_HELP)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    /// Show version number.
    #[arg(short = 'v', long)]
    version: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let output = Output::new();
    output.title(&format!("Neuro API Web Server v{VERSION}"));

    // RUST_LOG overrides; file change notices are logged at INFO
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(cli.serve) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Failed to start server: {err}"));
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_version() {
    println!("v{VERSION}");
}

/// Run the server on a single-threaded runtime.
fn run(args: ServeArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(args.execute())
}
