//! car2db-mcp: MCP server for the Car2DB vehicle specification API
//!
//! Serves the Car2DB tools over stdio (default) or HTTP/SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use car2db_mcp::api::ApiClient;
use car2db_mcp::config::{self, Config, TransportMode};
use car2db_mcp::mcp::server::McpServer;
use car2db_mcp::mcp::sse;

/// MCP server for the Car2DB vehicle specification API.
///
/// Exposes vehicle makes, models, generations, series, trims and equipment
/// as tools for AI assistants.
#[derive(Parser, Debug)]
#[command(name = "car2db-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Car2DB API key
    #[arg(long, env = "CAR2DB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Response language sent as Accept-Language
    #[arg(long, env = "CAR2DB_LANGUAGE")]
    language: Option<String>,

    /// Transport to serve: stdio or sse
    #[arg(long, env = "MCP_TRANSPORT")]
    transport: Option<TransportMode>,

    /// Port for the SSE transport
    #[arg(long, env = "MCP_SSE_PORT")]
    port: Option<u16>,
}

impl Args {
    /// Applies command-line and environment overrides on top of the file.
    fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(ref key) = self.api_key {
            cfg.api.api_key = Some(key.clone());
        }
        if let Some(ref language) = self.language {
            cfg.api.language.clone_from(language);
        }
        if let Some(mode) = self.transport {
            cfg.transport.mode = mode;
        }
        if let Some(port) = self.port {
            cfg.transport.sse_port = port;
        }
    }
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries MCP messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, initiating graceful shutdown"),
                    _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, initiating graceful shutdown");
    }
}

/// Runs the selected transport to completion.
async fn serve(cfg: &Config, client: Arc<ApiClient>) -> std::io::Result<()> {
    match cfg.transport.mode {
        TransportMode::Stdio => {
            let server = McpServer::new(client);
            info!("MCP server ready, waiting for client connection...");
            server.run().await
        }
        TransportMode::Sse => {
            let addr = SocketAddr::from(([0, 0, 0, 0], cfg.transport.sse_port));
            let listener = tokio::net::TcpListener::bind(addr).await?;
            sse::serve(listener, client, shutdown_signal()).await
        }
    }
}

/// Entry point for the car2db-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    args.apply_overrides(&mut cfg);
    if let Err(e) = cfg.validate() {
        eprintln!("Configuration error: {e}");
        return ExitCode::FAILURE;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    if cfg.api.uses_demo_key() {
        eprintln!("Warning: no API key configured, using the limited demo key.");
        eprintln!("Set CAR2DB_API_KEY or pass --api-key. Get a key at https://car2db.com/api/");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = %cfg.transport.mode,
        language = %cfg.api.language,
        "Starting car2db-mcp server"
    );

    let client = match ApiClient::new(cfg.api.client_config()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!(error = %e, "Failed to create API client");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(&cfg, client)) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn overrides_take_precedence() {
        let args = Args::parse_from([
            "car2db-mcp",
            "--api-key",
            "cli-key",
            "--language",
            "pl-PL",
            "--transport",
            "sse",
            "--port",
            "9000",
        ]);
        let mut cfg = Config::default();
        args.apply_overrides(&mut cfg);

        assert_eq!(cfg.api.api_key(), Some("cli-key"));
        assert_eq!(cfg.api.language, "pl-PL");
        assert_eq!(cfg.transport.mode, TransportMode::Sse);
        assert_eq!(cfg.transport.sse_port, 9000);
    }

    #[test]
    fn log_level_flags() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
        assert_eq!(get_log_level(5, false, "warn"), Level::TRACE);
    }
}
