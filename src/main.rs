//! CNPJ registry API entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cnpj_api::api::{create_router, AppState, TracingErrorSink};
use cnpj_api::config::Config;
use cnpj_api::metrics;
use cnpj_api::storage::MemoryStorage;
use cnpj_api::utils::shutdown_signal;

/// Read-only JSON API over the CNPJ company registry.
#[derive(Parser, Debug)]
#[command(name = "cnpj-api")]
#[command(about = "Serve company lookups and searches over a CNPJ registry snapshot")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// JSON snapshot to serve (overrides DATA_PATH).
    #[arg(short, long)]
    data: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// JSON snapshot to serve (overrides DATA_PATH).
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration (the log filter reads RUST_LOG from it)
    let config = Config::load()?;

    // Initialize logging
    let filter = EnvFilter::try_new(config.log_directive(args.verbose))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Serve { port, data }) => cmd_serve(config, port, data).await,
        None => cmd_serve(config, args.port, args.data).await,
    }
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration Summary:");
    println!("  Port: {}", config.port);
    println!(
        "  Allowed Host: {}",
        config.allowed_host().unwrap_or("(any)")
    );
    println!(
        "  Data Path: {}",
        config.data_path.as_deref().unwrap_or("(none)")
    );
    println!("  Health Timeout: {}ms", config.health_timeout_ms);
    println!("  Docs URL: {}", config.docs_url);
    match config.metrics_port {
        Some(p) => println!("  Metrics Port: {}", p),
        None => println!("  Metrics Port: (disabled)"),
    }
    println!("CONFIGURATION CHECK PASSED");

    Ok(())
}

/// Serve the HTTP API until a shutdown signal arrives.
async fn cmd_serve(
    mut config: Config,
    port_override: Option<u16>,
    data_override: Option<String>,
) -> anyhow::Result<()> {
    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }
    if data_override.is_some() {
        config.data_path = data_override;
    }

    if let Some(metrics_port) = config.metrics_port {
        metrics::install_exporter(SocketAddr::from(([0, 0, 0, 0], metrics_port)))?;
    }

    let storage = match &config.data_path {
        Some(path) => MemoryStorage::from_path(path)?,
        None => {
            warn!("No DATA_PATH configured, serving an empty registry");
            MemoryStorage::new()
        }
    };

    match config.allowed_host() {
        Some(host) => info!("Only serving requests for host {}", host),
        None => info!("Host check disabled"),
    }

    let state = AppState::from_config(&config, Arc::new(storage), Arc::new(TracingErrorSink));
    let router = create_router(state);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Serving at http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
