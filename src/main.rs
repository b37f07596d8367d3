//! ESPCN image upscaling service.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────────┐
//!                 │                        UPSCALER                           │
//!                 │                                                           │
//!  POST /upscale  │  ┌─────────┐   ┌──────────┐   ┌────────────┐              │
//!  ───────────────┼─▶│  http   │──▶│ imaging  │──▶│  superres  │              │
//!                 │  │ upload  │   │ decode,  │   │ graph exec │              │
//!                 │  └─────────┘   │ RGB→BGR  │   │ (blocking) │              │
//!                 │                └──────────┘   └─────┬──────┘              │
//!                 │                                     ▼                     │
//!  image/png      │  ┌─────────┐   ┌──────────┐   ┌────────────┐              │
//!  ◀──────────────┼──│  http   │◀──│ imaging  │◀──│   output   │──▶ disk      │
//!                 │  │response │   │ PNG enc  │   │ <id>.png   │              │
//!                 │  └─────────┘   └──────────┘   └────────────┘              │
//!                 │                                                           │
//!                 │   config · observability · lifecycle (cross-cutting)      │
//!                 └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use espcn_upscaler::config::{validate_config, ConfigError};
use espcn_upscaler::http::HttpServer;
use espcn_upscaler::lifecycle::{signals, startup, Shutdown};
use espcn_upscaler::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "espcn-upscaler")]
#[command(about = "HTTP service that upscales images with an ESPCN model", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = startup::resolve_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("espcn-upscaler v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        model_path = %config.model.path,
        model = %config.model.name,
        scale = config.model.scale,
        backend = ?config.model.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = startup::load_engine(&config.model)?;
    let output = startup::open_output(&config.output).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, engine, output);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
