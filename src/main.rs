//! http-kernel demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ axum/hyper ──▶ Dispatcher ──▶ EndpointRegistry
//!                     (layers)          │
//!                                       ▼
//!                           Kernel::run(ExecutionContext)
//!                                       │
//!                      pre-hooks ──▶ handler ──▶ post-hooks
//!                          └────── failure ──────┘
//!                                       ▼
//!                                  error-hooks
//!     Client Response                   │
//!     ◀───────────────────────── finalize response
//! ```

mod demo;

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use http_kernel::config::{load_config, ServerConfig};
use http_kernel::lifecycle::{self, signals, Shutdown};
use http_kernel::observability::logging;
use http_kernel::{App, HttpServer};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "http-kernel", version, about = "Embedded HTTP server demo")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("http-kernel v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.listener.max_body_bytes,
        "Configuration loaded"
    );

    lifecycle::prepare(&config).await?;

    let mut app = App::from_config(&config)?;
    demo::register(&mut app)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(signals::wait_and_trigger(shutdown));

    HttpServer::new(config, app).run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
