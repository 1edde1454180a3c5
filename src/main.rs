//! University API gateway daemon.
//!
//! A caching reverse proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────┐
//!                       │                 UNI-GATEWAY                   │
//!                       │                                               │
//!   Client Request      │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ────────────────────┼─▶│  http  │──▶│ routing  │──▶│   cache    │  │
//!                       │  │ server │   │ registry │   │  lookup    │  │
//!                       │  └────────┘   └──────────┘   └─────┬──────┘  │
//!                       │                                hit │ miss    │
//!                       │                  ┌─────────────────┤         │
//!   Client Response     │  ┌────────┐     │          ┌───────▼──────┐  │
//!   ◀───────────────────┼──│response│◀────┴──────────│   upstream   │◀─┼── Backend API
//!                       │  │ + HIT/ │                │  forwarder   │  │
//!                       │  │  MISS  │                └──────────────┘  │
//!                       │  └────────┘                                  │
//!                       │                                               │
//!                       │  config · observability · lifecycle           │
//!                       └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uni_gateway::cache::{CacheStore, DiskCache, MemoryCache};
use uni_gateway::config::{load_config, CacheBacking, GatewayConfig};
use uni_gateway::http::HttpServer;
use uni_gateway::lifecycle::Shutdown;
use uni_gateway::observability::metrics;

#[derive(Parser)]
#[command(name = "uni-gateway")]
#[command(about = "Caching reverse proxy for university schedule APIs", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load (and validate) configuration before anything else; a malformed
    // config is a startup failure, not a per-request one.
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "uni_gateway={},tower_http=info",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        cache_ttl_secs = config.cache.ttl_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    let cache: Arc<dyn CacheStore> = match config.cache.backing {
        CacheBacking::Memory => Arc::new(MemoryCache::new()),
        CacheBacking::Disk => Arc::new(DiskCache::new(&config.cache.dir)?),
    };

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config, cache)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
