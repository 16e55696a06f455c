//! WaSpeed Webhook Gateway
//!
//! A webhook ingestion gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌────────────────────────────────────────────────┐
//!                          │                WEBHOOK GATEWAY                 │
//!                          │                                                │
//!     POST /webhook/*      │  ┌─────────┐   ┌────────────┐   ┌───────────┐  │
//!     ─────────────────────┼─▶│  http   │──▶│  webhook   │──▶│ forwarder │──┼──▶ primary store
//!                          │  │ server  │   │ normalizer │   │ (detached │  │    (postgres /
//!     200 ack              │  │         │   └────────────┘   │   write)  │  │     supabase /
//!     ◀────────────────────┼──│         │                    └─────┬─────┘  │     memory)
//!                          │  └────┬────┘                          │        │
//!                          │       │                               └────────┼──▶ sheets mirror
//!     GET /api/*           │       ▼                                        │
//!     ◀───────────────────▶│  ┌─────────┐                                   │
//!                          │  │   api   │◀──────────── EventStore ◀─────────┼──── queryable
//!                          │  │handlers │                                   │     backends
//!                          │  └─────────┘                                   │
//!                          │                                                │
//!                          │  ┌──────────────────────────────────────────┐  │
//!                          │  │          Cross-Cutting Concerns          │  │
//!                          │  │  ┌────────┐ ┌─────────────┐ ┌─────────┐  │  │
//!                          │  │  │ config │ │observability│ │lifecycle│  │  │
//!                          │  │  └────────┘ └─────────────┘ └─────────┘  │  │
//!                          │  └──────────────────────────────────────────┘  │
//!                          └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use tokio::net::TcpListener;

use waspeed_gateway::config::loader;
use waspeed_gateway::observability::{logging, metrics};
use waspeed_gateway::storage;
use waspeed_gateway::{HttpServer, Shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Explicit path wins; otherwise pick up gateway.toml when present.
    let config_path = std::env::var_os("WASPEED_CONFIG")
        .map(PathBuf::from)
        .or_else(|| {
            let default = PathBuf::from("gateway.toml");
            default.exists().then_some(default)
        });

    let config = loader::load_config(config_path.as_deref())?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "waspeed-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = ?config.storage.backend,
        sheets_mirror = config.sheets.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

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

    // Connect storage before accepting traffic; an unreachable database
    // is a startup failure, not something to discover on the first event.
    let handles = storage::build(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let server = HttpServer::new(&config, handles);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
