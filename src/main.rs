//! Guest fetch service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request            ┌───────────────────────────────────────────────────────┐
//!     ─────────────────────────▶│ http::server (axum + request-id/trace/timeout layers) │
//!                               └───────────────┬───────────────────────────────────────┘
//!                                               ▼
//!                               ┌───────────────────────────┐
//!                               │ platform (user / status)  │
//!                               └───────────────┬───────────┘
//!                                               ▼
//!     ┌────────────────┐        ┌───────────────────────────┐        ┌──────────────────┐
//!     │ credential     │◀──────▶│ guest::fetcher            │───────▶│ http::transport  │──▶ Upstream
//!     │ store + issuer │        │ (bounded retry loop)      │        │ direct/accelerator│
//!     └────────────────┘        └───────────────┬───────────┘        └──────────────────┘
//!             ▲                                 │ schedule()
//!             └──────── maintenance worker ◀────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use guest_fetch::config::loader::load_or_default;
use guest_fetch::http::HttpServer;
use guest_fetch::lifecycle::{signals, Services, Shutdown};
use guest_fetch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "guest-fetch")]
#[command(about = "Guest API lookup service", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("guest-fetch v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_attempts = config.guest.max_attempts,
        accelerator = config.accelerator.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let services = Services::build(&config, shutdown.subscribe())?;
    let server = HttpServer::new(&config, services.platform.clone());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::wait_for_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }
    services
        .drain(Duration::from_secs(config.maintenance.drain_timeout_secs))
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
