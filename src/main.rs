use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use keygate::cli::Args;
use keygate::http::{build_router, default_routes, GateState, HttpServer};
use keygate::logging::init_tracing;
use keygate::ratelimit::{run_sweeper, Clock, RateGovernor, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    init_tracing(&config.logging)?;

    info!("Starting Keygate");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        listen_addr = %config.server.listen_addr,
        limit = config.rate_limiting.limit,
        window_ms = config.rate_limiting.window_ms,
        key_header = %config.rate_limiting.key_header,
        "Configuration loaded"
    );

    let governor = Arc::new(RateGovernor::new(config.rate_limiting.limit_config()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    info!(eviction = ?governor.eviction(), "Rate governor initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_sweeper(
        Arc::clone(&governor),
        Arc::clone(&clock),
        config.rate_limiting.sweep_interval(),
        wait_for(shutdown_rx),
    ));

    let gate = GateState::new(
        governor,
        clock,
        config.rate_limiting.key_header_name()?,
    );
    let router = build_router(
        gate,
        &config.server.route_prefix,
        config.server.cors,
        default_routes(),
    );

    HttpServer::new(config.server.listen_addr, router)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper.await?;

    info!("Keygate stopped");
    Ok(())
}

/// Resolve once the shutdown flag is raised or its sender is gone.
async fn wait_for(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
