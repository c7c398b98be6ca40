use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use copytrade_portal::app::{self, AppState};
use copytrade_portal::session::CancelHandle;
use copytrade_portal::{config, identity, is_production, media};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up IDENTITY_URL, SESSION_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!("Starting Copytrade Portal in {:?} mode", config.environment);
    config.validate().context("invalid configuration")?;

    let identity = identity::from_config(&config.identity)
        .await
        .context("failed to set up identity store")?;
    let media = media::from_config(&config.media).context("failed to set up media store")?;
    if is_production!() && (identity.name() == "memory" || media.name() == "memory") {
        warn!("Running in production with in-memory identity or media store");
    }

    let (shutdown, shutdown_token) = CancelHandle::new();
    let state = Arc::new(AppState::new(config.clone(), identity, media, shutdown_token));
    let router = app::router(state);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Copytrade Portal listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    info!("Copytrade Portal stopped");
    Ok(())
}

/// Wait for Ctrl-C / SIGTERM, then cancel in-flight gate resolutions.
async fn shutdown_signal(shutdown: CancelHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
    shutdown.cancel();
    // Give the cancellation a moment to reach waiting gates
    tokio::time::sleep(Duration::from_millis(50)).await;
}
