//! ZeroDayRadar webhook server.
//!
//! Receives GitHub webhooks on `/webhook`, verifies their signatures and
//! triggers code-scanning and issue actions through the GitHub API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use radar::{router, AppState, Config, GithubClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        port = config.port,
        api_base_url = %config.api_base_url,
        api_token_configured = config.api_token.is_some(),
        request_timeout_ms = config.request_timeout_ms,
        max_body_bytes = config.max_body_bytes,
        reject_invalid_signature_with_401 = config.reject_invalid_signature_with_401,
        scan_pushed_ref = config.scan_pushed_ref,
        delivery_dedup_enabled = config.dedup_enabled(),
        "config_loaded"
    );

    // Create GitHub API client
    let client = GithubClient::new(
        config.api_base_url.clone(),
        config.api_token.as_deref(),
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to create GitHub client")?;
    info!("github_client_created");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Create application state and router
    let state = AppState::new(config, Arc::new(client));
    let app = router(state);

    // Bind to address
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
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
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
