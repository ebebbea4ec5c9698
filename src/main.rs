// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook Relay Service
//!
//! Accepts JSON payloads, applies the origin / pacing / content policy and
//! forwards accepted payloads to a downstream chat webhook.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (an optional `.env`
//! file is read first):
//!
//! - `WEBHOOK_URL`: Downstream webhook (required for delivery; legacy name `DISCORD_WEBHOOK_URL`)
//! - `INCIDENT_WEBHOOK_URL`: Best-effort rejection reports (optional)
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RELAY_PATH`: Relay endpoint path (default: /)
//! - `MAX_BODY_BYTES`: Largest accepted request body (default: 2 MiB)
//! - `CLIENT_IP_HEADER`: Trusted header carrying the client address (default: peer address)
//! - `MAX_REQUESTS`: Requests per window per client (default: 10)
//! - `WINDOW_MS`: Pacing window in milliseconds (default: 60000)
//! - `ORIGIN_MARKER`: Required User-Agent substring (default: Roblox)
//! - `INVITE_PATTERN`, `MENTION_PATTERN`, `REFERENCE_PATTERN`: Content patterns
//! - `CHECKS`: Comma-separated check order (default: origin,pacing,invite_link,broadcast_mention,required_reference)
//! - `SCAN_SCOPE`: `whole_body` or `string_values` (default: whole_body)
//! - `CHECK_CONFIG_FIRST`: Fail on missing `WEBHOOK_URL` before any other check (default: false)
//! - `DELIVERY_TIMEOUT_MS`: Outbound request timeout (default: 10000)
//! - `METRICS_ENABLED`, `METRICS_PATH`: Prometheus endpoint (default: true, /metrics)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use webhook_relay::{
    config::Config,
    handlers::{router, AppState},
    relay::now_ms,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        relay_path = %config.relay_path,
        max_requests = config.pacing.max_requests,
        window_ms = config.pacing.window_ms,
        checks = ?config.validation.checks,
        scan_scope = ?config.validation.scan_scope,
        incident_reports = config.delivery.incident_url.is_some(),
        "Starting webhook relay"
    );
    if config.delivery.webhook_url.is_none() {
        warn!("WEBHOOK_URL is not set; every admitted request will fail with 500");
    }

    // Create application state
    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::from_config(config)?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            cleanup_state.relay.tracker().cleanup(now_ms()).await;
        }
    });

    let app = router(state);

    // Start server
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
