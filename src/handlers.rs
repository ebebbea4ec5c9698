// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the webhook relay.
//!
//! The relay endpoint turns an HTTP request into an [`InboundRequest`],
//! hands it to the [`Relay`] and shapes the outcome as
//! `{"success": ...}` or `{"error": ...}`.

use crate::config::Config;
use crate::error::{RelayError, SetupError, SuccessResponse};
use crate::notifier::HttpNotifier;
use crate::relay::{InboundRequest, Relay};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Shared application state.
pub struct AppState {
    pub relay: Relay,
    pub config: Config,
}

impl AppState {
    /// Wire a relay that delivers over HTTP.
    pub fn from_config(config: Config) -> Result<Self, SetupError> {
        let notifier = HttpNotifier::new(config.delivery.timeout())?;
        let relay = Relay::new(&config, Arc::new(notifier))?;
        Ok(Self { relay, config })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route(
            &state.config.relay_path,
            post(relay_handler).layer(DefaultBodyLimit::max(state.config.max_body_bytes)),
        )
        .route("/health", get(health))
        .route("/healthz", get(health));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics_handler));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Validate a payload and forward it downstream.
pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let mut request = InboundRequest::new(
        client_id(&state.config, &headers, peer),
        header_str(&headers, header::USER_AGENT.as_str()),
        Vec::new(),
    );

    match body {
        Ok(body) => request.body = body.to_vec(),
        Err(rejection) => {
            let err = body_error(&rejection, state.config.max_body_bytes);
            state.relay.record_failure(&request, &err).await;
            return err.into_response();
        }
    }

    debug!(
        client = %request.client_key(),
        user_agent = %request.agent(),
        bytes = request.body.len(),
        "Processing relay request"
    );

    match state.relay.handle(&request).await {
        Ok(()) => (
            StatusCode::OK,
            Json(SuccessResponse {
                success: "Webhook sent successfully",
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.relay.metrics().render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            RelayError::Internal(err.to_string()).into_response()
        }
    }
}

/// Map a body that could not be read onto the relay's error shape.
fn body_error(rejection: &BytesRejection, limit: usize) -> RelayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge { limit }
    } else {
        RelayError::Internal(rejection.body_text())
    }
}

/// Resolve the pacing identifier for a request.
///
/// With a client IP header configured, its first entry is trusted and the
/// peer address is ignored; a missing header then means "unknown".
fn client_id(config: &Config, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    match &config.client_ip_header {
        Some(name) => header_str(headers, name).and_then(|value| {
            value
                .split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        }),
        None => peer.map(|addr| addr.ip().to_string()),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
