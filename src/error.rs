// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the relay and their HTTP shape.

use crate::notifier::DeliveryError;
use crate::validator::RejectionReason;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failure to assemble the relay at startup.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid content pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Everything that can stop a request from being relayed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Request rejected: {reason}")]
    Rejected {
        reason: RejectionReason,
        retry_after: Option<Duration>,
    },

    #[error("Downstream webhook URL not configured")]
    NotConfigured,

    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// A policy rejection without retry information.
    pub fn rejected(reason: RejectionReason) -> Self {
        RelayError::Rejected {
            reason,
            retry_after: None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            RelayError::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Rejected {
                reason: RejectionReason::RateLimited,
                ..
            } => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Rejected { .. } => StatusCode::FORBIDDEN,
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::NotConfigured
            | RelayError::MalformedBody(_)
            | RelayError::Delivery(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::Rejected {
                reason: RejectionReason::RateLimited,
                ..
            } => "Too Many Requests",
            RelayError::Rejected { .. } => "Forbidden",
            RelayError::PayloadTooLarge { .. } => "Payload Too Large",
            RelayError::NotConfigured => "Webhook URL not configured",
            RelayError::MalformedBody(_) => "Malformed request body",
            RelayError::Delivery(_) => "Webhook Error",
            RelayError::Internal(_) => "Internal Server Error",
        }
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::Rejected { reason, .. } => reason.label(),
            RelayError::PayloadTooLarge { .. } => "payload_too_large",
            RelayError::NotConfigured => "not_configured",
            RelayError::MalformedBody(_) => "malformed_body",
            RelayError::Delivery(_) => "delivery_failed",
            RelayError::Internal(_) => "internal_error",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: &'static str,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status(),
            Json(ErrorResponse {
                error: self.public_message(),
            }),
        )
            .into_response();

        if let RelayError::Rejected {
            retry_after: Some(retry_after),
            ..
        } = &self
        {
            // Round up so clients never retry a moment too early
            let secs = retry_after.as_millis().div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}
