// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound webhook delivery.
//!
//! [`Notifier`] is the seam between the relay and the network. The relay
//! uses it twice: once to forward accepted payloads, and once (best effort)
//! to report rejected requests to an incident channel.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Failure to deliver a payload downstream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Downstream responded with status {0}")]
    Status(u16),

    #[error("Downstream request failed: {0}")]
    Transport(String),
}

/// Posts JSON payloads to a webhook URL.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// POST `body` as `application/json`. Any non-2xx status is an error.
    async fn post_json(&self, url: &Url, body: &Value) -> Result<(), DeliveryError>;
}

/// [`Notifier`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    /// Create a notifier whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Webhook delivered");
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

/// A delivery captured by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub url: Url,
    pub body: Value,
}

/// In-process [`Notifier`] that records deliveries instead of sending them.
///
/// Optionally fails every delivery with a fixed error.
#[derive(Default, Clone)]
pub struct MemoryNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    failure: Arc<Mutex<Option<DeliveryError>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail (`None` to succeed again).
    pub fn set_failure(&self, failure: Option<DeliveryError>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = failure;
    }

    /// Everything posted so far, failed attempts included.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Deliveries posted to one URL.
    pub fn deliveries_to(&self, url: &Url) -> Vec<Delivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| &d.url == url)
            .collect()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn post_json(&self, url: &Url, body: &Value) -> Result<(), DeliveryError> {
        self.deliveries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Delivery {
                url: url.clone(),
                body: body.clone(),
            });

        match self
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A refused or undeliverable request, as reported to the incident channel.
#[derive(Debug, Clone)]
pub struct Incident<'a> {
    pub client_id: &'a str,
    pub user_agent: &'a str,
    pub reason: String,
}

impl Incident<'_> {
    /// Chat-webhook payload describing the incident.
    pub fn payload(&self) -> Value {
        json!({
            "content": format!(
                "Bad request detected!\nIP: {}\nUser-Agent: {}\nReason: {}",
                self.client_id, self.user_agent, self.reason
            )
        })
    }
}

/// Best-effort reporter for the incident channel.
#[derive(Clone)]
pub struct IncidentReporter {
    notifier: Arc<dyn Notifier>,
    url: Option<Url>,
}

impl IncidentReporter {
    pub fn new(notifier: Arc<dyn Notifier>, url: Option<Url>) -> Self {
        Self { notifier, url }
    }

    /// Post the incident. Failures are logged and swallowed.
    pub async fn report(&self, incident: &Incident<'_>) {
        let Some(url) = &self.url else {
            debug!(client = %incident.client_id, reason = %incident.reason, "No incident endpoint configured");
            return;
        };

        if let Err(err) = self.notifier.post_json(url, &incident.payload()).await {
            warn!(
                client = %incident.client_id,
                reason = %incident.reason,
                error = %err,
                "Failed to report incident"
            );
        }
    }
}
