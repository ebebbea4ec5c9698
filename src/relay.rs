// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission pipeline and forwarding.
//!
//! A [`Relay`] runs the configured checks in order, stops at the first
//! failure, and forwards admitted payloads to the downstream webhook.
//! Rejections and delivery failures are reported to the incident channel on
//! a best-effort basis. It knows nothing about HTTP servers; the axum layer
//! in [`crate::handlers`] only translates requests and responses.

use crate::config::{Config, DeliveryConfig};
use crate::error::{RelayError, SetupError};
use crate::limiter::{PacingResult, PacingTracker, UNKNOWN_CLIENT};
use crate::metrics::{RelayMetrics, OUTCOME_FORWARDED};
use crate::notifier::{Incident, IncidentReporter, Notifier};
use crate::validator::{CheckKind, PayloadValidator, RejectionReason};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Placeholder for a missing User-Agent in logs and incident reports.
pub const UNKNOWN_AGENT: &str = "unknown";

/// One inbound event, as handed over by the hosting layer.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub client_id: Option<String>,
    pub user_agent: Option<String>,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(
        client_id: Option<String>,
        user_agent: Option<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            client_id,
            user_agent,
            body: body.into(),
        }
    }

    /// Pacing key. Requests without an identifier share one bucket.
    pub fn client_key(&self) -> &str {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
    }

    pub fn agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(UNKNOWN_AGENT)
    }
}

/// A parsed body together with the text the content rules scan.
struct ParsedBody {
    value: Value,
    scanned: String,
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

pub struct Relay {
    checks: Vec<CheckKind>,
    delivery: DeliveryConfig,
    tracker: PacingTracker,
    validator: PayloadValidator,
    notifier: Arc<dyn Notifier>,
    incidents: IncidentReporter,
    metrics: RelayMetrics,
}

impl Relay {
    /// Build a relay from configuration around an injected notifier.
    ///
    /// The same notifier carries downstream deliveries and incident reports.
    pub fn new(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self, SetupError> {
        let incidents = IncidentReporter::new(notifier.clone(), config.delivery.incident_url.clone());
        Ok(Self {
            checks: config.validation.checks.clone(),
            delivery: config.delivery.clone(),
            tracker: PacingTracker::new(config.pacing.clone()),
            validator: PayloadValidator::new(&config.validation)?,
            notifier,
            incidents,
            metrics: RelayMetrics::new()?,
        })
    }

    pub fn tracker(&self) -> &PacingTracker {
        &self.tracker
    }

    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Handle a request at the current wall-clock time.
    pub async fn handle(&self, request: &InboundRequest) -> Result<(), RelayError> {
        self.handle_at(request, now_ms()).await
    }

    /// Handle a request as if it arrived at `now_ms`.
    ///
    /// Records the outcome, logs it, and reports rejections and delivery
    /// failures to the incident channel before returning.
    pub async fn handle_at(&self, request: &InboundRequest, now_ms: u64) -> Result<(), RelayError> {
        let result = self.process(request, now_ms).await;

        match &result {
            Ok(()) => {
                info!(client = %request.client_key(), "Payload forwarded");
                self.metrics.record_outcome(OUTCOME_FORWARDED);
            }
            Err(err) => self.record_failure(request, err).await,
        }

        result
    }

    /// Record, log and report a failed request.
    ///
    /// Also used by the hosting layer for requests refused before the relay
    /// could see them, such as oversized bodies.
    pub async fn record_failure(&self, request: &InboundRequest, err: &RelayError) {
        self.metrics.record_outcome(err.label());
        self.log_failure(request, err);
        if let Some(reason) = incident_reason(err) {
            self.incidents
                .report(&Incident {
                    client_id: request.client_key(),
                    user_agent: request.agent(),
                    reason,
                })
                .await;
        }
    }

    async fn process(&self, request: &InboundRequest, now_ms: u64) -> Result<(), RelayError> {
        if self.delivery.check_config_first {
            self.webhook_url()?;
        }

        let body = self.admit(request, now_ms).await?;
        let url = self.webhook_url()?;
        self.forward(url, &body).await
    }

    /// Run the configured checks in order and return the parsed body.
    ///
    /// The body is parsed right before the first check that needs it, or at
    /// the end if none does. The webhook URL must be configured by then.
    pub async fn admit(&self, request: &InboundRequest, now_ms: u64) -> Result<Value, RelayError> {
        let mut parsed: Option<ParsedBody> = None;

        for kind in &self.checks {
            match kind {
                CheckKind::Origin => self
                    .validator
                    .validate_origin(request.user_agent.as_deref())
                    .into_result()
                    .map_err(RelayError::rejected)?,
                CheckKind::Pacing => {
                    if let PacingResult::Limited { retry_after } =
                        self.tracker.check(request.client_key(), now_ms).await
                    {
                        return Err(RelayError::Rejected {
                            reason: RejectionReason::RateLimited,
                            retry_after: Some(retry_after),
                        });
                    }
                }
                CheckKind::InviteLink | CheckKind::BroadcastMention | CheckKind::RequiredReference => {
                    let body = match parsed.take() {
                        Some(body) => body,
                        None => self.parse(request)?,
                    };
                    let result = self
                        .validator
                        .validate_scanned(std::slice::from_ref(kind), &body.scanned);
                    parsed = Some(body);
                    result.into_result().map_err(RelayError::rejected)?;
                }
            }
            debug!(check = kind.as_str(), client = %request.client_key(), "Check passed");
        }

        match parsed {
            Some(body) => Ok(body.value),
            None => Ok(self.parse(request)?.value),
        }
    }

    fn parse(&self, request: &InboundRequest) -> Result<ParsedBody, RelayError> {
        self.webhook_url()?;
        let value: Value = serde_json::from_slice(&request.body)?;
        let scanned = self.validator.scan(&value);
        Ok(ParsedBody { value, scanned })
    }

    fn webhook_url(&self) -> Result<&Url, RelayError> {
        self.delivery
            .webhook_url
            .as_ref()
            .ok_or(RelayError::NotConfigured)
    }

    async fn forward(&self, url: &Url, body: &Value) -> Result<(), RelayError> {
        let started = Instant::now();
        let result = self.notifier.post_json(url, body).await;
        self.metrics.observe_forward(started.elapsed().as_secs_f64());
        result.map_err(RelayError::from)
    }

    fn log_failure(&self, request: &InboundRequest, err: &RelayError) {
        let client = request.client_key();
        let user_agent = request.agent();
        match err {
            RelayError::Rejected { reason, .. } => {
                info!(%client, %user_agent, %reason, "Request rejected");
            }
            RelayError::PayloadTooLarge { limit } => {
                info!(%client, %user_agent, limit, "Request body too large");
            }
            RelayError::NotConfigured => {
                error!(%client, "Downstream webhook URL not configured");
            }
            RelayError::MalformedBody(e) => {
                warn!(%client, error = %e, "Malformed request body");
            }
            RelayError::Delivery(e) => {
                error!(%client, error = %e, "Webhook delivery failed");
            }
            RelayError::Internal(e) => {
                error!(%client, error = %e, "Internal error");
            }
        }
    }
}

/// Reason sent to the incident channel, if the failure is worth reporting.
fn incident_reason(err: &RelayError) -> Option<String> {
    match err {
        RelayError::Rejected { reason, .. } => Some(reason.to_string()),
        RelayError::PayloadTooLarge { limit } => Some(format!("request body exceeds {limit} bytes")),
        RelayError::Delivery(e) => Some(format!("downstream delivery failed: {e}")),
        RelayError::NotConfigured | RelayError::MalformedBody(_) | RelayError::Internal(_) => None,
    }
}
