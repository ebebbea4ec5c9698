// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the relay.
//!
//! The registry belongs to the relay instance rather than the process-wide
//! default registry, so several relays (e.g. in tests) never collide.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label for a forwarded request.
pub const OUTCOME_FORWARDED: &str = "forwarded";

pub struct RelayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    forward_duration: Histogram,
}

impl RelayMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("relay_requests_total", "Relay requests by outcome"),
            &["outcome"],
        )?;
        let forward_duration = Histogram::with_opts(HistogramOpts::new(
            "relay_forward_duration_seconds",
            "Time spent posting accepted payloads downstream",
        ))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(forward_duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            forward_duration,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.requests.with_label_values(&[outcome]).inc();
    }

    pub fn observe_forward(&self, seconds: f64) {
        self.forward_duration.observe(seconds);
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.requests.with_label_values(&[outcome]).get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_outcomes() {
        let metrics = RelayMetrics::new().unwrap();
        metrics.record_outcome(OUTCOME_FORWARDED);
        metrics.record_outcome("invalid_origin");
        metrics.record_outcome("invalid_origin");
        metrics.observe_forward(0.25);

        assert_eq!(metrics.outcome_count("invalid_origin"), 2);

        let text = metrics.render().unwrap();
        assert!(text.contains("relay_requests_total{outcome=\"forwarded\"} 1"));
        assert!(text.contains("relay_forward_duration_seconds_count 1"));
    }
}
