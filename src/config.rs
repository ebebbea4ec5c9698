// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the webhook relay.
//!
//! Every section has serde defaults matching the most recent deployed
//! policy (10 requests per 60 s window, `Roblox` origin marker, invite /
//! broadcast-mention / game-URL patterns). [`Config::from_env`] overlays
//! environment variables on top of those defaults.

use crate::validator::{CheckKind, ScanScope};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid URL for {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Unknown check {0:?} (expected origin, pacing, invite_link, broadcast_mention or required_reference)")]
    UnknownCheck(String),
}

/// Configuration for the relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path the relay endpoint is mounted on (default: /)
    #[serde(default = "default_relay_path")]
    pub relay_path: String,

    /// Largest accepted request body in bytes (default: 2 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Header carrying the client address when running behind a proxy.
    /// When unset the TCP peer address is used.
    #[serde(default)]
    pub client_ip_header: Option<String>,

    /// Downstream delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Pacing configuration
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where accepted payloads and incident reports are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Downstream webhook. Requests fail with 500 while this is unset.
    #[serde(default)]
    pub webhook_url: Option<Url>,

    /// Best-effort endpoint for rejection reports (default: none)
    #[serde(default)]
    pub incident_url: Option<Url>,

    /// Check `webhook_url` before any client-identifying work (default: false)
    #[serde(default)]
    pub check_config_first: bool,

    /// Outbound request timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Sliding-window pacing per client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Maximum requests per window per client (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in milliseconds (default: 60000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// Origin and content policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Substring the User-Agent must contain (default: Roblox)
    #[serde(default = "default_origin_marker")]
    pub origin_marker: String,

    /// Forbidden chat invite pattern, matched case-insensitively
    #[serde(default = "default_invite_pattern")]
    pub invite_pattern: String,

    /// Forbidden broadcast mention pattern, matched case-insensitively
    #[serde(default = "default_mention_pattern")]
    pub mention_pattern: String,

    /// Required reference URL pattern, matched case-insensitively
    #[serde(default = "default_reference_pattern")]
    pub reference_pattern: String,

    /// Checks to run, in order
    #[serde(default = "default_checks")]
    pub checks: Vec<CheckKind>,

    /// Which text of the parsed body the content patterns see
    #[serde(default)]
    pub scan_scope: ScanScope,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_relay_path() -> String {
    "/".to_string()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_requests() -> usize {
    10
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_origin_marker() -> String {
    "Roblox".to_string()
}

fn default_invite_pattern() -> String {
    r"discord\.gg/\S+".to_string()
}

fn default_mention_pattern() -> String {
    r"@everyone|@here".to_string()
}

fn default_reference_pattern() -> String {
    r"https?://www\.roblox\.com/games/\d+".to_string()
}

fn default_checks() -> Vec<CheckKind> {
    CheckKind::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            relay_path: default_relay_path(),
            max_body_bytes: default_max_body_bytes(),
            client_ip_header: None,
            delivery: DeliveryConfig::default(),
            pacing: PacingConfig::default(),
            validation: ValidationConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            incident_url: None,
            check_config_first: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            origin_marker: default_origin_marker(),
            invite_pattern: default_invite_pattern(),
            mention_pattern: default_mention_pattern(),
            reference_pattern: default_reference_pattern(),
            checks: default_checks(),
            scan_scope: ScanScope::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl DeliveryConfig {
    /// Get the outbound request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl PacingConfig {
    /// Get the pacing window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. `WEBHOOK_URL` falls back to the
    /// legacy `DISCORD_WEBHOOK_URL` name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(v) = get("BIND_ADDR") {
            config.bind_addr = v;
        }
        if let Some(v) = get("RELAY_PATH") {
            config.relay_path = parse_path("RELAY_PATH", &v)?;
        }
        if let Some(v) = get("MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("MAX_BODY_BYTES", &v)?;
        }
        config.client_ip_header = get("CLIENT_IP_HEADER").map(|v| v.to_ascii_lowercase());

        let webhook = get("WEBHOOK_URL").or_else(|| get("DISCORD_WEBHOOK_URL"));
        config.delivery.webhook_url = webhook
            .map(|v| parse_url("WEBHOOK_URL", &v))
            .transpose()?;
        config.delivery.incident_url = get("INCIDENT_WEBHOOK_URL")
            .map(|v| parse_url("INCIDENT_WEBHOOK_URL", &v))
            .transpose()?;
        if let Some(v) = get("CHECK_CONFIG_FIRST") {
            config.delivery.check_config_first = parse_bool("CHECK_CONFIG_FIRST", &v)?;
        }
        if let Some(v) = get("DELIVERY_TIMEOUT_MS") {
            config.delivery.timeout_ms = parse_number("DELIVERY_TIMEOUT_MS", &v)?;
        }

        if let Some(v) = get("MAX_REQUESTS") {
            config.pacing.max_requests = parse_number("MAX_REQUESTS", &v)?;
        }
        if let Some(v) = get("WINDOW_MS") {
            config.pacing.window_ms = parse_number("WINDOW_MS", &v)?;
        }

        if let Some(v) = get("ORIGIN_MARKER") {
            config.validation.origin_marker = v;
        }
        if let Some(v) = get("INVITE_PATTERN") {
            config.validation.invite_pattern = v;
        }
        if let Some(v) = get("MENTION_PATTERN") {
            config.validation.mention_pattern = v;
        }
        if let Some(v) = get("REFERENCE_PATTERN") {
            config.validation.reference_pattern = v;
        }
        if let Some(v) = get("CHECKS") {
            config.validation.checks = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(|_| ConfigError::UnknownCheck(s.to_string())))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = get("SCAN_SCOPE") {
            config.validation.scan_scope = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SCAN_SCOPE",
                value: v.clone(),
            })?;
        }

        if let Some(v) = get("METRICS_ENABLED") {
            config.metrics.enabled = parse_bool("METRICS_ENABLED", &v)?;
        }
        if let Some(v) = get("METRICS_PATH") {
            let path = parse_path("METRICS_PATH", &v)?;
            // Health routes already own GET on these
            if path == "/health" || path == "/healthz" {
                return Err(ConfigError::InvalidValue {
                    key: "METRICS_PATH",
                    value: v,
                });
            }
            config.metrics.path = path;
        }

        Ok(config)
    }
}

fn parse_url(key: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUrl { key, source })
}

/// Route paths must be absolute.
fn parse_path(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let path = value.trim();
    if path.starts_with('/') {
        Ok(path.to_string())
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
