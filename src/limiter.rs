// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window pacing per client.
//!
//! Each client identifier owns a list of request timestamps (milliseconds
//! since the Unix epoch). On every check the list is pruned to the current
//! window, compared against the threshold and, only when admitted, extended
//! with the new timestamp. Rejected requests leave no trace.
//!
//! State is per process. Several relay instances each enforce their own
//! limit; nothing is shared between them.

use crate::config::PacingConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Bucket used when a request carries no client identifier.
///
/// All anonymous callers share this single window.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Result of a pacing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacingResult {
    /// Request is allowed and has been recorded
    Allowed {
        /// Requests left in the current window
        remaining: usize,
        /// Time until the oldest recorded request leaves the window
        reset_in: Duration,
    },
    /// Request exceeds the threshold and was not recorded
    Limited {
        /// Time until a slot frees up
        retry_after: Duration,
    },
}

impl PacingResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PacingResult::Allowed { .. })
    }
}

/// Thread-safe per-client request tracker.
#[derive(Clone)]
pub struct PacingTracker {
    /// Configuration
    config: PacingConfig,
    /// Request timestamps per client, oldest first
    windows: Arc<RwLock<HashMap<String, Vec<u64>>>>,
}

impl PacingTracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Check a client against the threshold and record the request if allowed.
    ///
    /// Prune, count and append happen under one write lock, so two
    /// concurrent requests can never both take the last slot.
    pub async fn check(&self, client_id: &str, now_ms: u64) -> PacingResult {
        let window_ms = self.config.window_ms;
        let max = self.config.max_requests;

        let mut windows = self.windows.write().await;
        let timestamps = windows.entry(client_id.to_string()).or_default();
        prune(timestamps, now_ms, window_ms);

        if timestamps.len() >= max {
            let retry_after = time_until_expiry(timestamps, now_ms, window_ms);
            debug!(client = %client_id, count = timestamps.len(), ?retry_after, "Pacing limit reached");
            return PacingResult::Limited { retry_after };
        }

        timestamps.push(now_ms);
        let remaining = max - timestamps.len();
        let reset_in = time_until_expiry(timestamps, now_ms, window_ms);
        debug!(client = %client_id, remaining, "Request recorded");
        PacingResult::Allowed {
            remaining,
            reset_in,
        }
    }

    /// Boolean form of [`PacingTracker::check`].
    pub async fn check_and_record(&self, client_id: &str, now_ms: u64) -> bool {
        self.check(client_id, now_ms).await.is_allowed()
    }

    /// Number of timestamps currently stored for a client, without pruning.
    pub async fn window_len(&self, client_id: &str) -> usize {
        self.windows
            .read()
            .await
            .get(client_id)
            .map_or(0, Vec::len)
    }

    /// Number of clients with a stored window.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Prune every window and drop clients with nothing left in theirs.
    ///
    /// An absent client reads the same as an empty window, so this only
    /// reclaims memory.
    pub async fn cleanup(&self, now_ms: u64) {
        let window_ms = self.config.window_ms;
        let mut windows = self.windows.write().await;
        windows.retain(|_, timestamps| {
            prune(timestamps, now_ms, window_ms);
            !timestamps.is_empty()
        });
    }

    /// Forget all clients.
    pub async fn reset(&self) {
        self.windows.write().await.clear();
    }
}

/// Drop timestamps more than `window_ms` older than `now_ms`.
fn prune(timestamps: &mut Vec<u64>, now_ms: u64, window_ms: u64) {
    timestamps.retain(|&t| now_ms.saturating_sub(t) <= window_ms);
}

fn time_until_expiry(timestamps: &[u64], now_ms: u64, window_ms: u64) -> Duration {
    match timestamps.iter().min() {
        Some(&oldest) => {
            let expires_at = oldest.saturating_add(window_ms).saturating_add(1);
            Duration::from_millis(expires_at.saturating_sub(now_ms))
        }
        None => Duration::ZERO,
    }
}
