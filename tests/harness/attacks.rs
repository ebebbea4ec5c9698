// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Abuse patterns for security testing.

use std::time::Duration;

/// Kind of payload an attacker sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Passes every content rule
    Valid,
    /// Carries a chat invite link next to a valid game URL
    InviteLink,
    /// Carries a broadcast mention next to a valid game URL
    BroadcastMention,
    /// Has no game URL at all
    MissingReference,
    /// Is not JSON
    Malformed,
}

/// Attack pattern configuration.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Requests per second (simulated clock)
    pub requests_per_second: f64,
    /// Number of unique client IPs
    pub unique_ips: usize,
    /// Payload sent by spam requests
    pub spam_payload: PayloadKind,
    /// Fraction of requests carrying `spam_payload` (0.0-1.0); the rest are valid
    pub spam_ratio: f64,
    /// Fraction of requests with an impersonated User-Agent (0.0-1.0)
    pub spoofed_agent_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 10.0,
            unique_ips: 1,
            spam_payload: PayloadKind::Valid,
            spam_ratio: 0.0,
            spoofed_agent_ratio: 0.0,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single IP flood - basic abuse from one address.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 200,
            requests_per_second: 100.0,
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Distributed flood - many IPs, few requests each.
    pub fn distributed_attack() -> Self {
        Self {
            total_requests: 500,
            requests_per_second: 50.0,
            unique_ips: 100,
            ..Default::default()
        }
    }

    /// Impersonation - callers without the origin marker.
    pub fn impersonation_attack() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            spoofed_agent_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Invite spam - advertising other chat servers.
    pub fn invite_spam() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            spam_payload: PayloadKind::InviteLink,
            spam_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Mention spam - pinging every member of the channel.
    pub fn mention_spam() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            spam_payload: PayloadKind::BroadcastMention,
            spam_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Off-topic posts without a game reference.
    pub fn off_topic_spam() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 10,
            spam_payload: PayloadKind::MissingReference,
            spam_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Mixed traffic - legitimate posts with spam and impersonation mixed in.
    pub fn mixed_traffic() -> Self {
        Self {
            total_requests: 300,
            requests_per_second: 5.0,
            unique_ips: 20,
            spam_payload: PayloadKind::InviteLink,
            spam_ratio: 0.3,
            spoofed_agent_ratio: 0.2,
        }
    }

    /// Slow drip - stay just under the pacing limit.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 100,
            requests_per_second: 0.15, // 9 per minute < 10 limit
            unique_ips: 1,
            ..Default::default()
        }
    }

    /// Simulated arrival time of request `index`, in milliseconds.
    pub fn arrival_ms(&self, index: usize) -> u64 {
        (index as f64 * 1000.0 / self.requests_per_second) as u64
    }

    /// Calculate expected duration for the attack.
    pub fn expected_duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_requests as f64 / self.requests_per_second)
    }
}
