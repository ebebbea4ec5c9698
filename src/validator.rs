// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Origin and content rules for relayed payloads.
//!
//! - Origin: the User-Agent must contain a marker substring
//! - Invite links: forbidden anywhere in the payload
//! - Broadcast mentions: forbidden anywhere in the payload
//! - Reference URL: required somewhere in the payload
//!
//! Content rules never look at individual fields. They run against the text
//! produced by a [`ScanScope`], which by default is the whole serialized body.

use crate::config::ValidationConfig;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A single step of the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Origin,
    Pacing,
    InviteLink,
    BroadcastMention,
    RequiredReference,
}

impl CheckKind {
    /// Every check, in the default order.
    pub const ALL: [CheckKind; 5] = [
        CheckKind::Origin,
        CheckKind::Pacing,
        CheckKind::InviteLink,
        CheckKind::BroadcastMention,
        CheckKind::RequiredReference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Origin => "origin",
            CheckKind::Pacing => "pacing",
            CheckKind::InviteLink => "invite_link",
            CheckKind::BroadcastMention => "broadcast_mention",
            CheckKind::RequiredReference => "required_reference",
        }
    }
}

impl FromStr for CheckKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CheckKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    InvalidOrigin,
    RateLimited,
    InviteLink,
    BroadcastMention,
    MissingReference,
}

impl RejectionReason {
    /// Short label used for metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::InvalidOrigin => "invalid_origin",
            Self::RateLimited => "rate_limited",
            Self::InviteLink => "invite_link",
            Self::BroadcastMention => "broadcast_mention",
            Self::MissingReference => "missing_reference",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrigin => write!(f, "invalid origin marker"),
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::InviteLink => write!(f, "contains disallowed invite link"),
            Self::BroadcastMention => write!(f, "contains broadcast mention"),
            Self::MissingReference => write!(f, "missing required reference URL"),
        }
    }
}

/// Result of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Rule passed
    Valid,
    /// Rule failed
    Invalid(RejectionReason),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn error(&self) -> Option<RejectionReason> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(reason) => Some(*reason),
        }
    }

    pub fn into_result(self) -> Result<(), RejectionReason> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(reason) => Err(reason),
        }
    }
}

/// Which text of a parsed body the content rules are matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanScope {
    /// Compact JSON of the entire body, keys and punctuation included
    #[default]
    WholeBody,
    /// Every string value in the body, one per line
    StringValues,
}

impl ScanScope {
    /// Render the text the content rules will see.
    pub fn render(self, body: &Value) -> String {
        match self {
            ScanScope::WholeBody => body.to_string(),
            ScanScope::StringValues => {
                let mut strings = Vec::new();
                collect_strings(body, &mut strings);
                strings.join("\n")
            }
        }
    }
}

impl FromStr for ScanScope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whole_body" => Ok(ScanScope::WholeBody),
            "string_values" => Ok(ScanScope::StringValues),
            _ => Err(()),
        }
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Whether a content pattern must be absent or present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Forbid,
    Require,
}

/// A named, case-insensitive pattern rule over scanned body text.
#[derive(Debug, Clone)]
pub struct ContentRule {
    name: &'static str,
    pattern: Regex,
    expectation: Expectation,
    reason: RejectionReason,
}

impl ContentRule {
    pub fn new(
        name: &'static str,
        pattern: &str,
        expectation: Expectation,
        reason: RejectionReason,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name,
            pattern,
            expectation,
            reason,
        })
    }

    /// Evaluate the rule against already-scanned text.
    pub fn evaluate(&self, scanned: &str) -> ValidationResult {
        let matched = self.pattern.is_match(scanned);
        let passed = match self.expectation {
            Expectation::Forbid => !matched,
            Expectation::Require => matched,
        };

        if passed {
            ValidationResult::Valid
        } else {
            debug!(rule = self.name, matched, "Content rule failed");
            ValidationResult::Invalid(self.reason)
        }
    }
}

/// Stateless rule set, built once at startup.
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    origin_marker: String,
    invite_link: ContentRule,
    broadcast_mention: ContentRule,
    required_reference: ContentRule,
    scan_scope: ScanScope,
}

impl PayloadValidator {
    /// Compile the rule set from configuration.
    pub fn new(config: &ValidationConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            origin_marker: config.origin_marker.clone(),
            invite_link: ContentRule::new(
                "invite_link",
                &config.invite_pattern,
                Expectation::Forbid,
                RejectionReason::InviteLink,
            )?,
            broadcast_mention: ContentRule::new(
                "broadcast_mention",
                &config.mention_pattern,
                Expectation::Forbid,
                RejectionReason::BroadcastMention,
            )?,
            required_reference: ContentRule::new(
                "required_reference",
                &config.reference_pattern,
                Expectation::Require,
                RejectionReason::MissingReference,
            )?,
            scan_scope: config.scan_scope,
        })
    }

    /// Validate the User-Agent against the origin marker.
    ///
    /// A missing User-Agent never carries the marker.
    pub fn validate_origin(&self, user_agent: Option<&str>) -> ValidationResult {
        match user_agent {
            Some(ua) if ua.contains(&self.origin_marker) => ValidationResult::Valid,
            _ => {
                debug!(user_agent = ?user_agent, marker = %self.origin_marker, "Origin marker missing");
                ValidationResult::Invalid(RejectionReason::InvalidOrigin)
            }
        }
    }

    /// The content rule behind a body-stage check.
    pub fn content_rule(&self, kind: CheckKind) -> Option<&ContentRule> {
        match kind {
            CheckKind::InviteLink => Some(&self.invite_link),
            CheckKind::BroadcastMention => Some(&self.broadcast_mention),
            CheckKind::RequiredReference => Some(&self.required_reference),
            CheckKind::Origin | CheckKind::Pacing => None,
        }
    }

    /// Render a body for scanning under the configured scope.
    pub fn scan(&self, body: &Value) -> String {
        self.scan_scope.render(body)
    }

    /// Run the given body-stage checks in order against already-scanned text.
    ///
    /// Non-body checks in `checks` are skipped.
    pub fn validate_scanned(&self, checks: &[CheckKind], scanned: &str) -> ValidationResult {
        for kind in checks {
            if let Some(rule) = self.content_rule(*kind) {
                let result = rule.evaluate(scanned);
                if !result.is_valid() {
                    return result;
                }
            }
        }
        ValidationResult::Valid
    }

    /// Run every content check, in default order, against a parsed body.
    pub fn validate_content(&self, body: &Value) -> ValidationResult {
        self.validate_scanned(&CheckKind::ALL, &self.scan(body))
    }
}
