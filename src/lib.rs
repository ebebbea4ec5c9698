// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Webhook Relay
//!
//! A filtering relay that sits in front of a third-party chat webhook and
//! forwards only payloads that pass its policy:
//!
//! - Origin marker in the User-Agent (`Roblox` by default)
//! - Per-client sliding-window pacing (10 requests per 60 s default)
//! - No chat invite links anywhere in the payload
//! - No broadcast mentions anywhere in the payload
//! - A game reference URL somewhere in the payload
//!
//! Refused requests are reported, best effort, to an incident webhook.

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod notifier;
pub mod relay;
pub mod validator;

pub use config::Config;
pub use error::{RelayError, SetupError};
pub use limiter::{PacingResult, PacingTracker};
pub use notifier::{HttpNotifier, MemoryNotifier, Notifier};
pub use relay::{InboundRequest, Relay};
pub use validator::{CheckKind, PayloadValidator, RejectionReason, ScanScope, ValidationResult};
