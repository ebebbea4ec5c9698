// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for relay abuse simulation.
//!
//! This module provides utilities for replaying abusive traffic patterns
//! against the relay to validate its policy controls.

pub mod attacks;
pub mod generators;
pub mod metrics;
