// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Meta Domain Layer
//!
//! Pure value types for the system health view. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`health`] | `SystemHealth`, `LayerStatus`, `HealthAlert`, `CrossLayerIssue` |

pub mod health;

pub use health::*;
