// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `trellis-meta` - System Health & Meta-Coordination Crate
//!
//! Combines the latest per-layer scan reports into one system health view,
//! flags cross-layer coordination issues, and hosts the meta-coordinator
//! agent that treats the other agents' reports as its own scan input.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SystemHealth`, `LayerStatus`, `HealthAlert`, `CrossLayerIssue` |
//! | [`application`] | Application | `aggregate_health`, `detect_cross_layer_issues`, `meta_scan`, `MetaCoordinatorAgent`, agent catalog |
//!
//! ## Key Concepts
//!
//! - **Health score**: mean of per-report values (healthy = 100, warning = 50,
//!   critical = 0), rounded. An empty report set scores 100.
//! - **Cross-layer issue**: one of a small set of hand-written pairings between
//!   two layers' states. There is no general inference.
//! - **Agent catalog**: maps an agent id to its concrete `DomainAgent`
//!   strategy. Agents without a strategy are reported and left unscheduled.

pub mod application;
pub mod domain;

pub use domain::*;
