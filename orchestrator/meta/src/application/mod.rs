// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer for system health and meta-coordination.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Aggregates per-layer reports and wires agent strategies

pub mod aggregator;
pub mod catalog;
pub mod meta_agent;

pub use aggregator::{aggregate_health, builtin_layer_names, detect_cross_layer_issues, health_score};
pub use catalog::{installed_agents, strategy_for, AgentDependencies};
pub use meta_agent::{meta_scan, MetaCoordinatorAgent};
