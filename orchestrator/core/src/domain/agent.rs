// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Domain
//!
//! An **agent** is the scan → assess → execute → learn actor bound to a layer.
//! Domain agents are small strategy implementations of [`DomainAgent`]; the
//! cycle controller in [`crate::application::runner`] is generic over that
//! trait and owns trust gating, truncation and bookkeeping.
//!
//! | Phase | Kind | Failure mode |
//! |-------|------|--------------|
//! | `scan` | I/O | degrades to an empty or info-level report |
//! | `assess` | pure | returns an empty list |
//! | `execute` | I/O | returns `ActionResult { success: false, .. }` |
//! | `learn` | pure | returns `None` when nothing was measured |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::action::{ActionResult, AgentAction};
use crate::domain::layer::LayerId;
use crate::domain::learning::LearningRecord;
use crate::domain::scan::ScanReport;
use crate::domain::trust::TrustLevel;

/// Stable identifier of an agent (e.g. `"infra-agent"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

/// A metric the agent tries to move, with its relative weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub metric: String,
    pub direction: Direction,
    pub weight: f64,
}

/// Per-layer agent configuration, declared in the layer manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub agent_id: AgentId,
    pub scan_interval_secs: u64,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub initial_trust: TrustLevel,
    pub confidence_threshold: f64,
    /// Table holding this agent's append-only learning ledger.
    pub ledger_table: String,
    pub max_actions_per_cycle: usize,
}

impl AgentConfig {
    /// Direction of the objective tracking `metric`, maximize when undeclared.
    pub fn direction_of(&self, metric: &str) -> Direction {
        self.objectives
            .iter()
            .find(|o| o.metric == metric)
            .map(|o| o.direction)
            .unwrap_or_default()
    }
}

/// Everything a runner needs for one cycle. Built fresh per cycle by the
/// caller from persisted trust state and the ledger.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub layer_id: LayerId,
    pub config: AgentConfig,
    pub trust_level: TrustLevel,
    pub records: Vec<LearningRecord>,
}

/// Domain strategy plugged into the shared control loop.
#[async_trait]
pub trait DomainAgent: Send + Sync {
    /// Read-only assessment of the layer's current state. Must not fail.
    async fn scan(&self, ctx: &AgentContext) -> ScanReport;

    /// Proposed actions in priority order.
    fn assess(&self, ctx: &AgentContext, report: &ScanReport) -> Vec<AgentAction>;

    /// Perform one side-effecting action. Failures surface as
    /// `ActionResult::failure`, never as a panic or error.
    async fn execute(&self, ctx: &AgentContext, action: &AgentAction) -> ActionResult;

    /// Turn an executed action into a learning record.
    ///
    /// The default records an outcome only when the result carries a
    /// before/after measurement and the action succeeded. Actions that return
    /// no measurement are measured by the next cycle's scan instead.
    fn learn(
        &self,
        ctx: &AgentContext,
        action: &AgentAction,
        result: &ActionResult,
    ) -> Option<LearningRecord> {
        if !result.success {
            return None;
        }
        let measurement = result.measurement.as_ref()?;
        Some(LearningRecord::measure_toward(
            ctx.config.direction_of(&measurement.metric),
            action.target.clone(),
            measurement,
            action,
            ctx.trust_level,
        ))
    }
}
