// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::agent::AgentId;
use crate::domain::trust::TrustLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Approved,
    Executed,
    Rejected,
    Failed,
}

/// Before/after observation of one metric, attached to an action result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub metric: String,
    pub before: f64,
    pub after: f64,
    pub days_measured: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<Measurement>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            measurement: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            measurement: None,
        }
    }

    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }
}

/// A proposed change, tagged with the minimum trust level needed to run it
/// without human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAction {
    pub id: Uuid,
    pub agent_id: AgentId,
    #[serde(rename = "type")]
    pub action_type: String,
    pub target: String,
    pub detail: String,
    pub status: ActionStatus,
    pub required_trust: TrustLevel,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionResult>,
}

impl AgentAction {
    pub fn propose(
        agent_id: AgentId,
        action_type: impl Into<String>,
        target: impl Into<String>,
        detail: impl Into<String>,
        required_trust: TrustLevel,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            action_type: action_type.into(),
            target: target.into(),
            detail: detail.into(),
            status: ActionStatus::Pending,
            required_trust,
            created_at: Utc::now(),
            executed_at: None,
            result: None,
        }
    }

    /// Record the outcome of `execute`.
    pub fn complete(&mut self, result: ActionResult) {
        self.status = if result.success {
            ActionStatus::Executed
        } else {
            ActionStatus::Failed
        };
        self.executed_at = Some(Utc::now());
        self.result = Some(result);
    }
}
