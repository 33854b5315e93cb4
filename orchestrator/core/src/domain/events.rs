// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::layer::LayerId;
use crate::domain::scan::OverallHealth;
use crate::domain::trust::TrustLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CycleEvent {
    CycleStarted {
        agent_id: AgentId,
        layer_id: LayerId,
        trust_level: TrustLevel,
        started_at: DateTime<Utc>,
    },
    CycleCompleted {
        agent_id: AgentId,
        layer_id: LayerId,
        health: OverallHealth,
        considered: usize,
        executed: usize,
        skipped: usize,
        records_appended: usize,
        completed_at: DateTime<Utc>,
    },
    ActionFailed {
        agent_id: AgentId,
        action_type: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrustEvent {
    TrustPromoted {
        agent_id: AgentId,
        from: TrustLevel,
        to: TrustLevel,
        reason: String,
        promoted_at: DateTime<Utc>,
    },
    TrustDemoted {
        agent_id: AgentId,
        from: TrustLevel,
        to: TrustLevel,
        reason: String,
        demoted_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstallEvent {
    TableCreated {
        layer_id: LayerId,
        table: String,
        created_at: DateTime<Utc>,
    },
    ColumnsAdded {
        layer_id: LayerId,
        table: String,
        columns: Vec<String>,
        added_at: DateTime<Utc>,
    },
    LayerInstallFailed {
        layer_id: LayerId,
        errors: Vec<String>,
        failed_at: DateTime<Utc>,
    },
}
