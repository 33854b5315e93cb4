// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Key/value view over the `config` table.
//!
//! Rows are `[key, value, updated_at]`. Writes scan for the key and update that
//! row in place, appending only when the key is new. Per-agent state is stored
//! here as JSON:
//!
//! | Key | Value |
//! |-----|-------|
//! | `trust_state:<agent-id>` | [`TrustState`] |
//! | `scan_report:<agent-id>` | latest [`ScanReport`] |
//! | `follow_up:<agent-id>` | pending [`FollowUp`], blank when none |

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::agent::AgentId;
use crate::domain::catalog::CONFIG_TABLE;
use crate::domain::learning::FollowUp;
use crate::domain::repository::{
    FollowUpRepository, RepositoryError, ScanReportRepository, TableStore, TrustStateRepository,
};
use crate::domain::scan::ScanReport;
use crate::domain::trust::TrustState;

const TRUST_STATE_PREFIX: &str = "trust_state:";
const SCAN_REPORT_PREFIX: &str = "scan_report:";
const FOLLOW_UP_PREFIX: &str = "follow_up:";

#[derive(Clone)]
pub struct ConfigTable {
    store: Arc<dyn TableStore>,
}

impl ConfigTable {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let rows = self.store.read_all_rows(CONFIG_TABLE).await?;
        Ok(rows
            .into_iter()
            .find(|row| row.first().map(String::as_str) == Some(key))
            .and_then(|row| row.get(1).cloned()))
    }

    /// Upsert by scan, else append.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        let rows = self.store.read_all_rows(CONFIG_TABLE).await?;
        let row = vec![key.to_string(), value.to_string(), Utc::now().to_rfc3339()];

        match rows
            .iter()
            .position(|r| r.first().map(String::as_str) == Some(key))
        {
            Some(index) => {
                debug!(key, index, "Updating config row");
                self.store.update_row(CONFIG_TABLE, index, row).await
            }
            None => {
                debug!(key, "Appending config row");
                self.store.append_row(CONFIG_TABLE, row).await
            }
        }
    }

    /// All non-blank entries in table order.
    pub async fn entries(&self) -> Result<Vec<(String, String)>, RepositoryError> {
        let rows = self.store.read_all_rows(CONFIG_TABLE).await?;
        Ok(rows
            .into_iter()
            .filter(|row| row.first().is_some_and(|k| !k.is_empty()))
            .map(|row| {
                let key = row.first().cloned().unwrap_or_default();
                let value = row.get(1).cloned().unwrap_or_default();
                (key, value)
            })
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        match self.get(key).await? {
            Some(json) if !json.is_empty() => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| RepositoryError::Serialization(format!("{}: {}", key, e))),
            _ => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let json =
            serde_json::to_string(value).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.set(key, &json).await
    }
}

#[async_trait]
impl TrustStateRepository for ConfigTable {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<TrustState>, RepositoryError> {
        self.get_json(&format!("{}{}", TRUST_STATE_PREFIX, agent_id)).await
    }

    async fn save(&self, agent_id: &AgentId, state: &TrustState) -> Result<(), RepositoryError> {
        self.set_json(&format!("{}{}", TRUST_STATE_PREFIX, agent_id), state).await
    }
}

#[async_trait]
impl ScanReportRepository for ConfigTable {
    async fn save(&self, report: &ScanReport) -> Result<(), RepositoryError> {
        self.set_json(&format!("{}{}", SCAN_REPORT_PREFIX, report.agent_id), report).await
    }

    async fn latest(&self) -> Result<Vec<ScanReport>, RepositoryError> {
        let mut reports = Vec::new();
        for (key, json) in self.entries().await? {
            if !key.starts_with(SCAN_REPORT_PREFIX) || json.is_empty() {
                continue;
            }
            match serde_json::from_str::<ScanReport>(&json) {
                Ok(report) => reports.push(report),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable scan report"),
            }
        }
        reports.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(reports)
    }
}

#[async_trait]
impl FollowUpRepository for ConfigTable {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<FollowUp>, RepositoryError> {
        self.get_json(&format!("{}{}", FOLLOW_UP_PREFIX, agent_id)).await
    }

    async fn save(&self, agent_id: &AgentId, follow_up: Option<&FollowUp>) -> Result<(), RepositoryError> {
        let key = format!("{}{}", FOLLOW_UP_PREFIX, agent_id);
        match follow_up {
            Some(follow_up) => self.set_json(&key, follow_up).await,
            None => self.set(&key, "").await,
        }
    }
}
