// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure-health agent.
//!
//! Compares the tables actually present in the store with the schema the
//! installed layers declare. Drift is reported as findings with a suggested
//! repair; executing an action only records the repair request in
//! `health_checks`. Nothing is ever repaired automatically.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::application::registry::LayerRegistry;
use crate::domain::action::{ActionResult, AgentAction};
use crate::domain::agent::{AgentContext, DomainAgent};
use crate::domain::errors::LayerError;
use crate::domain::layer::LayerId;
use crate::domain::repository::TableStore;
use crate::domain::scan::{Finding, ScanReport};
use crate::domain::trust::TrustLevel;

pub const HEALTH_CHECKS_TABLE: &str = "health_checks";
pub const RECORD_REPAIR_ACTION: &str = "record-schema-repair";

pub struct InfrastructureHealthAgent {
    store: Arc<dyn TableStore>,
    registry: LayerRegistry,
    installed: Vec<LayerId>,
}

impl InfrastructureHealthAgent {
    pub fn new(store: Arc<dyn TableStore>, registry: LayerRegistry, installed: Vec<LayerId>) -> Self {
        Self {
            store,
            registry,
            installed,
        }
    }
}

#[async_trait]
impl DomainAgent for InfrastructureHealthAgent {
    async fn scan(&self, ctx: &AgentContext) -> ScanReport {
        let existing = match self.store.list_tables().await {
            Ok(tables) => tables,
            Err(e) => {
                warn!(error = %e, "Could not list tables");
                return ScanReport::degraded(
                    ctx.agent_id.clone(),
                    ctx.layer_id.clone(),
                    format!("Store unavailable: {}", e),
                );
            }
        };

        let resolved = self.registry.resolve_dependencies(&self.installed);
        let mut findings = Vec::new();
        let mut checked = 0;

        for layer in &resolved {
            for table in &layer.provides.tables {
                let Some(schema) = self.registry.schema(table) else {
                    continue;
                };
                checked += 1;

                match existing.iter().find(|t| &t.name == table) {
                    None => {
                        let err = LayerError::SchemaMismatch {
                            table: table.clone(),
                            detail: "table is missing".to_string(),
                        };
                        findings.push(
                            Finding::critical(err.to_string())
                                .with_metric("schema_drift", schema.columns.len() as f64, 0.0)
                                .with_suggestion(format!("trellis install retrofit {}", layer.id)),
                        );
                    }
                    Some(current) => {
                        let missing = schema.missing_columns(&current.columns);
                        if missing.is_empty() {
                            continue;
                        }
                        let err = LayerError::SchemaMismatch {
                            table: table.clone(),
                            detail: format!("missing columns {}", missing.join(", ")),
                        };
                        findings.push(
                            Finding::warning(err.to_string())
                                .with_metric("schema_drift", missing.len() as f64, 0.0)
                                .with_suggestion(format!("trellis install retrofit {}", layer.id)),
                        );
                    }
                }
            }
        }

        if findings.is_empty() {
            findings.push(Finding::info(format!("All {} tables match their declared schema", checked)));
        }

        ScanReport::new(ctx.agent_id.clone(), ctx.layer_id.clone(), findings)
    }

    fn assess(&self, ctx: &AgentContext, report: &ScanReport) -> Vec<AgentAction> {
        let mut alerts: Vec<&Finding> = report.findings.iter().filter(|f| f.is_alert()).collect();
        // Missing tables first
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));

        alerts
            .into_iter()
            .filter_map(|f| {
                let suggestion = f.suggested_action.as_ref()?;
                Some(AgentAction::propose(
                    ctx.agent_id.clone(),
                    RECORD_REPAIR_ACTION,
                    f.message.clone(),
                    suggestion.clone(),
                    TrustLevel::Recommend,
                ))
            })
            .collect()
    }

    async fn execute(&self, _ctx: &AgentContext, action: &AgentAction) -> ActionResult {
        let row = vec![
            Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            action.target.clone(),
            "needs-repair".to_string(),
            action.detail.clone(),
        ];
        match self.store.append_row(HEALTH_CHECKS_TABLE, row).await {
            Ok(()) => ActionResult::success(format!("Recorded repair request: {}", action.detail)),
            Err(e) => ActionResult::failure(format!("Could not record repair request: {}", e)),
        }
    }
}
