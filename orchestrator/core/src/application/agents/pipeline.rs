// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Relationship-pipeline agent.
//!
//! Flags pipeline items with no activity for [`STALL_DAYS`] and, with enough
//! trust, tags their contacts in the external CRM and drafts follow-up
//! outreach through the content service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::dispatcher::route_generation_request;
use crate::domain::action::{ActionResult, AgentAction};
use crate::domain::agent::{AgentContext, DomainAgent};
use crate::domain::catalog::EVENT_LOG_TABLE;
use crate::domain::content::{ContentGenerator, GenerationRequestType};
use crate::domain::layer::LayerId;
use crate::domain::relationship::{external_to_row, row_to_external, RelationshipService};
use crate::domain::repository::{RepositoryError, Row, TableStore};
use crate::domain::scan::{Finding, ScanReport};
use crate::domain::trust::TrustLevel;

pub const STALL_DAYS: i64 = 14;
pub const TAG_STALLED_ACTION: &str = "tag-stalled-contacts";
pub const DRAFT_OUTREACH_ACTION: &str = "draft-outreach";
pub const STALLED_TAG: &str = "stalled";

const PIPELINE_TABLE: &str = "pipeline";
const CONTACTS_TABLE: &str = "contacts";
const CLOSED_STAGES: [&str; 2] = ["won", "lost"];

pub struct PipelineAgent {
    store: Arc<dyn TableStore>,
    relationships: Arc<dyn RelationshipService>,
    content: Option<Arc<dyn ContentGenerator>>,
    installed: Vec<LayerId>,
}

impl PipelineAgent {
    pub fn new(
        store: Arc<dyn TableStore>,
        relationships: Arc<dyn RelationshipService>,
        content: Option<Arc<dyn ContentGenerator>>,
        installed: Vec<LayerId>,
    ) -> Self {
        Self {
            store,
            relationships,
            content,
            installed,
        }
    }

    /// Contact ids of open items idle for longer than the stall window.
    async fn stalled_contacts(&self) -> Result<Vec<String>, RepositoryError> {
        let columns = self.columns(PIPELINE_TABLE).await?;
        let idx = |name: &str| columns.iter().position(|c| c == name);
        let (Some(contact), Some(stage), Some(activity)) =
            (idx("contact_id"), idx("stage"), idx("last_activity_at"))
        else {
            return Err(RepositoryError::Malformed("pipeline table lacks required columns".to_string()));
        };

        let cutoff = Utc::now() - Duration::days(STALL_DAYS);
        let rows = self.store.read_all_rows(PIPELINE_TABLE).await?;

        Ok(rows
            .iter()
            .filter(|row| {
                let stage = cell(row, stage);
                !stage.is_empty() && !CLOSED_STAGES.contains(&stage)
            })
            .filter(|row| {
                DateTime::parse_from_rfc3339(cell(row, activity))
                    .map(|at| at.with_timezone(&Utc) < cutoff)
                    .unwrap_or(false)
            })
            .map(|row| cell(row, contact).to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, RepositoryError> {
        self.store
            .list_tables()
            .await?
            .into_iter()
            .find(|t| t.name == table)
            .map(|t| t.columns)
            .ok_or_else(|| RepositoryError::TableNotFound(table.to_string()))
    }

    async fn tag_contacts(&self, contact_ids: &[String]) -> Result<usize, RepositoryError> {
        let columns = self.columns(CONTACTS_TABLE).await?;
        let id_idx = columns.iter().position(|c| c == "id");
        let ext_idx = columns.iter().position(|c| c == "external_id");
        let rows = self.store.read_all_rows(CONTACTS_TABLE).await?;

        let mut tagged = 0;
        for (index, row) in rows.iter().enumerate() {
            let Some(id) = id_idx.map(|i| cell(row, i)) else {
                break;
            };
            if !contact_ids.iter().any(|c| c == id) {
                continue;
            }

            let mut external_id = ext_idx.map(|i| cell(row, i).to_string()).unwrap_or_default();
            if external_id.is_empty() {
                match self.relationships.upsert_contact(&row_to_external(&columns, row)).await {
                    Ok(Some(contact)) => {
                        let mut fields = contact.fields.clone();
                        fields.insert("id".to_string(), Value::String(contact.id.clone()));
                        let synced = external_to_row(&columns, &fields, Some(row));
                        self.store.update_row(CONTACTS_TABLE, index, synced).await?;
                        external_id = contact.id;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(contact = id, error = %e, "Contact sync failed");
                        continue;
                    }
                }
            }

            self.relationships
                .add_tags(&external_id, &[STALLED_TAG.to_string()])
                .await;
            tagged += 1;
        }
        Ok(tagged)
    }

    async fn draft_outreach(&self, ctx: &AgentContext, detail: &str) -> ActionResult {
        let Some(content) = &self.content else {
            return ActionResult::failure("content service is not configured");
        };
        if let Err(e) = route_generation_request(GenerationRequestType::OutreachMessage, &self.installed) {
            return ActionResult::failure(e.to_string());
        }

        let prompt = format!(
            "Write a short, friendly follow-up message for contacts whose deals have had no activity for {} days. Contacts: {}",
            STALL_DAYS, detail
        );
        let draft = match content.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => return ActionResult::failure(e.to_string()),
        };

        let row = vec![
            Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            ctx.layer_id.to_string(),
            ctx.agent_id.to_string(),
            "outreach_draft".to_string(),
            draft,
        ];
        match self.store.append_row(EVENT_LOG_TABLE, row).await {
            Ok(()) => ActionResult::success("Outreach draft saved for review"),
            Err(e) => ActionResult::failure(format!("Could not save draft: {}", e)),
        }
    }
}

fn cell(row: &Row, index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

#[async_trait]
impl DomainAgent for PipelineAgent {
    async fn scan(&self, ctx: &AgentContext) -> ScanReport {
        match self.stalled_contacts().await {
            Ok(stalled) if stalled.is_empty() => ScanReport::new(
                ctx.agent_id.clone(),
                ctx.layer_id.clone(),
                vec![Finding::info("No stalled pipeline items")],
            ),
            Ok(stalled) => ScanReport::new(
                ctx.agent_id.clone(),
                ctx.layer_id.clone(),
                vec![Finding::warning(format!("{} pipeline items stalled", stalled.len()))
                    .with_metric("stalled_items", stalled.len() as f64, 0.0)
                    .with_suggestion(stalled.join(","))],
            ),
            Err(e) => {
                warn!(error = %e, "Pipeline scan degraded");
                ScanReport::degraded(ctx.agent_id.clone(), ctx.layer_id.clone(), format!("Pipeline unavailable: {}", e))
            }
        }
    }

    fn assess(&self, ctx: &AgentContext, report: &ScanReport) -> Vec<AgentAction> {
        let Some(finding) = report
            .findings
            .iter()
            .find(|f| f.metric.as_deref() == Some("stalled_items"))
        else {
            return Vec::new();
        };
        let contacts = finding.suggested_action.clone().unwrap_or_default();

        let mut actions = vec![AgentAction::propose(
            ctx.agent_id.clone(),
            TAG_STALLED_ACTION,
            CONTACTS_TABLE,
            contacts.clone(),
            TrustLevel::AutoLow,
        )];
        if self.content.is_some() {
            actions.push(AgentAction::propose(
                ctx.agent_id.clone(),
                DRAFT_OUTREACH_ACTION,
                EVENT_LOG_TABLE,
                contacts,
                TrustLevel::AutoMedium,
            ));
        }
        actions
    }

    async fn execute(&self, ctx: &AgentContext, action: &AgentAction) -> ActionResult {
        match action.action_type.as_str() {
            TAG_STALLED_ACTION => {
                let ids: Vec<String> = action.detail.split(',').map(|s| s.trim().to_string()).collect();
                match self.tag_contacts(&ids).await {
                    Ok(n) => {
                        debug!(tagged = n, "Tagged stalled contacts");
                        ActionResult::success(format!("Tagged {} contacts", n))
                    }
                    Err(e) => ActionResult::failure(e.to_string()),
                }
            }
            DRAFT_OUTREACH_ACTION => self.draft_outreach(ctx, &action.detail).await,
            other => ActionResult::failure(format!("Unknown action type '{}'", other)),
        }
    }
}
