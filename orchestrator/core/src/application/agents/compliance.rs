// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Compliance agent: checks that every installed layer has its required
//! environment variables and its direct dependencies installed. Gaps are
//! logged to `compliance_checks`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::application::registry::LayerRegistry;
use crate::domain::action::{ActionResult, AgentAction};
use crate::domain::agent::{AgentContext, DomainAgent};
use crate::domain::layer::LayerId;
use crate::domain::repository::TableStore;
use crate::domain::scan::{Finding, ScanReport};
use crate::domain::trust::TrustLevel;

pub const COMPLIANCE_CHECKS_TABLE: &str = "compliance_checks";
pub const RECORD_GAP_ACTION: &str = "record-compliance-gap";

pub struct ComplianceAgent {
    store: Arc<dyn TableStore>,
    registry: LayerRegistry,
    installed: Vec<LayerId>,
    present_env: HashSet<String>,
}

impl ComplianceAgent {
    pub fn new(
        store: Arc<dyn TableStore>,
        registry: LayerRegistry,
        installed: Vec<LayerId>,
        present_env: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            registry,
            installed,
            present_env: present_env.into_iter().collect(),
        }
    }

    /// Snapshot the process environment for the variables the layers need.
    pub fn from_environment(store: Arc<dyn TableStore>, registry: LayerRegistry, installed: Vec<LayerId>) -> Self {
        let resolved = registry.resolve_dependencies(&installed);
        let present: Vec<String> = registry
            .required_env_vars(&resolved)
            .into_iter()
            .filter(|var| std::env::var(var).is_ok_and(|v| !v.is_empty()))
            .collect();
        Self::new(store, registry, installed, present)
    }
}

#[async_trait]
impl DomainAgent for ComplianceAgent {
    async fn scan(&self, ctx: &AgentContext) -> ScanReport {
        let mut findings = Vec::new();

        for violation in self.registry.validate_dependencies(&self.installed) {
            findings.push(
                Finding::warning(format!(
                    "Layer '{}' is installed without its dependency '{}'",
                    violation.layer, violation.missing_dependency
                ))
                .with_suggestion(format!("trellis install retrofit {}", violation.layer)),
            );
        }

        let resolved = self.registry.resolve_dependencies(&self.installed);
        for layer in &resolved {
            for var in layer.env_vars.iter().filter(|v| !self.present_env.contains(*v)) {
                findings.push(
                    Finding::warning(format!("Layer '{}' requires {}, which is not set", layer.id, var))
                        .with_metric("missing_configuration", 1.0, 0.0)
                        .with_suggestion(format!("set {}", var)),
                );
            }
        }

        if findings.is_empty() {
            findings.push(Finding::info(format!(
                "{} installed layers meet their configuration requirements",
                resolved.len()
            )));
        }

        ScanReport::new(ctx.agent_id.clone(), ctx.layer_id.clone(), findings)
    }

    fn assess(&self, ctx: &AgentContext, report: &ScanReport) -> Vec<AgentAction> {
        report
            .findings
            .iter()
            .filter(|f| f.is_alert())
            .map(|f| {
                AgentAction::propose(
                    ctx.agent_id.clone(),
                    RECORD_GAP_ACTION,
                    f.message.clone(),
                    f.suggested_action.clone().unwrap_or_default(),
                    TrustLevel::Recommend,
                )
            })
            .collect()
    }

    async fn execute(&self, ctx: &AgentContext, action: &AgentAction) -> ActionResult {
        let row = vec![
            Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            ctx.layer_id.to_string(),
            action.target.clone(),
            "open".to_string(),
        ];
        match self.store.append_row(COMPLIANCE_CHECKS_TABLE, row).await {
            Ok(()) => ActionResult::success("Compliance gap recorded"),
            Err(e) => ActionResult::failure(format!("Could not record compliance gap: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::AgentId;
    use crate::domain::catalog::{ALL_LAYERS, ALL_SCHEMAS, COMPLIANCE, CONTENT, CORE, PAGES, RELATIONSHIPS};
    use crate::domain::scan::OverallHealth;
    use crate::infrastructure::repositories::InMemoryTableStore;

    fn context() -> AgentContext {
        AgentContext {
            agent_id: AgentId::from("compliance-agent"),
            layer_id: LayerId::from(COMPLIANCE),
            config: ALL_LAYERS
                .iter()
                .find(|l| l.id.as_str() == COMPLIANCE)
                .and_then(|l| l.agent.clone())
                .unwrap(),
            trust_level: TrustLevel::Recommend,
            records: vec![],
        }
    }

    fn ids(names: &[&str]) -> Vec<LayerId> {
        names.iter().map(|n| LayerId::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_missing_env_and_dependencies_are_flagged() {
        let store = InMemoryTableStore::with_schemas(&ALL_SCHEMAS);
        let agent = ComplianceAgent::new(
            Arc::new(store.clone()),
            LayerRegistry::builtin(),
            ids(&[CORE, CONTENT, RELATIONSHIPS, COMPLIANCE]),
            vec!["CRM_API_KEY".to_string()],
        );
        let ctx = context();

        let report = agent.scan(&ctx).await;
        assert_eq!(report.overall_health, OverallHealth::Warning);

        let messages: Vec<_> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("without its dependency 'pages'")));
        assert!(messages.iter().any(|m| m.contains("CRM_LOCATION_ID")));
        assert!(!messages.iter().any(|m| m.contains("requires CRM_API_KEY")));

        let actions = agent.assess(&ctx, &report);
        assert_eq!(actions.len(), report.findings.len());
        assert!(agent.execute(&ctx, &actions[0]).await.success);
        assert_eq!(store.read_all_rows(COMPLIANCE_CHECKS_TABLE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fully_configured_deployment_is_healthy() {
        let store = Arc::new(InMemoryTableStore::with_schemas(&ALL_SCHEMAS));
        let agent = ComplianceAgent::new(
            store,
            LayerRegistry::builtin(),
            ids(&[CORE, PAGES]),
            vec![
                "STORE_SPREADSHEET_ID".to_string(),
                "STORE_SERVICE_ACCOUNT_JSON".to_string(),
                "CONTENT_API_KEY".to_string(),
            ],
        );
        let report = agent.scan(&context()).await;
        assert_eq!(report.overall_health, OverallHealth::Healthy);
    }
}
