// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Meta-coordinator agent.
//!
//! Its scan input is the latest report of every other agent. Cross-layer
//! issues become coordination actions that are written to
//! `coordination_log`; the agent never acts on another layer directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use trellis_core::domain::action::{ActionResult, AgentAction};
use trellis_core::domain::agent::{AgentContext, AgentId, DomainAgent};
use trellis_core::domain::catalog::COORDINATION_LOG_TABLE;
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::repository::{ScanReportRepository, TableStore};
use trellis_core::domain::scan::{Finding, OverallHealth, ScanReport};
use trellis_core::domain::trust::TrustLevel;

use crate::application::aggregator::{builtin_layer_names, detect_cross_layer_issues, health_score};
use crate::domain::CrossLayerIssue;

pub const LOG_COORDINATION_ACTION: &str = "log-coordination";
/// Carried by the closing summary finding; the agent's declared objective.
pub const SYSTEM_HEALTH_METRIC: &str = "system_health_score";

/// Build the meta-coordinator's own report from the sub-agents' reports.
pub fn meta_scan(
    agent_id: AgentId,
    layer_id: LayerId,
    sub_reports: &[ScanReport],
    layer_names: &HashMap<LayerId, String>,
) -> ScanReport {
    let names_with = |health: OverallHealth| {
        sub_reports
            .iter()
            .filter(|r| r.overall_health == health)
            .map(|r| {
                layer_names
                    .get(&r.layer_id)
                    .cloned()
                    .unwrap_or_else(|| r.layer_id.to_string())
            })
            .collect::<Vec<_>>()
    };

    let mut findings = Vec::new();

    let critical = names_with(OverallHealth::Critical);
    if !critical.is_empty() {
        findings.push(Finding::critical(format!("Critical layers: {}", critical.join(", "))));
    }
    let warning = names_with(OverallHealth::Warning);
    if !warning.is_empty() {
        findings.push(Finding::warning(format!("Layers needing attention: {}", warning.join(", "))));
    }

    findings.extend(detect_cross_layer_issues(sub_reports).iter().map(CrossLayerIssue::to_finding));

    let total: usize = sub_reports.iter().map(|r| r.findings.len()).sum();
    findings.push(
        Finding::info(format!("{} findings across {} agents", total, sub_reports.len()))
            .with_metric(SYSTEM_HEALTH_METRIC, f64::from(health_score(sub_reports)), 100.0),
    );

    ScanReport::new(agent_id, layer_id, findings)
}

pub struct MetaCoordinatorAgent {
    store: Arc<dyn TableStore>,
    reports: Arc<dyn ScanReportRepository>,
    layer_names: HashMap<LayerId, String>,
}

impl MetaCoordinatorAgent {
    pub fn new(store: Arc<dyn TableStore>, reports: Arc<dyn ScanReportRepository>) -> Self {
        Self {
            store,
            reports,
            layer_names: builtin_layer_names(),
        }
    }
}

#[async_trait]
impl DomainAgent for MetaCoordinatorAgent {
    async fn scan(&self, ctx: &AgentContext) -> ScanReport {
        match self.reports.latest().await {
            Ok(reports) => {
                let sub_reports: Vec<ScanReport> = reports
                    .into_iter()
                    .filter(|r| r.agent_id != ctx.agent_id)
                    .collect();
                meta_scan(ctx.agent_id.clone(), ctx.layer_id.clone(), &sub_reports, &self.layer_names)
            }
            Err(e) => {
                warn!(error = %e, "Meta scan degraded");
                ScanReport::degraded(
                    ctx.agent_id.clone(),
                    ctx.layer_id.clone(),
                    format!("Sub-agent reports unavailable: {}", e),
                )
            }
        }
    }

    fn assess(&self, ctx: &AgentContext, report: &ScanReport) -> Vec<AgentAction> {
        report
            .findings
            .iter()
            .filter_map(CrossLayerIssue::from_finding)
            .map(|issue| {
                AgentAction::propose(
                    ctx.agent_id.clone(),
                    LOG_COORDINATION_ACTION,
                    issue.summary(),
                    issue.recommendation,
                    TrustLevel::Recommend,
                )
            })
            .collect()
    }

    async fn execute(&self, _ctx: &AgentContext, action: &AgentAction) -> ActionResult {
        let Some(issue) = CrossLayerIssue::from_summary(&action.target, action.detail.clone()) else {
            return ActionResult::failure(format!("Unrecognized coordination target '{}'", action.target));
        };
        let row = vec![
            Uuid::new_v4().to_string(),
            Utc::now().to_rfc3339(),
            issue.layer_list(),
            issue.issue,
            issue.recommendation,
        ];
        match self.store.append_row(COORDINATION_LOG_TABLE, row).await {
            Ok(()) => ActionResult::success("Coordination issue logged"),
            Err(e) => ActionResult::failure(format!("Could not log coordination issue: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::domain::catalog::{ALL_LAYERS, ALL_SCHEMAS, CONTENT, INFRA, ORCHESTRATOR, PAGES};
    use trellis_core::domain::scan::Severity;
    use trellis_core::infrastructure::repositories::{InMemoryScanReportRepository, InMemoryTableStore};

    fn context() -> AgentContext {
        AgentContext {
            agent_id: AgentId::from("orchestrator-agent"),
            layer_id: LayerId::from(ORCHESTRATOR),
            config: ALL_LAYERS
                .iter()
                .find(|l| l.id.as_str() == ORCHESTRATOR)
                .and_then(|l| l.agent.clone())
                .unwrap(),
            trust_level: TrustLevel::Recommend,
            records: vec![],
        }
    }

    fn report(layer: &str, findings: Vec<Finding>) -> ScanReport {
        ScanReport::new(AgentId::new(format!("{}-agent", layer)), LayerId::from(layer), findings)
    }

    #[test]
    fn test_meta_scan_names_layers_and_counts_findings() {
        let subs = vec![
            report(INFRA, vec![Finding::warning("drift"), Finding::info("ok")]),
            report(CONTENT, vec![Finding::info("ok")]),
            report(PAGES, vec![Finding::critical("no conversions")]),
        ];
        let meta = meta_scan(
            AgentId::from("orchestrator-agent"),
            LayerId::from(ORCHESTRATOR),
            &subs,
            &builtin_layer_names(),
        );

        let messages: Vec<_> = meta.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages[0], "Critical layers: Page Conversion");
        assert_eq!(messages[1], "Layers needing attention: Infrastructure Health");
        assert!(messages[2].starts_with("content,pages: "));
        assert_eq!(*messages.last().unwrap(), "4 findings across 3 agents");
        assert_eq!(meta.overall_health, OverallHealth::Critical);

        let summary = meta.findings.last().unwrap();
        assert_eq!(summary.metric.as_deref(), Some(SYSTEM_HEALTH_METRIC));
        assert_eq!(summary.current_value, Some(50.0));
    }

    #[test]
    fn test_meta_scan_of_healthy_system_is_info_only() {
        let meta = meta_scan(
            AgentId::from("orchestrator-agent"),
            LayerId::from(ORCHESTRATOR),
            &[report(INFRA, vec![Finding::info("ok")])],
            &HashMap::new(),
        );
        assert_eq!(meta.findings.len(), 1);
        assert_eq!(meta.findings[0].severity, Severity::Info);
        assert_eq!(meta.overall_health, OverallHealth::Healthy);
    }

    #[tokio::test]
    async fn test_coordination_issues_are_logged() {
        let store = InMemoryTableStore::with_schemas(&ALL_SCHEMAS);
        let reports = Arc::new(InMemoryScanReportRepository::new());
        reports.save(&report(CONTENT, vec![Finding::info("ok")])).await.unwrap();
        reports.save(&report(PAGES, vec![Finding::critical("broken")])).await.unwrap();
        // its own previous report is not part of its input
        reports
            .save(&report(ORCHESTRATOR, vec![Finding::critical("stale")]))
            .await
            .unwrap();

        let agent = MetaCoordinatorAgent::new(Arc::new(store.clone()), reports);
        let ctx = context();

        let scan = agent.scan(&ctx).await;
        assert!(scan.findings.iter().any(|f| f.message == "2 findings across 2 agents"));

        let actions = agent.assess(&ctx, &scan);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, LOG_COORDINATION_ACTION);

        assert!(agent.execute(&ctx, &actions[0]).await.success);
        let rows = store.read_all_rows(COORDINATION_LOG_TABLE).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "content,pages");
        assert!(rows[0][4].starts_with("Prioritize conversion"));
    }
}
