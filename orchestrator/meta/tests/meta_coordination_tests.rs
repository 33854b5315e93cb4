// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use trellis_core::application::ledger::load_ledger;
use trellis_core::application::{CycleService, Installer, LayerRegistry};
use trellis_core::domain::agent::AgentId;
use trellis_core::domain::catalog::{
    ALL_LAYERS, CONTENT, COORDINATION_LOG_TABLE, CORE, INFRA, ORCHESTRATOR, ORCHESTRATOR_LEDGER_TABLE, PAGES,
};
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::learning::Outcome;
use trellis_core::domain::repository::{ScanReportRepository, TableStore};
use trellis_core::domain::scan::{Finding, OverallHealth, ScanReport};
use trellis_core::infrastructure::event_bus::EventBus;
use trellis_core::infrastructure::repositories::{ConfigTable, InMemoryScanReportRepository, InMemoryTableStore};
use trellis_meta::application::meta_agent::{LOG_COORDINATION_ACTION, SYSTEM_HEALTH_METRIC};
use trellis_meta::application::{aggregate_health, builtin_layer_names, MetaCoordinatorAgent};

fn ids(names: &[&str]) -> Vec<LayerId> {
    names.iter().map(|n| LayerId::from(*n)).collect()
}

fn report(layer: &str, findings: Vec<Finding>) -> ScanReport {
    ScanReport::new(AgentId::new(format!("{}-agent", layer)), LayerId::from(layer), findings)
}

#[tokio::test]
async fn test_orchestrator_cycle_logs_cross_layer_issue() {
    let store = Arc::new(InMemoryTableStore::new());
    let results = Installer::new(LayerRegistry::builtin())
        .install_new_build(&ids(&[CORE, INFRA, ORCHESTRATOR, PAGES, CONTENT]), store.as_ref())
        .await;
    assert!(results.iter().all(|r| r.success));

    let reports = Arc::new(InMemoryScanReportRepository::new());
    reports.save(&report(CONTENT, vec![Finding::info("publishing on schedule")])).await.unwrap();
    reports
        .save(&report(PAGES, vec![Finding::critical("conversion rate collapsed")]))
        .await
        .unwrap();

    let config_table = Arc::new(ConfigTable::new(store.clone()));
    let service = CycleService::new(
        store.clone(),
        config_table.clone(),
        config_table,
        reports.clone(),
        EventBus::new(64),
    );
    let layer = ALL_LAYERS.iter().find(|l| l.id.as_str() == ORCHESTRATOR).unwrap();
    let agent = Arc::new(MetaCoordinatorAgent::new(store.clone(), reports.clone()));

    let summary = service.run_agent(layer, agent.clone()).await.unwrap();
    assert_eq!(summary.outcome.report.overall_health, OverallHealth::Critical);
    assert_eq!(summary.outcome.executed.len(), 1);

    let log = store.read_all_rows(COORDINATION_LOG_TABLE).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0][2], "content,pages");

    // the orchestrator's own report is now part of the system view
    let latest = reports.latest().await.unwrap();
    assert_eq!(latest.len(), 3);
    let health = aggregate_health(&latest, &builtin_layer_names());
    assert_eq!(health.score, 33);
    assert!(health
        .layers
        .iter()
        .any(|l| l.name == "Meta-Orchestrator" && l.health == OverallHealth::Critical));

    // once pages recovers, the next cycle measures the logged coordination
    reports.save(&report(PAGES, vec![Finding::info("converting again")])).await.unwrap();
    let next = service.run_agent(layer, agent).await.unwrap();
    assert!(next.outcome.executed.is_empty());
    assert_eq!(next.records.len(), 1);

    let ledger = load_ledger(store.as_ref(), ORCHESTRATOR_LEDGER_TABLE).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].metric, SYSTEM_HEALTH_METRIC);
    assert_eq!((ledger[0].before, ledger[0].after), (50.0, 100.0));
    assert_eq!(ledger[0].outcome, Outcome::Positive);
    assert_eq!(ledger[0].action_type, LOG_COORDINATION_ACTION);
}
