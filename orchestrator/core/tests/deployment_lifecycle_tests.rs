// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use trellis_core::application::agents::InfrastructureHealthAgent;
use trellis_core::application::dispatcher::{accessible_sheets, is_sheet_accessible};
use trellis_core::application::{CycleService, Installer, LayerRegistry};
use trellis_core::domain::catalog::{ALL_LAYERS, CORE, INFRA, RELATIONSHIPS};
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::repository::{ScanReportRepository, TableStore, TrustStateRepository};
use trellis_core::domain::scan::OverallHealth;
use trellis_core::infrastructure::event_bus::{DomainEvent, EventBus};
use trellis_core::infrastructure::repositories::{ConfigTable, InMemoryScanReportRepository, JsonFileTableStore};
use tempfile::TempDir;

fn ids(names: &[&str]) -> Vec<LayerId> {
    names.iter().map(|n| LayerId::from(*n)).collect()
}

#[tokio::test]
async fn test_fresh_install_then_healthy_infra_cycle() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileTableStore::open(dir.path().join("store.json")).await.unwrap());
    let installed = ids(&[CORE, INFRA]);

    let results = Installer::new(LayerRegistry::builtin())
        .install_new_build(&installed, store.as_ref())
        .await;
    assert!(results.iter().all(|r| r.success));

    let config_table = Arc::new(ConfigTable::new(store.clone()));
    let service = CycleService::new(
        store.clone(),
        config_table.clone(),
        config_table.clone(),
        config_table,
        EventBus::new(64),
    );
    let infra = ALL_LAYERS.iter().find(|l| l.id.as_str() == INFRA).unwrap();
    let agent = Arc::new(InfrastructureHealthAgent::new(
        store.clone(),
        LayerRegistry::builtin(),
        installed.clone(),
    ));

    let summary = service.run_agent(infra, agent).await.unwrap();
    assert_eq!(summary.outcome.report.overall_health, OverallHealth::Healthy);
    assert!(summary.outcome.executed.is_empty());

    // Trust state and the scan report landed in the config table on disk
    let reopened = ConfigTable::new(Arc::new(
        JsonFileTableStore::open(dir.path().join("store.json")).await.unwrap(),
    ));
    let state = reopened.load(&summary.agent_id).await.unwrap().unwrap();
    assert_eq!(state.level, infra.agent.as_ref().unwrap().initial_trust);

    let reports = reopened.latest().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].agent_id, summary.agent_id);
}

#[tokio::test]
async fn test_retrofit_adds_relationships_and_unlocks_contacts() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileTableStore::open(dir.path().join("store.json")).await.unwrap());
    let installer = Installer::new(LayerRegistry::builtin());

    installer.install_new_build(&ids(&[CORE, INFRA]), store.as_ref()).await;
    assert!(!is_sheet_accessible("contacts", &ids(&[CORE, INFRA])));

    let existing = store.list_tables().await.unwrap();
    let results = installer
        .install_retrofit(&LayerId::from(RELATIONSHIPS), &existing, store.as_ref(), Some(store.as_ref()))
        .await;
    assert!(results.iter().all(|r| r.success));

    let core = results.iter().find(|r| r.layer_id.as_str() == CORE).unwrap();
    assert!(core.tables_created.is_empty(), "core tables already existed");

    let after = store.list_tables().await.unwrap();
    assert!(after.iter().any(|t| t.name == "contacts"));
    for table in &existing {
        assert!(after.iter().any(|t| t.name == table.name));
    }

    let installed = ids(&[CORE, INFRA, RELATIONSHIPS]);
    assert!(is_sheet_accessible("contacts", &installed));
    assert!(accessible_sheets(&installed).contains(&"pipeline".to_string()));
}

#[tokio::test]
async fn test_degraded_infra_cycle_publishes_events() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileTableStore::open(dir.path().join("store.json")).await.unwrap());
    Installer::new(LayerRegistry::builtin())
        .install_new_build(&ids(&[CORE]), store.as_ref())
        .await;

    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let config_table = Arc::new(ConfigTable::new(store.clone()));
    let service = CycleService::new(
        store.clone(),
        config_table.clone(),
        config_table,
        Arc::new(InMemoryScanReportRepository::new()),
        bus,
    );

    // infra is selected but its tables were never installed
    let infra = ALL_LAYERS.iter().find(|l| l.id.as_str() == INFRA).unwrap();
    let agent = Arc::new(InfrastructureHealthAgent::new(
        store.clone(),
        LayerRegistry::builtin(),
        ids(&[CORE, INFRA]),
    ));

    let summary = service.run_agent(infra, agent).await.unwrap();
    assert_eq!(summary.outcome.report.overall_health, OverallHealth::Critical);

    // health_checks is missing, so recording the repair fails and is reported
    assert!(summary.outcome.executed.iter().all(|a| a.result.as_ref().is_some_and(|r| !r.success)));

    let mut saw_completed = false;
    while let Ok(event) = rx.try_recv() {
        if let DomainEvent::Cycle(trellis_core::domain::events::CycleEvent::CycleCompleted { health, .. }) = event {
            assert_eq!(health, OverallHealth::Critical);
            saw_completed = true;
        }
    }
    assert!(saw_completed);
}
