// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-process service wiring
//!
//! Builds the store, registry and services for one deployment from its
//! `NodeConfig` so each command runs against the same JSON table store. Trust
//! state, scan reports and pending follow-ups all live in its `config` table,
//! so one command sees what an earlier one recorded.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use trellis_core::application::{CycleService, Installer, LayerRegistry, TrustAuditor};
use trellis_core::domain::content::ContentGenerator;
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::node_config::NodeConfigManifest;
use trellis_core::domain::relationship::RelationshipService;
use trellis_core::domain::repository::ScanReportRepository;
use trellis_core::infrastructure::repositories::{ConfigTable, JsonFileTableStore};
use trellis_core::infrastructure::{ContentServiceClient, EventBus, RelationshipServiceClient};
use trellis_meta::application::AgentDependencies;

pub struct EmbeddedNode {
    pub config: NodeConfigManifest,
    pub store: Arc<JsonFileTableStore>,
    pub registry: LayerRegistry,
    pub installed: Vec<LayerId>,
    pub event_bus: EventBus,
}

impl EmbeddedNode {
    /// Load and validate configuration, then open the table store it names.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = NodeConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: NodeConfigManifest) -> Result<Self> {
        let store = JsonFileTableStore::open(&config.spec.store.path)
            .await
            .with_context(|| format!("Failed to open table store at {}", config.spec.store.path))?;
        let installed = config
            .spec
            .installed_layers
            .iter()
            .map(|l| LayerId::new(l.as_str()))
            .collect();
        debug!(store = %config.spec.store.path, "Embedded node ready");

        Ok(Self {
            store: Arc::new(store),
            registry: LayerRegistry::builtin(),
            installed,
            event_bus: EventBus::with_default_capacity(),
            config,
        })
    }

    pub fn installer(&self) -> Installer {
        Installer::new(self.registry.clone()).with_event_bus(self.event_bus.clone())
    }

    /// Trust state, scan reports and follow-ups share the `config` table.
    pub fn trust_states(&self) -> Arc<ConfigTable> {
        Arc::new(ConfigTable::new(self.store.clone()))
    }

    pub fn auditor(&self) -> TrustAuditor {
        TrustAuditor::new(self.store.clone(), self.trust_states())
    }

    pub fn cycle_service(&self) -> CycleService {
        let config_table = self.trust_states();
        CycleService::new(
            self.store.clone(),
            config_table.clone(),
            config_table.clone(),
            config_table,
            self.event_bus.clone(),
        )
    }

    pub fn agent_dependencies(&self, reports: Arc<dyn ScanReportRepository>) -> AgentDependencies {
        let content: Option<Arc<dyn ContentGenerator>> = self
            .config
            .spec
            .content_service
            .as_ref()
            .map(|c| Arc::new(ContentServiceClient::from_config(c)) as Arc<dyn ContentGenerator>);

        // An unconfigured client logs and returns nothing on every call.
        let relationships: Arc<dyn RelationshipService> = match &self.config.spec.relationship_service {
            Some(c) => Arc::new(RelationshipServiceClient::from_config(c)),
            None => Arc::new(RelationshipServiceClient::new(String::new(), None, None)),
        };

        AgentDependencies {
            store: self.store.clone(),
            reports,
            relationships,
            content,
            registry: self.registry.clone(),
            installed: self.installed.clone(),
        }
    }

    /// Latest report of every agent, as persisted by earlier cycles.
    pub fn scan_reports(&self) -> Arc<ConfigTable> {
        self.trust_states()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trellis_meta::application::installed_agents;

    fn config_in(dir: &TempDir, layers: &[&str]) -> NodeConfigManifest {
        let mut config = NodeConfigManifest::default();
        config.spec.store.path = dir.path().join("store.json").display().to_string();
        config.spec.installed_layers = layers.iter().map(|l| l.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn test_from_config_opens_configured_store() {
        let dir = TempDir::new().unwrap();
        let node = EmbeddedNode::from_config(config_in(&dir, &["core", "infra"])).await.unwrap();
        assert_eq!(node.installed.len(), 2);

        let deps = node.agent_dependencies(node.scan_reports());
        let agents = installed_agents(&deps);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].0.id.as_str(), "infra");
    }

    #[tokio::test]
    async fn test_meta_cycle_reads_reports_from_earlier_commands() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir, &["core", "infra", "orchestrator"]);

        let node = EmbeddedNode::from_config(config.clone()).await.unwrap();
        node.installer()
            .install_new_build(&node.installed, node.store.as_ref())
            .await;
        let agents = installed_agents(&node.agent_dependencies(node.scan_reports()));
        let (infra, agent) = agents.iter().find(|(l, _)| l.id.as_str() == "infra").unwrap();
        node.cycle_service().run_agent(infra, agent.clone()).await.unwrap();

        // a later invocation opens the same store
        let node = EmbeddedNode::from_config(config).await.unwrap();
        let agents = installed_agents(&node.agent_dependencies(node.scan_reports()));
        let (layer, meta) = agents.iter().find(|(l, _)| l.id.as_str() == "orchestrator").unwrap();
        let summary = node.cycle_service().run_agent(layer, meta.clone()).await.unwrap();

        let findings = &summary.outcome.report.findings;
        assert!(findings.last().unwrap().message.ends_with("across 1 agents"));
        assert_eq!(node.scan_reports().latest().await.unwrap().len(), 2);
    }
}
