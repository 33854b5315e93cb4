// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent strategy catalog.
//!
//! | Agent id | Strategy |
//! |----------|----------|
//! | `infra-agent` | [`InfrastructureHealthAgent`] |
//! | `compliance-agent` | [`ComplianceAgent`] |
//! | `pipeline-agent` | [`PipelineAgent`] |
//! | `orchestrator-agent` | [`MetaCoordinatorAgent`] |
//!
//! `pages-agent` and `content-agent` have no strategy and are left unscheduled.

use std::sync::Arc;

use tracing::warn;

use trellis_core::application::agents::{ComplianceAgent, InfrastructureHealthAgent, PipelineAgent};
use trellis_core::application::LayerRegistry;
use trellis_core::domain::agent::{AgentId, DomainAgent};
use trellis_core::domain::content::ContentGenerator;
use trellis_core::domain::layer::{LayerId, LayerManifest};
use trellis_core::domain::relationship::RelationshipService;
use trellis_core::domain::repository::{ScanReportRepository, TableStore};

use crate::application::meta_agent::MetaCoordinatorAgent;

/// Collaborators a strategy may need.
#[derive(Clone)]
pub struct AgentDependencies {
    pub store: Arc<dyn TableStore>,
    pub reports: Arc<dyn ScanReportRepository>,
    pub relationships: Arc<dyn RelationshipService>,
    pub content: Option<Arc<dyn ContentGenerator>>,
    pub registry: LayerRegistry,
    pub installed: Vec<LayerId>,
}

pub fn strategy_for(agent_id: &AgentId, deps: &AgentDependencies) -> Option<Arc<dyn DomainAgent>> {
    let agent: Arc<dyn DomainAgent> = match agent_id.as_str() {
        "infra-agent" => Arc::new(InfrastructureHealthAgent::new(
            deps.store.clone(),
            deps.registry.clone(),
            deps.installed.clone(),
        )),
        "compliance-agent" => Arc::new(ComplianceAgent::from_environment(
            deps.store.clone(),
            deps.registry.clone(),
            deps.installed.clone(),
        )),
        "pipeline-agent" => Arc::new(PipelineAgent::new(
            deps.store.clone(),
            deps.relationships.clone(),
            deps.content.clone(),
            deps.installed.clone(),
        )),
        "orchestrator-agent" => Arc::new(MetaCoordinatorAgent::new(deps.store.clone(), deps.reports.clone())),
        _ => return None,
    };
    Some(agent)
}

/// Every agent-bearing layer in the installed closure that has a strategy,
/// in dependency order.
pub fn installed_agents(deps: &AgentDependencies) -> Vec<(LayerManifest, Arc<dyn DomainAgent>)> {
    let mut agents = Vec::new();
    for layer in deps.registry.resolve_dependencies(&deps.installed) {
        let Some(config) = &layer.agent else {
            continue;
        };
        match strategy_for(&config.agent_id, deps) {
            Some(agent) => agents.push((layer.clone(), agent)),
            None => warn!(agent_id = %config.agent_id, layer = %layer.id, "No strategy registered, agent not scheduled"),
        }
    }
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use trellis_core::domain::catalog::{CORE, INFRA, ORCHESTRATOR, PAGES, RELATIONSHIPS};
    use trellis_core::domain::errors::LayerError;
    use trellis_core::domain::relationship::Contact;
    use trellis_core::infrastructure::repositories::{InMemoryScanReportRepository, InMemoryTableStore};

    struct NoCrm;

    #[async_trait]
    impl RelationshipService for NoCrm {
        async fn upsert_contact(&self, _fields: &Map<String, Value>) -> Result<Option<Contact>, LayerError> {
            Ok(None)
        }

        async fn add_tags(&self, _contact_id: &str, _tags: &[String]) {}
    }

    fn deps(installed: &[&str]) -> AgentDependencies {
        AgentDependencies {
            store: Arc::new(InMemoryTableStore::new()),
            reports: Arc::new(InMemoryScanReportRepository::new()),
            relationships: Arc::new(NoCrm),
            content: None,
            registry: LayerRegistry::builtin(),
            installed: installed.iter().map(|l| LayerId::from(*l)).collect(),
        }
    }

    #[test]
    fn test_known_agents_resolve() {
        let deps = deps(&[CORE]);
        for id in ["infra-agent", "compliance-agent", "pipeline-agent", "orchestrator-agent"] {
            assert!(strategy_for(&AgentId::from(id), &deps).is_some(), "{}", id);
        }
        assert!(strategy_for(&AgentId::from("pages-agent"), &deps).is_none());
    }

    #[test]
    fn test_installed_agents_follow_dependency_order() {
        let agents = installed_agents(&deps(&[ORCHESTRATOR, PAGES, RELATIONSHIPS]));
        let layers: Vec<_> = agents.iter().map(|(l, _)| l.id.as_str()).collect();
        // pages has no strategy; infra is pulled in by the orchestrator layer
        assert_eq!(layers, vec![INFRA, ORCHESTRATOR, RELATIONSHIPS]);
    }
}
