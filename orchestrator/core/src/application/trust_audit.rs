// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Out-of-band trust audit.
//!
//! Re-evaluates every installed agent's trust from its full ledger without
//! running a cycle. Uses the same [`evaluate_trust`] as the cycle service, so
//! a batch audit and a live cycle agree on identical inputs.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::application::ledger::load_ledger;
use crate::application::registry::LayerRegistry;
use crate::domain::agent::{AgentConfig, AgentId};
use crate::domain::layer::LayerId;
use crate::domain::repository::{TableStore, TrustStateRepository};
use crate::domain::trust::{evaluate_trust, TrustEvaluation, TrustPromotionRule, TrustState, DEFAULT_PROMOTION_RULES};

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub agent_id: AgentId,
    pub previous: TrustState,
    pub evaluation: TrustEvaluation,
}

pub struct TrustAuditor {
    store: Arc<dyn TableStore>,
    trust_states: Arc<dyn TrustStateRepository>,
    rules: Vec<TrustPromotionRule>,
}

impl TrustAuditor {
    pub fn new(store: Arc<dyn TableStore>, trust_states: Arc<dyn TrustStateRepository>) -> Self {
        Self {
            store,
            trust_states,
            rules: DEFAULT_PROMOTION_RULES.to_vec(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<TrustPromotionRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Evaluate one agent. Persists the new state only when `apply` is set.
    pub async fn audit_agent(&self, config: &AgentConfig, apply: bool) -> Result<AuditEntry> {
        let previous = self
            .trust_states
            .load(&config.agent_id)
            .await
            .with_context(|| format!("Failed to load trust state for {}", config.agent_id))?
            .unwrap_or_else(|| TrustState::initial(config.initial_trust));

        let records = load_ledger(self.store.as_ref(), &config.ledger_table)
            .await
            .with_context(|| format!("Failed to read ledger {}", config.ledger_table))?;

        let evaluation = evaluate_trust(&previous, &records, &self.rules);
        info!(
            agent_id = %config.agent_id,
            records = records.len(),
            changed = evaluation.changed,
            "{}",
            evaluation.message
        );

        if apply {
            self.trust_states
                .save(&config.agent_id, &evaluation.new_state)
                .await
                .with_context(|| format!("Failed to save trust state for {}", config.agent_id))?;
        }

        Ok(AuditEntry {
            agent_id: config.agent_id.clone(),
            previous,
            evaluation,
        })
    }

    /// Evaluate every agent in the installed closure, in dependency order.
    pub async fn audit_installed(
        &self,
        registry: &LayerRegistry,
        installed: &[LayerId],
        apply: bool,
    ) -> Result<Vec<AuditEntry>> {
        let mut entries = Vec::new();
        for layer in registry.resolve_dependencies(installed) {
            if let Some(config) = &layer.agent {
                entries.push(self.audit_agent(config, apply).await?);
            }
        }
        Ok(entries)
    }
}
