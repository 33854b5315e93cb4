// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cycle Service
//!
//! Wraps one [`AgentRunner`] cycle with the caller-side bookkeeping:
//!
//! 1. load trust state (or seed it from the agent's initial trust)
//! 2. load the learning ledger and the previous cycle's follow-up
//! 3. run the cycle
//! 4. measure the previous cycle's actions against the new scan
//! 5. append new learning records, store the scan report and the next follow-up
//! 6. evaluate trust and persist the new state
//! 7. publish cycle and trust events
//!
//! Trust only moves on cycles that appended learning records. A cycle with no
//! new evidence refreshes the counts and `last_evaluated` but keeps the level,
//! so a regression already acted on cannot demote the agent again.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates a single agent cycle against persistent state

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::application::ledger::{append_records, load_ledger};
use crate::application::runner::{AgentRunner, CycleOutcome};
use crate::domain::action::ActionStatus;
use crate::domain::agent::{AgentContext, AgentId, DomainAgent};
use crate::domain::events::{CycleEvent, TrustEvent};
use crate::domain::layer::LayerManifest;
use crate::domain::learning::{FollowUp, LearningRecord};
use crate::domain::repository::{FollowUpRepository, ScanReportRepository, TableStore, TrustStateRepository};
use crate::domain::trust::{apply_decision, TrustEvaluation, TrustPromotionRule, TrustState, DEFAULT_PROMOTION_RULES};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub agent_id: AgentId,
    pub outcome: CycleOutcome,
    /// Every record appended to the ledger this cycle: follow-up
    /// measurements first, then the cycle's own.
    pub records: Vec<LearningRecord>,
    pub trust: TrustEvaluation,
}

pub struct CycleService {
    store: Arc<dyn TableStore>,
    trust_states: Arc<dyn TrustStateRepository>,
    follow_ups: Arc<dyn FollowUpRepository>,
    reports: Arc<dyn ScanReportRepository>,
    event_bus: EventBus,
    rules: Vec<TrustPromotionRule>,
}

impl CycleService {
    pub fn new(
        store: Arc<dyn TableStore>,
        trust_states: Arc<dyn TrustStateRepository>,
        follow_ups: Arc<dyn FollowUpRepository>,
        reports: Arc<dyn ScanReportRepository>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            trust_states,
            follow_ups,
            reports,
            event_bus,
            rules: DEFAULT_PROMOTION_RULES.to_vec(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<TrustPromotionRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn reports(&self) -> &Arc<dyn ScanReportRepository> {
        &self.reports
    }

    pub async fn run_agent(
        &self,
        layer: &LayerManifest,
        agent: Arc<dyn DomainAgent>,
    ) -> Result<CycleSummary> {
        let config = layer
            .agent
            .clone()
            .with_context(|| format!("Layer '{}' has no agent", layer.id))?;
        let agent_id = config.agent_id.clone();

        let state = self
            .trust_states
            .load(&agent_id)
            .await
            .with_context(|| format!("Failed to load trust state for {}", agent_id))?
            .unwrap_or_else(|| TrustState::initial(config.initial_trust));

        let records = load_ledger(self.store.as_ref(), &config.ledger_table)
            .await
            .with_context(|| format!("Failed to read ledger {}", config.ledger_table))?;

        let pending = self
            .follow_ups
            .load(&agent_id)
            .await
            .with_context(|| format!("Failed to load follow-up for {}", agent_id))?;

        let ledger_table = config.ledger_table.clone();
        let objectives = config.objectives.clone();
        let context = AgentContext {
            agent_id: agent_id.clone(),
            layer_id: layer.id.clone(),
            config,
            trust_level: state.level,
            records,
        };

        self.event_bus.publish_cycle_event(CycleEvent::CycleStarted {
            agent_id: agent_id.clone(),
            layer_id: layer.id.clone(),
            trust_level: state.level,
            started_at: Utc::now(),
        });

        let runner = AgentRunner::new(agent, context).with_rules(self.rules.clone());
        let outcome = runner.run_cycle().await;

        let mut records = pending
            .map(|follow_up| follow_up.measure(&outcome.report, &objectives))
            .unwrap_or_default();
        records.extend(outcome.records.iter().cloned());

        append_records(self.store.as_ref(), &ledger_table, &records)
            .await
            .with_context(|| format!("Failed to append to ledger {}", ledger_table))?;
        self.reports
            .save(&outcome.report)
            .await
            .context("Failed to store scan report")?;

        let unmeasured: Vec<_> = outcome
            .executed
            .iter()
            .filter(|a| {
                a.status == ActionStatus::Executed
                    && a.result.as_ref().is_some_and(|r| r.measurement.is_none())
            })
            .cloned()
            .collect();
        let next = (!unmeasured.is_empty()).then(|| FollowUp {
            baseline: outcome.report.clone(),
            trust_level: state.level,
            actions: unmeasured,
        });
        self.follow_ups
            .save(&agent_id, next.as_ref())
            .await
            .with_context(|| format!("Failed to store follow-up for {}", agent_id))?;

        for action in outcome.executed.iter().filter(|a| a.status == ActionStatus::Failed) {
            self.event_bus.publish_cycle_event(CycleEvent::ActionFailed {
                agent_id: agent_id.clone(),
                action_type: action.action_type.clone(),
                reason: action
                    .result
                    .as_ref()
                    .map(|r| r.message.clone())
                    .unwrap_or_default(),
                failed_at: Utc::now(),
            });
        }

        let mut all_records = runner.context().records.clone();
        all_records.extend(records.iter().cloned());
        let trust = apply_decision(&state, &all_records, runner.trust_decision(&records));

        self.trust_states
            .save(&agent_id, &trust.new_state)
            .await
            .with_context(|| format!("Failed to save trust state for {}", agent_id))?;

        if trust.changed {
            info!(agent_id = %agent_id, message = %trust.message, "Trust level changed");
            self.publish_trust_change(&agent_id, &state, &trust);
        }

        self.event_bus.publish_cycle_event(CycleEvent::CycleCompleted {
            agent_id: agent_id.clone(),
            layer_id: layer.id.clone(),
            health: outcome.report.overall_health,
            considered: outcome.considered,
            executed: outcome.executed.len(),
            skipped: outcome.skipped.len(),
            records_appended: records.len(),
            completed_at: Utc::now(),
        });

        Ok(CycleSummary {
            agent_id,
            outcome,
            records,
            trust,
        })
    }

    fn publish_trust_change(&self, agent_id: &AgentId, before: &TrustState, trust: &TrustEvaluation) {
        let Some(transition) = trust.new_state.history.last() else {
            return;
        };
        let event = if transition.to > before.level {
            TrustEvent::TrustPromoted {
                agent_id: agent_id.clone(),
                from: transition.from,
                to: transition.to,
                reason: transition.reason.clone(),
                promoted_at: transition.at,
            }
        } else {
            TrustEvent::TrustDemoted {
                agent_id: agent_id.clone(),
                from: transition.from,
                to: transition.to,
                reason: transition.reason.clone(),
                demoted_at: transition.at,
            }
        };
        self.event_bus.publish_trust_event(event);
    }
}
