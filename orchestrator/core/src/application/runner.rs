// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Runner
//!
//! The shared scan → assess → execute → learn control loop. One runner wraps
//! one [`DomainAgent`] strategy plus the [`AgentContext`] for a single cycle.
//!
//! A cycle is strictly sequential: actions execute one at a time in the order
//! `assess` returned them, after truncation to `max_actions_per_cycle`. The
//! runner never retries, never times out and takes no locks; a failed
//! `execute` is recorded on the action and still passed to `learn`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::action::{ActionStatus, AgentAction};
use crate::domain::agent::{AgentContext, DomainAgent};
use crate::domain::learning::LearningRecord;
use crate::domain::scan::ScanReport;
use crate::domain::trust::{
    decide_transition, demotion, promotion, TrustChange, TrustDecision, TrustPromotionRule,
    DEFAULT_PROMOTION_RULES,
};

/// Everything one `run_cycle` produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub report: ScanReport,
    /// Actions retained after truncation.
    pub considered: usize,
    pub executed: Vec<AgentAction>,
    pub skipped: Vec<AgentAction>,
    /// New ledger entries, in execution order.
    pub records: Vec<LearningRecord>,
}

pub struct AgentRunner {
    agent: Arc<dyn DomainAgent>,
    context: AgentContext,
    rules: Vec<TrustPromotionRule>,
}

impl AgentRunner {
    pub fn new(agent: Arc<dyn DomainAgent>, context: AgentContext) -> Self {
        Self {
            agent,
            context,
            rules: DEFAULT_PROMOTION_RULES.to_vec(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<TrustPromotionRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let ctx = &self.context;
        info!(
            agent_id = %ctx.agent_id,
            layer_id = %ctx.layer_id,
            trust_level = %ctx.trust_level,
            "Starting agent cycle"
        );

        let report = self.agent.scan(ctx).await;
        let mut proposed = self.agent.assess(ctx, &report);

        let limit = ctx.config.max_actions_per_cycle;
        if proposed.len() > limit {
            debug!(
                agent_id = %ctx.agent_id,
                proposed = proposed.len(),
                limit,
                "Truncating proposed actions"
            );
            proposed.truncate(limit);
        }

        let considered = proposed.len();
        let mut executed = Vec::new();
        let mut skipped = Vec::new();
        let mut records = Vec::new();

        for mut action in proposed {
            if !self.can_auto_execute(&action) {
                action.status = ActionStatus::Pending;
                skipped.push(action);
                continue;
            }

            let result = self.agent.execute(ctx, &action).await;
            if !result.success {
                warn!(
                    agent_id = %ctx.agent_id,
                    action_type = %action.action_type,
                    message = %result.message,
                    "Action failed"
                );
            }

            if let Some(record) = self.agent.learn(ctx, &action, &result) {
                records.push(record);
            }
            action.complete(result);
            executed.push(action);
        }

        info!(
            agent_id = %ctx.agent_id,
            health = ?report.overall_health,
            considered,
            executed = executed.len(),
            skipped = skipped.len(),
            records = records.len(),
            "Agent cycle complete"
        );

        CycleOutcome {
            report,
            considered,
            executed,
            skipped,
            records,
        }
    }

    /// Current trust ranks at or above the action's required trust.
    pub fn can_auto_execute(&self, action: &AgentAction) -> bool {
        self.context.trust_level.permits(action.required_trust)
    }

    pub fn should_promote(&self) -> Option<TrustChange> {
        promotion(self.context.trust_level, &self.context.records, &self.rules)
    }

    pub fn should_demote(&self) -> Option<TrustChange> {
        demotion(self.context.trust_level, &self.context.records)
    }

    /// Demotion-first decision over the context's ledger plus `new_records`.
    ///
    /// Holds when `new_records` is empty: evidence already judged at an
    /// earlier evaluation never moves the level a second time.
    pub fn trust_decision(&self, new_records: &[LearningRecord]) -> TrustDecision {
        if new_records.is_empty() {
            return TrustDecision::Hold;
        }
        let mut all = self.context.records.clone();
        all.extend(new_records.iter().cloned());
        decide_transition(self.context.trust_level, &all, &self.rules)
    }
}
