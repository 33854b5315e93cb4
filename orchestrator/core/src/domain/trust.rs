// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Trust Ladder
//!
//! Graduated autonomy tiers gating which proposed actions an agent may run
//! without human approval:
//!
//! ```text
//! observe < recommend < auto-low < auto-medium < auto-full
//! ```
//!
//! Trust is earned by positive learning records measured *at the current
//! level* and lost by regressions or stagnation. One pure function,
//! [`decide_transition`], owns the transition rules; both the live runner and
//! the batch auditor ([`evaluate_trust`]) call it.
//!
//! ## Transition table
//!
//! | Check (in order) | Window | Result |
//! |------------------|--------|--------|
//! | any `delta_pct <= -10` | last 5 records | demote one level |
//! | all neutral | last 3 records | demote one level, request review |
//! | positives at current level `>=` rule threshold | all records | promote one level |
//!
//! Demotion is evaluated first and returns early, so promotion only applies
//! when no demotion condition holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::learning::{LearningRecord, Outcome};
use crate::domain::repository::RepositoryError;

/// Records inspected for a severe regression.
pub const REGRESSION_WINDOW: usize = 5;
/// Any record at or below this change demotes immediately.
pub const SEVERE_REGRESSION_PCT: f64 = -10.0;
/// Consecutive neutral records that trigger a review demotion.
pub const STAGNATION_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustLevel {
    #[default]
    Observe,
    Recommend,
    AutoLow,
    AutoMedium,
    AutoFull,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 5] = [
        TrustLevel::Observe,
        TrustLevel::Recommend,
        TrustLevel::AutoLow,
        TrustLevel::AutoMedium,
        TrustLevel::AutoFull,
    ];

    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<TrustLevel> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    pub fn previous(self) -> Option<TrustLevel> {
        self.ordinal().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Whether an agent at this level may auto-run an action requiring `required`.
    pub fn permits(self, required: TrustLevel) -> bool {
        self.ordinal() >= required.ordinal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Observe => "observe",
            TrustLevel::Recommend => "recommend",
            TrustLevel::AutoLow => "auto-low",
            TrustLevel::AutoMedium => "auto-medium",
            TrustLevel::AutoFull => "auto-full",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustLevel {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| RepositoryError::Malformed(format!("unknown trust level '{}'", s)))
    }
}

/// Required count of positive records at `from` before moving to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPromotionRule {
    pub from: TrustLevel,
    pub to: TrustLevel,
    pub required_positive: usize,
}

pub const DEFAULT_PROMOTION_RULES: [TrustPromotionRule; 4] = [
    TrustPromotionRule { from: TrustLevel::Observe, to: TrustLevel::Recommend, required_positive: 5 },
    TrustPromotionRule { from: TrustLevel::Recommend, to: TrustLevel::AutoLow, required_positive: 10 },
    TrustPromotionRule { from: TrustLevel::AutoLow, to: TrustLevel::AutoMedium, required_positive: 20 },
    TrustPromotionRule { from: TrustLevel::AutoMedium, to: TrustLevel::AutoFull, required_positive: 50 },
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustTransition {
    pub from: TrustLevel,
    pub to: TrustLevel,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Persisted per-agent trust state. Owned by the caller between cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustState {
    pub level: TrustLevel,
    #[serde(default)]
    pub history: Vec<TrustTransition>,
    #[serde(default)]
    pub successes: usize,
    #[serde(default)]
    pub failures: usize,
    #[serde(default)]
    pub neutrals: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated: Option<DateTime<Utc>>,
}

impl TrustState {
    /// State for an agent activated for the first time.
    pub fn initial(level: TrustLevel) -> Self {
        Self {
            level,
            history: Vec::new(),
            successes: 0,
            failures: 0,
            neutrals: 0,
            last_evaluated: None,
        }
    }
}

/// One step up or down the ladder, with a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustChange {
    pub to: TrustLevel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrustDecision {
    Promote(TrustChange),
    Demote(TrustChange),
    Hold,
}

/// Demotion check over the tail of the ledger.
pub fn demotion(current: TrustLevel, records: &[LearningRecord]) -> Option<TrustChange> {
    let to = current.previous()?;

    let recent = tail(records, REGRESSION_WINDOW);
    if let Some(regression) = recent.iter().find(|r| r.delta_pct <= SEVERE_REGRESSION_PCT) {
        return Some(TrustChange {
            to,
            reason: format!(
                "Severe regression of {:.1}% on {} ({}), demoting from {} to {}",
                regression.delta_pct, regression.metric, regression.target, current, to
            ),
        });
    }

    let last = tail(records, STAGNATION_WINDOW);
    if last.len() == STAGNATION_WINDOW && last.iter().all(|r| r.outcome == Outcome::Neutral) {
        return Some(TrustChange {
            to,
            reason: format!(
                "Last {} outcomes were neutral, demoting from {} to {} and requesting human review",
                STAGNATION_WINDOW, current, to
            ),
        });
    }

    None
}

/// Promotion check against the rule for `current -> next`.
pub fn promotion(
    current: TrustLevel,
    records: &[LearningRecord],
    rules: &[TrustPromotionRule],
) -> Option<TrustChange> {
    let to = current.next()?;
    let rule = rules.iter().find(|r| r.from == current && r.to == to)?;

    let positives = records
        .iter()
        .filter(|r| r.outcome == Outcome::Positive && r.trust_level == current)
        .count();

    if positives >= rule.required_positive {
        Some(TrustChange {
            to,
            reason: format!(
                "{} positive outcomes at {} (threshold {}), promoting to {}",
                positives, current, rule.required_positive, to
            ),
        })
    } else {
        None
    }
}

/// The single trust-transition rule: demotion first, then promotion.
pub fn decide_transition(
    current: TrustLevel,
    records: &[LearningRecord],
    rules: &[TrustPromotionRule],
) -> TrustDecision {
    if let Some(change) = demotion(current, records) {
        return TrustDecision::Demote(change);
    }
    match promotion(current, records, rules) {
        Some(change) => TrustDecision::Promote(change),
        None => TrustDecision::Hold,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustEvaluation {
    pub new_state: TrustState,
    pub changed: bool,
    pub message: String,
}

/// Stateless batch evaluation over the full ledger.
///
/// Recomputes the running counts from `records` and applies
/// [`decide_transition`]. Given the same level and records it reaches the same
/// decision as the live runner.
pub fn evaluate_trust(
    state: &TrustState,
    records: &[LearningRecord],
    rules: &[TrustPromotionRule],
) -> TrustEvaluation {
    apply_decision(state, records, decide_transition(state.level, records, rules))
}

/// Refresh counts and `last_evaluated` from `records`, then apply `decision`.
pub fn apply_decision(
    state: &TrustState,
    records: &[LearningRecord],
    decision: TrustDecision,
) -> TrustEvaluation {
    let mut new_state = state.clone();
    new_state.successes = records.iter().filter(|r| r.outcome == Outcome::Positive).count();
    new_state.failures = records.iter().filter(|r| r.outcome == Outcome::Negative).count();
    new_state.neutrals = records.iter().filter(|r| r.outcome == Outcome::Neutral).count();

    let now = Utc::now();
    new_state.last_evaluated = Some(now);

    let (change, verb) = match decision {
        TrustDecision::Demote(change) => (change, "demoted"),
        TrustDecision::Promote(change) => (change, "promoted"),
        TrustDecision::Hold => {
            return TrustEvaluation {
                message: format!("Trust level unchanged at {}", state.level),
                new_state,
                changed: false,
            };
        }
    };

    new_state.history.push(TrustTransition {
        from: state.level,
        to: change.to,
        at: now,
        reason: change.reason.clone(),
    });
    new_state.level = change.to;

    TrustEvaluation {
        message: format!("{} {} -> {}: {}", verb, state.level, change.to, change.reason),
        new_state,
        changed: true,
    }
}

fn tail(records: &[LearningRecord], n: usize) -> &[LearningRecord] {
    &records[records.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(delta_pct: f64, level: TrustLevel) -> LearningRecord {
        LearningRecord {
            id: Uuid::new_v4(),
            cycle_date: Utc::now(),
            target: "/home".to_string(),
            metric: "sessions".to_string(),
            before: 100.0,
            after: 100.0 + delta_pct,
            action_type: "refresh".to_string(),
            action_detail: String::new(),
            delta_pct,
            days_measured: 7,
            confidence: crate::domain::learning::confidence(delta_pct),
            trust_level: level,
            outcome: Outcome::from_delta(delta_pct),
        }
    }

    #[test]
    fn ordering_and_neighbours() {
        assert!(TrustLevel::Observe < TrustLevel::AutoFull);
        assert_eq!(TrustLevel::Observe.previous(), None);
        assert_eq!(TrustLevel::AutoFull.next(), None);
        assert_eq!(TrustLevel::AutoLow.next(), Some(TrustLevel::AutoMedium));
        assert_eq!(TrustLevel::AutoLow.previous(), Some(TrustLevel::Recommend));
    }

    #[test]
    fn permits_is_monotonic() {
        for required in TrustLevel::ALL {
            for (i, level) in TrustLevel::ALL.iter().enumerate() {
                if level.permits(required) {
                    for higher in &TrustLevel::ALL[i..] {
                        assert!(higher.permits(required), "{} should permit {}", higher, required);
                    }
                }
            }
        }
    }

    #[test]
    fn wire_names_are_kebab_case() {
        assert_eq!(serde_json::to_string(&TrustLevel::AutoMedium).unwrap(), "\"auto-medium\"");
        assert_eq!("auto-full".parse::<TrustLevel>().unwrap(), TrustLevel::AutoFull);
        assert!("full".parse::<TrustLevel>().is_err());
    }

    #[test]
    fn promotes_exactly_at_threshold() {
        let rules = DEFAULT_PROMOTION_RULES;
        let four: Vec<_> = (0..4).map(|_| record(5.0, TrustLevel::Observe)).collect();
        assert_eq!(promotion(TrustLevel::Observe, &four, &rules), None);

        let five: Vec<_> = (0..5).map(|_| record(5.0, TrustLevel::Observe)).collect();
        let change = promotion(TrustLevel::Observe, &five, &rules).unwrap();
        assert_eq!(change.to, TrustLevel::Recommend);
        assert!(change.reason.contains("5 positive outcomes"));
    }

    #[test]
    fn positives_at_other_levels_do_not_count() {
        let records: Vec<_> = (0..10).map(|_| record(5.0, TrustLevel::Observe)).collect();
        assert_eq!(promotion(TrustLevel::Recommend, &records, &DEFAULT_PROMOTION_RULES), None);
    }

    #[test]
    fn top_and_bottom_are_terminal() {
        let positives: Vec<_> = (0..100).map(|_| record(5.0, TrustLevel::AutoFull)).collect();
        assert_eq!(promotion(TrustLevel::AutoFull, &positives, &DEFAULT_PROMOTION_RULES), None);

        let regression = vec![record(-40.0, TrustLevel::Observe)];
        assert_eq!(demotion(TrustLevel::Observe, &regression), None);
    }

    #[test]
    fn severe_regression_overrides_promotion() {
        let mut records: Vec<_> = (0..10).map(|_| record(5.0, TrustLevel::Recommend)).collect();
        records.push(record(-12.5, TrustLevel::Recommend));
        records.push(record(5.0, TrustLevel::Recommend));
        assert!(promotion(TrustLevel::Recommend, &records, &DEFAULT_PROMOTION_RULES).is_some());

        let decision = decide_transition(TrustLevel::Recommend, &records, &DEFAULT_PROMOTION_RULES);
        match decision {
            TrustDecision::Demote(change) => {
                assert_eq!(change.to, TrustLevel::Observe);
                assert!(change.reason.contains("-12.5%"));
            }
            other => panic!("expected demotion, got {:?}", other),
        }
    }

    #[test]
    fn regression_outside_window_is_ignored() {
        let mut records = vec![record(-30.0, TrustLevel::AutoLow)];
        records.extend((0..5).map(|_| record(4.0, TrustLevel::AutoLow)));
        assert_eq!(demotion(TrustLevel::AutoLow, &records), None);
    }

    #[test]
    fn exactly_minus_ten_demotes() {
        let records = vec![record(-10.0, TrustLevel::AutoLow)];
        assert!(demotion(TrustLevel::AutoLow, &records).is_some());
    }

    #[test]
    fn three_neutrals_request_review() {
        let records: Vec<_> = (0..3).map(|_| record(1.0, TrustLevel::AutoLow)).collect();
        let change = demotion(TrustLevel::AutoLow, &records).unwrap();
        assert_eq!(change.to, TrustLevel::Recommend);
        assert!(change.reason.contains("requesting human review"));

        let two: Vec<_> = (0..2).map(|_| record(1.0, TrustLevel::AutoLow)).collect();
        assert_eq!(demotion(TrustLevel::AutoLow, &two), None);
    }

    #[test]
    fn evaluate_trust_recounts_and_records_history() {
        let state = TrustState {
            successes: 99,
            ..TrustState::initial(TrustLevel::Observe)
        };
        let mut records: Vec<_> = (0..5).map(|_| record(5.0, TrustLevel::Observe)).collect();
        records.push(record(-3.0, TrustLevel::Observe));
        records.push(record(8.0, TrustLevel::Observe));

        let eval = evaluate_trust(&state, &records, &DEFAULT_PROMOTION_RULES);
        assert!(eval.changed);
        assert_eq!(eval.new_state.level, TrustLevel::Recommend);
        assert_eq!(eval.new_state.successes, 6);
        assert_eq!(eval.new_state.failures, 1);
        assert_eq!(eval.new_state.neutrals, 0);
        assert_eq!(eval.new_state.history.len(), 1);
        assert_eq!(eval.new_state.history[0].from, TrustLevel::Observe);
        assert!(eval.new_state.last_evaluated.is_some());
    }

    #[test]
    fn evaluate_trust_holds_without_evidence() {
        let state = TrustState::initial(TrustLevel::Recommend);
        let eval = evaluate_trust(&state, &[], &DEFAULT_PROMOTION_RULES);
        assert!(!eval.changed);
        assert_eq!(eval.new_state.level, TrustLevel::Recommend);
        assert!(eval.message.contains("unchanged"));
    }
}
