// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Learning Ledger
//!
//! Every executed action that produced a before/after measurement becomes a
//! [`LearningRecord`]. Records are append-only: never mutated, never deleted,
//! and they are the sole input to trust evaluation.
//!
//! | Derived field | Rule |
//! |---------------|------|
//! | `delta_pct` | `(after - before) / before * 100`, `0` when `before == 0`; sign flipped for minimized objectives |
//! | `confidence` | `min(0.99, |delta_pct| / 50)` |
//! | `outcome` | positive `> 2`, negative `< -2`, else neutral |
//!
//! Strategies may attach a measurement to an action result directly. Actions
//! executed without one are measured on the next cycle through a
//! [`FollowUp`]: the objective's value in the scan that led to the action is
//! compared with its value in the following scan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::action::{AgentAction, Measurement};
use crate::domain::agent::{Direction, Objective};
use crate::domain::repository::{RepositoryError, Row};
use crate::domain::scan::ScanReport;
use crate::domain::trust::TrustLevel;

/// Column order of every agent ledger table.
pub const LEDGER_COLUMNS: [&str; 13] = [
    "id",
    "cycle_date",
    "target",
    "metric",
    "before",
    "after",
    "action_type",
    "action_detail",
    "delta_pct",
    "days_measured",
    "confidence",
    "trust_level",
    "outcome",
];

const OUTCOME_BAND_PCT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Positive,
    Negative,
    Neutral,
}

impl Outcome {
    pub fn from_delta(delta_pct: f64) -> Self {
        if delta_pct > OUTCOME_BAND_PCT {
            Outcome::Positive
        } else if delta_pct < -OUTCOME_BAND_PCT {
            Outcome::Negative
        } else {
            Outcome::Neutral
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Positive => "positive",
            Outcome::Negative => "negative",
            Outcome::Neutral => "neutral",
        }
    }
}

impl FromStr for Outcome {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Outcome::Positive),
            "negative" => Ok(Outcome::Negative),
            "neutral" => Ok(Outcome::Neutral),
            other => Err(RepositoryError::Malformed(format!("unknown outcome '{}'", other))),
        }
    }
}

pub fn delta_pct(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        0.0
    } else {
        (after - before) / before * 100.0
    }
}

/// `delta_pct` read in the objective's favourable direction.
pub fn oriented_delta_pct(direction: Direction, before: f64, after: f64) -> f64 {
    let delta = delta_pct(before, after);
    match direction {
        Direction::Maximize => delta,
        Direction::Minimize if delta == 0.0 => 0.0,
        Direction::Minimize => -delta,
    }
}

pub fn confidence(delta_pct: f64) -> f64 {
    (delta_pct.abs() / 50.0).min(0.99)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub id: Uuid,
    pub cycle_date: DateTime<Utc>,
    pub target: String,
    pub metric: String,
    pub before: f64,
    pub after: f64,
    pub action_type: String,
    pub action_detail: String,
    pub delta_pct: f64,
    pub days_measured: u32,
    pub confidence: f64,
    pub trust_level: TrustLevel,
    pub outcome: Outcome,
}

impl LearningRecord {
    /// Derive a record from a measurement of a maximized metric taken after
    /// `action` ran.
    pub fn measure(
        target: String,
        measurement: &Measurement,
        action: &AgentAction,
        trust_level: TrustLevel,
    ) -> Self {
        Self::measure_toward(Direction::Maximize, target, measurement, action, trust_level)
    }

    pub fn measure_toward(
        direction: Direction,
        target: String,
        measurement: &Measurement,
        action: &AgentAction,
        trust_level: TrustLevel,
    ) -> Self {
        let delta = oriented_delta_pct(direction, measurement.before, measurement.after);
        Self {
            id: Uuid::new_v4(),
            cycle_date: Utc::now(),
            target,
            metric: measurement.metric.clone(),
            before: measurement.before,
            after: measurement.after,
            action_type: action.action_type.clone(),
            action_detail: action.detail.clone(),
            delta_pct: delta,
            days_measured: measurement.days_measured,
            confidence: confidence(delta),
            trust_level,
            outcome: Outcome::from_delta(delta),
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.id.to_string(),
            self.cycle_date.to_rfc3339(),
            self.target.clone(),
            self.metric.clone(),
            self.before.to_string(),
            self.after.to_string(),
            self.action_type.clone(),
            self.action_detail.clone(),
            self.delta_pct.to_string(),
            self.days_measured.to_string(),
            self.confidence.to_string(),
            self.trust_level.as_str().to_string(),
            self.outcome.as_str().to_string(),
        ]
    }

    /// Parse a ledger row laid out as [`LEDGER_COLUMNS`].
    pub fn from_row(row: &[String]) -> Result<Self, RepositoryError> {
        if row.len() < LEDGER_COLUMNS.len() {
            return Err(RepositoryError::Malformed(format!(
                "ledger row has {} cells, expected {}",
                row.len(),
                LEDGER_COLUMNS.len()
            )));
        }

        Ok(Self {
            id: parse_cell(&row[0], "id")?,
            cycle_date: DateTime::parse_from_rfc3339(&row[1])
                .map_err(|e| RepositoryError::Malformed(format!("cycle_date: {}", e)))?
                .with_timezone(&Utc),
            target: row[2].clone(),
            metric: row[3].clone(),
            before: parse_cell(&row[4], "before")?,
            after: parse_cell(&row[5], "after")?,
            action_type: row[6].clone(),
            action_detail: row[7].clone(),
            delta_pct: parse_cell(&row[8], "delta_pct")?,
            days_measured: parse_cell(&row[9], "days_measured")?,
            confidence: parse_cell(&row[10], "confidence")?,
            trust_level: row[11].parse()?,
            outcome: row[12].parse()?,
        })
    }
}

/// Sum of `current_value` over the report's findings tagged with `metric`.
/// `None` when no finding carries the metric.
pub fn metric_value(report: &ScanReport, metric: &str) -> Option<f64> {
    report
        .findings
        .iter()
        .filter(|f| f.metric.as_deref() == Some(metric))
        .map(|f| f.current_value.unwrap_or(0.0))
        .reduce(|a, b| a + b)
}

/// Actions executed in one cycle, awaiting measurement by the next scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUp {
    /// The scan the actions were assessed from.
    pub baseline: ScanReport,
    /// Trust level the actions executed at.
    pub trust_level: TrustLevel,
    pub actions: Vec<AgentAction>,
}

impl FollowUp {
    /// One record per action, measuring the highest-weighted objective that
    /// either scan reports. A metric absent from a scan counts as zero there.
    pub fn measure(&self, current: &ScanReport, objectives: &[Objective]) -> Vec<LearningRecord> {
        let mut ranked: Vec<&Objective> = objectives.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));

        let Some((objective, before, after)) = ranked.into_iter().find_map(|objective| {
            let before = metric_value(&self.baseline, &objective.metric);
            let after = metric_value(current, &objective.metric);
            if before.is_none() && after.is_none() {
                return None;
            }
            Some((objective, before.unwrap_or(0.0), after.unwrap_or(0.0)))
        }) else {
            return Vec::new();
        };

        let days = (current.timestamp - self.baseline.timestamp).num_days().max(0);
        let measurement = Measurement {
            metric: objective.metric.clone(),
            before,
            after,
            days_measured: u32::try_from(days).unwrap_or(u32::MAX),
        };

        self.actions
            .iter()
            .map(|action| {
                LearningRecord::measure_toward(
                    objective.direction,
                    action.target.clone(),
                    &measurement,
                    action,
                    self.trust_level,
                )
            })
            .collect()
    }
}

fn parse_cell<T: FromStr>(cell: &str, column: &str) -> Result<T, RepositoryError> {
    cell.parse()
        .map_err(|_| RepositoryError::Malformed(format!("invalid {} value '{}'", column, cell)))
}
