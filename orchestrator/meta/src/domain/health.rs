// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # System Health Value Objects
//!
//! - [`SystemHealth`] - snapshot produced by one aggregation pass.
//! - [`LayerStatus`] - one layer's reported health inside a snapshot.
//! - [`HealthAlert`] - a warning or critical finding tagged with its origin.
//! - [`CrossLayerIssue`] - a coordination problem spanning two layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trellis_core::domain::agent::AgentId;
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::scan::{Finding, OverallHealth, Severity};

/// Metric tag that marks a finding as a cross-layer issue.
pub const CROSS_LAYER_METRIC: &str = "cross_layer_issue";

/// Aggregated view over the latest report of every reporting agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    /// 0-100. See [`crate::application::aggregate_health`].
    pub score: u32,
    pub layers: Vec<LayerStatus>,
    pub alerts: Vec<HealthAlert>,
    pub timestamp: DateTime<Utc>,
}

impl SystemHealth {
    pub fn critical_layers(&self) -> impl Iterator<Item = &LayerStatus> {
        self.layers
            .iter()
            .filter(|l| l.health == OverallHealth::Critical)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStatus {
    pub layer_id: LayerId,
    /// Display name, falling back to the id when the caller has none.
    pub name: String,
    pub agent_id: AgentId,
    pub health: OverallHealth,
    pub finding_count: usize,
    pub last_scan: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthAlert {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub agent_id: AgentId,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossLayerIssue {
    /// The two layers involved, upstream first.
    pub layers: Vec<LayerId>,
    pub issue: String,
    pub recommendation: String,
}

impl CrossLayerIssue {
    pub fn new(
        upstream: &str,
        downstream: &str,
        issue: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            layers: vec![LayerId::from(upstream), LayerId::from(downstream)],
            issue: issue.into(),
            recommendation: recommendation.into(),
        }
    }

    /// Comma-joined layer ids, as written to the coordination log.
    pub fn layer_list(&self) -> String {
        self.layers
            .iter()
            .map(LayerId::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `"<layers>: <issue>"`, the form used in finding messages and action targets.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.layer_list(), self.issue)
    }

    /// Inverse of [`CrossLayerIssue::summary`].
    pub fn from_summary(summary: &str, recommendation: impl Into<String>) -> Option<Self> {
        let (layers, issue) = summary.split_once(": ")?;
        let layers: Vec<LayerId> = layers
            .split(',')
            .filter(|l| !l.is_empty())
            .map(LayerId::from)
            .collect();
        if layers.is_empty() {
            return None;
        }
        Some(Self {
            layers,
            issue: issue.to_string(),
            recommendation: recommendation.into(),
        })
    }

    pub fn to_finding(&self) -> Finding {
        Finding::warning(self.summary())
            .with_metric(CROSS_LAYER_METRIC, 1.0, 0.0)
            .with_suggestion(self.recommendation.clone())
    }

    pub fn from_finding(finding: &Finding) -> Option<Self> {
        if finding.metric.as_deref() != Some(CROSS_LAYER_METRIC) {
            return None;
        }
        Self::from_summary(&finding.message, finding.suggested_action.clone().unwrap_or_default())
    }
}
