// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Scan reports and findings produced by an agent's `scan` phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentId;
use crate::domain::layer::LayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Warning,
    Critical,
}

impl OverallHealth {
    /// critical if any finding is critical, else warning if any is a warning.
    pub fn from_findings(findings: &[Finding]) -> Self {
        if findings.iter().any(|f| f.severity == Severity::Critical) {
            OverallHealth::Critical
        } else if findings.iter().any(|f| f.severity == Severity::Warning) {
            OverallHealth::Warning
        } else {
            OverallHealth::Healthy
        }
    }

    /// Contribution of one report to the system health score.
    pub fn score(self) -> u32 {
        match self {
            OverallHealth::Healthy => 100,
            OverallHealth::Warning => 50,
            OverallHealth::Critical => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl Finding {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            metric: None,
            current_value: None,
            threshold: None,
            suggested_action: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn with_metric(mut self, metric: impl Into<String>, current: f64, threshold: f64) -> Self {
        self.metric = Some(metric.into());
        self.current_value = Some(current);
        self.threshold = Some(threshold);
        self
    }

    pub fn with_suggestion(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    pub fn is_alert(&self) -> bool {
        self.severity != Severity::Info
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub agent_id: AgentId,
    pub layer_id: LayerId,
    pub timestamp: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub overall_health: OverallHealth,
}

impl ScanReport {
    /// Build a report, deriving `overall_health` from the findings.
    pub fn new(agent_id: AgentId, layer_id: LayerId, findings: Vec<Finding>) -> Self {
        let overall_health = OverallHealth::from_findings(&findings);
        Self {
            agent_id,
            layer_id,
            timestamp: Utc::now(),
            findings,
            overall_health,
        }
    }

    /// Report used when a scan cannot reach its inputs.
    pub fn degraded(agent_id: AgentId, layer_id: LayerId, reason: impl Into<String>) -> Self {
        Self::new(agent_id, layer_id, vec![Finding::info(reason)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(findings: Vec<Finding>) -> ScanReport {
        ScanReport::new(AgentId::from("a"), LayerId::from("l"), findings)
    }

    #[test]
    fn overall_health_follows_worst_finding() {
        assert_eq!(report(vec![]).overall_health, OverallHealth::Healthy);
        assert_eq!(
            report(vec![Finding::info("ok"), Finding::warning("slow")]).overall_health,
            OverallHealth::Warning
        );
        assert_eq!(
            report(vec![Finding::warning("slow"), Finding::critical("down"), Finding::info("x")])
                .overall_health,
            OverallHealth::Critical
        );
    }

    #[test]
    fn degraded_report_is_healthy_info() {
        let r = ScanReport::degraded(AgentId::from("a"), LayerId::from("l"), "store unreachable");
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].severity, Severity::Info);
        assert_eq!(r.overall_health, OverallHealth::Healthy);
    }

    #[test]
    fn finding_serializes_camel_case_and_skips_empty_options() {
        let f = Finding::warning("stalled").with_metric("stalled_items", 4.0, 2.0);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["currentValue"], 4.0);
        assert!(json.get("suggestedAction").is_none());
    }
}
