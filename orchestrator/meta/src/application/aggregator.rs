// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Health aggregation and cross-layer issue detection.
//!
//! Both functions are pure over a slice of scan reports. Callers pass the
//! latest report per agent; ordering of `reports` only affects the ordering of
//! `layers` and `alerts` in the result.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use trellis_core::domain::catalog::{ALL_LAYERS, CONTENT, PAGES, RELATIONSHIPS};
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::scan::{OverallHealth, ScanReport};

use crate::domain::{CrossLayerIssue, HealthAlert, LayerStatus, SystemHealth};

/// Metric the relationship pipeline reports idle open items under.
pub const STALLED_ITEMS_METRIC: &str = "stalled_items";

/// Display names for every built-in layer.
pub fn builtin_layer_names() -> HashMap<LayerId, String> {
    ALL_LAYERS
        .iter()
        .map(|l| (l.id.clone(), l.name.clone()))
        .collect()
}

pub fn aggregate_health(reports: &[ScanReport], layer_names: &HashMap<LayerId, String>) -> SystemHealth {
    let name_of = |id: &LayerId| {
        layer_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    };

    let mut layers = Vec::with_capacity(reports.len());
    let mut alerts = Vec::new();

    for report in reports {
        let name = name_of(&report.layer_id);
        layers.push(LayerStatus {
            layer_id: report.layer_id.clone(),
            name: name.clone(),
            agent_id: report.agent_id.clone(),
            health: report.overall_health,
            finding_count: report.findings.len(),
            last_scan: report.timestamp,
        });

        alerts.extend(report.findings.iter().filter(|f| f.is_alert()).map(|f| HealthAlert {
            layer_id: report.layer_id.clone(),
            layer_name: name.clone(),
            agent_id: report.agent_id.clone(),
            severity: f.severity,
            message: f.message.clone(),
            suggested_action: f.suggested_action.clone(),
        }));
    }

    let score = health_score(reports);
    debug!(reports = reports.len(), alerts = alerts.len(), score, "Aggregated system health");

    SystemHealth {
        score,
        layers,
        alerts,
        timestamp: Utc::now(),
    }
}

/// Rounded mean of per-report values; 100 when nothing has reported yet.
pub fn health_score(reports: &[ScanReport]) -> u32 {
    if reports.is_empty() {
        return 100;
    }
    let total: u32 = reports.iter().map(|r| r.overall_health.score()).sum();
    (f64::from(total) / reports.len() as f64).round() as u32
}

/// The fixed set of cross-layer pairings. A pairing is only evaluated when
/// both layers have reported.
pub fn detect_cross_layer_issues(reports: &[ScanReport]) -> Vec<CrossLayerIssue> {
    let report_for = |layer: &str| reports.iter().find(|r| r.layer_id.as_str() == layer);
    let mut issues = Vec::new();

    if let (Some(content), Some(pages)) = (report_for(CONTENT), report_for(PAGES)) {
        if content.overall_health == OverallHealth::Healthy && pages.overall_health == OverallHealth::Critical {
            issues.push(CrossLayerIssue::new(
                CONTENT,
                PAGES,
                "Content production is healthy while page conversion is critical",
                "Prioritize conversion: fix the pages receiving traffic before publishing more content",
            ));
        }
    }

    if let (Some(pipeline), Some(pages)) = (report_for(RELATIONSHIPS), report_for(PAGES)) {
        let stalled = pipeline
            .findings
            .iter()
            .any(|f| f.is_alert() && f.metric.as_deref() == Some(STALLED_ITEMS_METRIC));
        let optimizing = pages
            .findings
            .iter()
            .any(|f| f.is_alert() && f.suggested_action.is_some());

        if stalled && !optimizing {
            issues.push(CrossLayerIssue::new(
                RELATIONSHIPS,
                PAGES,
                "Pipeline has stalled items while no page optimization is under way",
                "Coordinate: align page offers with the stalled pipeline stage",
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::domain::agent::AgentId;
    use trellis_core::domain::scan::{Finding, Severity};

    fn report(layer: &str, findings: Vec<Finding>) -> ScanReport {
        ScanReport::new(AgentId::new(format!("{}-agent", layer)), LayerId::from(layer), findings)
    }

    fn healthy(layer: &str) -> ScanReport {
        report(layer, vec![Finding::info("ok")])
    }

    fn warning(layer: &str) -> ScanReport {
        report(layer, vec![Finding::warning("slow")])
    }

    fn critical(layer: &str) -> ScanReport {
        report(layer, vec![Finding::critical("down").with_suggestion("fix it")])
    }

    #[test]
    fn test_score_for_mixed_reports_rounds_half_up() {
        let reports = vec![healthy("infra"), healthy("content"), critical("pages"), warning("relationships")];
        let health = aggregate_health(&reports, &builtin_layer_names());
        assert_eq!(health.score, 63);
        assert_eq!(health.layers.len(), 4);
        assert_eq!(health.critical_layers().count(), 1);
    }

    #[test]
    fn test_empty_reports_score_full() {
        let health = aggregate_health(&[], &HashMap::new());
        assert_eq!(health.score, 100);
        assert!(health.alerts.is_empty());
    }

    #[test]
    fn test_alerts_flatten_warning_and_critical_only() {
        let reports = vec![
            report("pages", vec![Finding::info("fine"), Finding::critical("broken").with_suggestion("rebuild")]),
            report("custom", vec![Finding::warning("drift")]),
        ];
        let health = aggregate_health(&reports, &builtin_layer_names());

        assert_eq!(health.alerts.len(), 2);
        assert_eq!(health.alerts[0].layer_name, "Page Conversion");
        assert_eq!(health.alerts[0].severity, Severity::Critical);
        assert_eq!(health.alerts[0].suggested_action.as_deref(), Some("rebuild"));
        // unknown layers fall back to their id
        assert_eq!(health.alerts[1].layer_name, "custom");
    }

    #[test]
    fn test_healthy_content_with_critical_pages_prioritizes_conversion() {
        let issues = detect_cross_layer_issues(&[healthy(CONTENT), critical(PAGES)]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].recommendation.starts_with("Prioritize conversion"));
        assert_eq!(issues[0].layer_list(), "content,pages");

        assert!(detect_cross_layer_issues(&[warning(CONTENT), critical(PAGES)]).is_empty());
        assert!(detect_cross_layer_issues(&[critical(PAGES)]).is_empty());
    }

    #[test]
    fn test_stalled_pipeline_without_page_optimization_coordinates() {
        let stalled = report(
            RELATIONSHIPS,
            vec![Finding::warning("3 pipeline items stalled").with_metric(STALLED_ITEMS_METRIC, 3.0, 0.0)],
        );

        let issues = detect_cross_layer_issues(&[stalled.clone(), healthy(PAGES)]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].recommendation.starts_with("Coordinate"));

        // a warning without a suggested action is not an active optimization
        let issues = detect_cross_layer_issues(&[stalled.clone(), warning(PAGES)]);
        assert_eq!(issues.len(), 1);

        let optimizing = report(PAGES, vec![Finding::warning("low ctr").with_suggestion("rewrite headline")]);
        assert!(detect_cross_layer_issues(&[stalled, optimizing]).is_empty());
    }
}
