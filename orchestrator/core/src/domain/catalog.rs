// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Built-in Layer & Schema Catalog
//!
//! The fixed set of layers compiled into Trellis, and the ordered column
//! schema of every table they provide.
//!
//! | Layer | Depends on | Agent |
//! |-------|-----------|-------|
//! | `core` | - | - |
//! | `infra` | core | `infra-agent` |
//! | `pages` | core | `pages-agent` |
//! | `content` | core, pages | `content-agent` |
//! | `relationships` | core | `pipeline-agent` |
//! | `compliance` | core | `compliance-agent` |
//! | `orchestrator` | core, infra | `orchestrator-agent` |

use once_cell::sync::Lazy;

use crate::domain::agent::{AgentConfig, AgentId, Direction, Objective};
use crate::domain::layer::{LayerId, LayerManifest, LayerProvides, SidebarItem, TableSchema};
use crate::domain::learning::LEDGER_COLUMNS;
use crate::domain::trust::TrustLevel;

pub const CORE: &str = "core";
pub const INFRA: &str = "infra";
pub const PAGES: &str = "pages";
pub const CONTENT: &str = "content";
pub const RELATIONSHIPS: &str = "relationships";
pub const COMPLIANCE: &str = "compliance";
pub const ORCHESTRATOR: &str = "orchestrator";

pub const CONFIG_TABLE: &str = "config";
pub const ASSET_LOG_TABLE: &str = "asset_log";
pub const EVENT_LOG_TABLE: &str = "event_log";
pub const ORCHESTRATOR_LEDGER_TABLE: &str = "orchestrator_ledger";
pub const COORDINATION_LOG_TABLE: &str = "coordination_log";

/// Tables every deployment may hold regardless of layer selection.
pub const BOOTSTRAP_TABLES: [&str; 4] = [
    CONFIG_TABLE,
    ASSET_LOG_TABLE,
    EVENT_LOG_TABLE,
    ORCHESTRATOR_LEDGER_TABLE,
];

pub static ALL_LAYERS: Lazy<Vec<LayerManifest>> = Lazy::new(|| {
    vec![
        layer(
            CORE,
            "Core Platform",
            &[],
            &["/admin", "/admin/settings"],
            &BOOTSTRAP_TABLES,
            &[("Dashboard", "/admin"), ("Settings", "/admin/settings")],
            &["STORE_SPREADSHEET_ID", "STORE_SERVICE_ACCOUNT_JSON"],
            None,
        ),
        layer(
            INFRA,
            "Infrastructure Health",
            &[CORE],
            &["/admin/health"],
            &["health_checks", "infra_ledger"],
            &[("System Health", "/admin/health")],
            &[],
            Some(agent(
                "infra-agent",
                3_600,
                &[("schema_drift", Direction::Minimize, 1.0)],
                TrustLevel::Recommend,
                "infra_ledger",
                3,
            )),
        ),
        layer(
            PAGES,
            "Page Conversion",
            &[CORE],
            &["/admin/pages", "/[slug]"],
            &["pages", "page_metrics", "pages_ledger"],
            &[("Pages", "/admin/pages")],
            &["CONTENT_API_KEY"],
            Some(agent(
                "pages-agent",
                86_400,
                &[
                    ("conversion_rate", Direction::Maximize, 1.0),
                    ("bounce_rate", Direction::Minimize, 0.5),
                ],
                TrustLevel::Observe,
                "pages_ledger",
                2,
            )),
        ),
        layer(
            CONTENT,
            "Content Traffic",
            &[CORE, PAGES],
            &["/admin/content", "/blog/[slug]"],
            &["articles", "content_calendar", "content_ledger"],
            &[("Content", "/admin/content"), ("Calendar", "/admin/content/calendar")],
            &["CONTENT_API_KEY"],
            Some(agent(
                "content-agent",
                86_400,
                &[("organic_sessions", Direction::Maximize, 1.0)],
                TrustLevel::Observe,
                "content_ledger",
                2,
            )),
        ),
        layer(
            RELATIONSHIPS,
            "Relationship Pipeline",
            &[CORE],
            &["/admin/contacts", "/admin/pipeline"],
            &["contacts", "pipeline", "relationships_ledger"],
            &[("Contacts", "/admin/contacts"), ("Pipeline", "/admin/pipeline")],
            &["CRM_API_KEY", "CRM_LOCATION_ID"],
            Some(agent(
                "pipeline-agent",
                21_600,
                &[
                    ("pipeline_velocity", Direction::Maximize, 1.0),
                    ("stalled_items", Direction::Minimize, 0.8),
                ],
                TrustLevel::Observe,
                "relationships_ledger",
                5,
            )),
        ),
        layer(
            COMPLIANCE,
            "Compliance",
            &[CORE],
            &["/admin/compliance"],
            &["compliance_checks", "compliance_ledger"],
            &[("Compliance", "/admin/compliance")],
            &[],
            Some(agent(
                "compliance-agent",
                43_200,
                &[("missing_configuration", Direction::Minimize, 1.0)],
                TrustLevel::Recommend,
                "compliance_ledger",
                3,
            )),
        ),
        layer(
            ORCHESTRATOR,
            "Meta-Orchestrator",
            &[CORE, INFRA],
            &["/admin/orchestrator"],
            &[COORDINATION_LOG_TABLE],
            &[("Orchestrator", "/admin/orchestrator")],
            &[],
            Some(agent(
                "orchestrator-agent",
                3_600,
                &[("system_health_score", Direction::Maximize, 1.0)],
                TrustLevel::Recommend,
                ORCHESTRATOR_LEDGER_TABLE,
                3,
            )),
        ),
    ]
});

pub static ALL_SCHEMAS: Lazy<Vec<TableSchema>> = Lazy::new(|| {
    let mut schemas = vec![
        TableSchema::new(CONFIG_TABLE, &["key", "value", "updated_at"]),
        TableSchema::new(ASSET_LOG_TABLE, &["id", "layer_id", "asset_type", "reference", "created_at"]),
        TableSchema::new(
            EVENT_LOG_TABLE,
            &["id", "timestamp", "layer_id", "agent_id", "event_type", "detail"],
        ),
        TableSchema::new("health_checks", &["id", "checked_at", "table_name", "status", "detail"]),
        TableSchema::new("pages", &["slug", "title", "meta_description", "body", "status", "updated_at"]),
        TableSchema::new(
            "page_metrics",
            &["slug", "date", "sessions", "conversions", "conversion_rate", "bounce_rate"],
        ),
        TableSchema::new("articles", &["slug", "title", "topic", "body", "status", "published_at"]),
        TableSchema::new("content_calendar", &["id", "topic", "target_date", "status", "assigned_layer"]),
        TableSchema::new(
            "contacts",
            &[
                "id",
                "first_name",
                "last_name",
                "email",
                "phone",
                "source",
                "tags",
                "external_id",
                "updated_at",
            ],
        ),
        TableSchema::new(
            "pipeline",
            &["id", "contact_id", "stage", "value", "entered_stage_at", "last_activity_at"],
        ),
        TableSchema::new("compliance_checks", &["id", "checked_at", "layer_id", "requirement", "status"]),
        TableSchema::new(
            COORDINATION_LOG_TABLE,
            &["id", "timestamp", "layers", "issue", "recommendation"],
        ),
    ];

    for ledger in [
        ORCHESTRATOR_LEDGER_TABLE,
        "infra_ledger",
        "pages_ledger",
        "content_ledger",
        "relationships_ledger",
        "compliance_ledger",
    ] {
        schemas.push(TableSchema::new(ledger, &LEDGER_COLUMNS));
    }
    schemas
});

#[allow(clippy::too_many_arguments)]
fn layer(
    id: &str,
    name: &str,
    depends: &[&str],
    routes: &[&str],
    tables: &[&str],
    sidebar: &[(&str, &str)],
    env_vars: &[&str],
    agent: Option<AgentConfig>,
) -> LayerManifest {
    LayerManifest {
        id: LayerId::from(id),
        name: name.to_string(),
        version: "1.0.0".to_string(),
        depends: depends.iter().map(|d| LayerId::from(*d)).collect(),
        provides: LayerProvides {
            routes: routes.iter().map(|r| r.to_string()).collect(),
            tables: tables.iter().map(|t| t.to_string()).collect(),
            sidebar: sidebar
                .iter()
                .map(|(label, route)| SidebarItem {
                    label: label.to_string(),
                    route: route.to_string(),
                })
                .collect(),
        },
        env_vars: env_vars.iter().map(|v| v.to_string()).collect(),
        agent,
    }
}

fn agent(
    id: &str,
    scan_interval_secs: u64,
    objectives: &[(&str, Direction, f64)],
    initial_trust: TrustLevel,
    ledger_table: &str,
    max_actions_per_cycle: usize,
) -> AgentConfig {
    AgentConfig {
        agent_id: AgentId::from(id),
        scan_interval_secs,
        objectives: objectives
            .iter()
            .map(|(metric, direction, weight)| Objective {
                metric: metric.to_string(),
                direction: *direction,
                weight: *weight,
            })
            .collect(),
        initial_trust,
        confidence_threshold: 0.7,
        ledger_table: ledger_table.to_string(),
        max_actions_per_cycle,
    }
}
