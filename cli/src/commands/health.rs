// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! System health commands
//!
//! Commands: aggregate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::application::ledger::load_ledger;
use trellis_core::domain::agent::AgentContext;
use trellis_core::domain::catalog::ORCHESTRATOR;
use trellis_core::domain::layer::LayerManifest;
use trellis_core::domain::repository::TrustStateRepository;
use trellis_core::domain::scan::{OverallHealth, ScanReport, Severity};
use trellis_core::domain::trust::TrustState;
use trellis_meta::application::{aggregate_health, builtin_layer_names, detect_cross_layer_issues, installed_agents};

use crate::embedded::EmbeddedNode;

#[derive(Subcommand)]
pub enum HealthCommand {
    /// Scan every installed agent (read-only) and aggregate the results
    Aggregate {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: HealthCommand, config_path: Option<PathBuf>) -> Result<()> {
    let node = EmbeddedNode::load(config_path).await?;
    match command {
        HealthCommand::Aggregate { json } => aggregate(&node, json).await,
    }
}

/// Context for a read-only scan: persisted trust level plus the ledger.
pub(crate) async fn scan_context(node: &EmbeddedNode, layer: &LayerManifest) -> Result<Option<AgentContext>> {
    let Some(config) = layer.agent.clone() else {
        return Ok(None);
    };
    let state = node
        .trust_states()
        .load(&config.agent_id)
        .await
        .with_context(|| format!("Failed to load trust state for {}", config.agent_id))?
        .unwrap_or_else(|| TrustState::initial(config.initial_trust));
    let records = load_ledger(node.store.as_ref(), &config.ledger_table)
        .await
        .with_context(|| format!("Failed to read ledger {}", config.ledger_table))?;

    Ok(Some(AgentContext {
        agent_id: config.agent_id.clone(),
        layer_id: layer.id.clone(),
        config,
        trust_level: state.level,
        records,
    }))
}

async fn aggregate(node: &EmbeddedNode, json: bool) -> Result<()> {
    let deps = node.agent_dependencies(node.scan_reports());

    let mut reports: Vec<ScanReport> = Vec::new();
    for (layer, agent) in installed_agents(&deps) {
        // the meta view is computed below from the other reports
        if layer.id.as_str() == ORCHESTRATOR {
            continue;
        }
        if let Some(ctx) = scan_context(node, &layer).await? {
            reports.push(agent.scan(&ctx).await);
        }
    }

    let health = aggregate_health(&reports, &builtin_layer_names());
    let issues = detect_cross_layer_issues(&reports);

    if json {
        let value = serde_json::json!({ "health": health, "crossLayerIssues": issues });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let score = format!("{}/100", health.score);
    let score = match health.score {
        80.. => score.green(),
        50..=79 => score.yellow(),
        _ => score.red(),
    };
    println!("{} {}", "System health:".bold(), score);
    println!();

    for layer in &health.layers {
        let status = match layer.health {
            OverallHealth::Healthy => "healthy".green(),
            OverallHealth::Warning => "warning".yellow(),
            OverallHealth::Critical => "critical".red(),
        };
        println!("  {:<24} {:<10} {} findings", layer.name, status, layer.finding_count);
    }

    if !health.alerts.is_empty() {
        println!();
        println!("{}", "Alerts:".bold());
        for alert in &health.alerts {
            let tag = match alert.severity {
                Severity::Critical => "CRIT".red(),
                _ => "WARN".yellow(),
            };
            println!("  [{}] {}: {}", tag, alert.layer_name, alert.message);
            if let Some(action) = &alert.suggested_action {
                println!("         → {}", action.dimmed());
            }
        }
    }

    if !issues.is_empty() {
        println!();
        println!("{}", "Cross-layer issues:".bold());
        for issue in &issues {
            println!("  {} ({})", issue.issue, issue.layer_list());
            println!("    → {}", issue.recommendation.dimmed());
        }
    }

    Ok(())
}
