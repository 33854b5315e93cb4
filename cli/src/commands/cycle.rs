// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent cycle commands
//!
//! Commands: run

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use trellis_core::application::{CycleScheduler, CycleSummary, ScheduledAgent};
use trellis_core::domain::action::ActionStatus;
use trellis_core::domain::catalog::ORCHESTRATOR;
use trellis_meta::application::installed_agents;

use crate::embedded::EmbeddedNode;

#[derive(Subcommand)]
pub enum CycleCommand {
    /// Run one cycle per installed agent, or keep running them on schedule
    Run {
        /// Only this agent (default: every installed agent with a strategy)
        #[arg(long, value_name = "AGENT_ID")]
        agent: Option<String>,

        /// Keep running each agent on its scan interval until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
}

pub async fn handle_command(command: CycleCommand, config_path: Option<PathBuf>) -> Result<()> {
    let node = EmbeddedNode::load(config_path).await?;
    match command {
        CycleCommand::Run { agent, watch } => run(&node, agent, watch).await,
    }
}

async fn run(node: &EmbeddedNode, only: Option<String>, watch: bool) -> Result<()> {
    let reports = node.scan_reports();
    let deps = node.agent_dependencies(reports.clone());
    let service = Arc::new(node.cycle_service());

    let mut agents = installed_agents(&deps);
    if let Some(id) = &only {
        agents.retain(|(layer, _)| layer.agent.as_ref().is_some_and(|a| a.agent_id.as_str() == id));
        if agents.is_empty() {
            anyhow::bail!("Agent '{}' is not installed or has no strategy", id);
        }
    }
    // the meta-coordinator reads the other agents' reports, so it goes last
    agents.sort_by_key(|(layer, _)| layer.id.as_str() == ORCHESTRATOR);

    if watch && !node.config.spec.scheduler.enabled {
        anyhow::bail!("Scheduler is disabled in spec.scheduler.enabled");
    }

    for (layer, agent) in &agents {
        let summary = service
            .run_agent(layer, agent.clone())
            .await
            .with_context(|| format!("Cycle failed for layer '{}'", layer.id))?;
        print_summary(&summary);
    }

    if watch {
        // the first pass above already ran every agent in order
        let overrides = &node.config.spec.scheduler.interval_overrides;
        let jobs: Vec<ScheduledAgent> = agents
            .into_iter()
            .filter_map(|(layer, agent)| ScheduledAgent::new(layer, agent, overrides))
            .map(ScheduledAgent::starting_after_one_interval)
            .collect();

        let scheduler = CycleScheduler::new(service, jobs);
        let token = scheduler.shutdown_token();
        let handles = scheduler.start();

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        info!("Stopping scheduler");
        token.cancel();
        futures::future::join_all(handles).await;
    }
    Ok(())
}

fn print_summary(summary: &CycleSummary) {
    let outcome = &summary.outcome;
    println!(
        "{} {:?} - {} considered, {} executed, {} awaiting approval",
        summary.agent_id.as_str().bold(),
        outcome.report.overall_health,
        outcome.considered,
        outcome.executed.len(),
        outcome.skipped.len()
    );
    for action in &outcome.executed {
        let mark = match action.status {
            ActionStatus::Executed => "✓".green(),
            _ => "✗".red(),
        };
        let message = action.result.as_ref().map(|r| r.message.as_str()).unwrap_or("");
        println!("    {} {} {}", mark, action.action_type, message.dimmed());
    }
    for action in &outcome.skipped {
        println!(
            "    {} {} (needs {})",
            "…".yellow(),
            action.action_type,
            action.required_trust
        );
    }
    if !summary.records.is_empty() {
        println!("    {} learning records", summary.records.len());
    }
    if summary.trust.changed {
        println!("    {}", summary.trust.message.yellow());
    }
}
