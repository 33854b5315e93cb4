// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Trust ladder commands
//!
//! Commands: evaluate

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::application::AuditEntry;

use crate::embedded::EmbeddedNode;

#[derive(Subcommand)]
pub enum TrustCommand {
    /// Re-evaluate trust from each agent's full ledger
    Evaluate {
        /// Only this agent (default: every installed agent)
        #[arg(long, value_name = "AGENT_ID")]
        agent: Option<String>,

        /// Persist the evaluated state (default: dry run)
        #[arg(long)]
        apply: bool,
    },
}

pub async fn handle_command(command: TrustCommand, config_path: Option<PathBuf>) -> Result<()> {
    let node = EmbeddedNode::load(config_path).await?;
    match command {
        TrustCommand::Evaluate { agent, apply } => evaluate(&node, agent, apply).await,
    }
}

async fn evaluate(node: &EmbeddedNode, agent: Option<String>, apply: bool) -> Result<()> {
    let auditor = node.auditor();

    let entries = match agent {
        Some(id) => {
            let config = node
                .registry
                .layers()
                .iter()
                .filter_map(|l| l.agent.as_ref())
                .find(|a| a.agent_id.as_str() == id)
                .ok_or_else(|| anyhow::anyhow!("Unknown agent '{}'", id))?;
            vec![auditor.audit_agent(config, apply).await?]
        }
        None => auditor.audit_installed(&node.registry, &node.installed, apply).await?,
    };

    if entries.is_empty() {
        println!("{}", "No installed layer has an agent".yellow());
        return Ok(());
    }

    println!("{:<20} {:<12} {:<12} {:>4} {:>4} {:>4}", "AGENT", "FROM", "TO", "+", "-", "=");
    for entry in &entries {
        print_entry(entry);
    }

    if !apply && entries.iter().any(|e| e.evaluation.changed) {
        println!();
        println!("{}", "Dry run. Re-run with --apply to persist.".dimmed());
    }
    Ok(())
}

fn print_entry(entry: &AuditEntry) {
    let state = &entry.evaluation.new_state;
    let to = if entry.evaluation.changed {
        state.level.to_string().bold().to_string()
    } else {
        state.level.to_string()
    };
    println!(
        "{:<20} {:<12} {:<12} {:>4} {:>4} {:>4}",
        entry.agent_id.as_str(),
        entry.previous.level.to_string(),
        to,
        state.successes,
        state.failures,
        state.neutrals
    );
    if entry.evaluation.changed {
        println!("    {}", entry.evaluation.message.dimmed());
    }
}
