// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Table provisioning commands
//!
//! Commands: new, retrofit

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::application::InstallationResult;
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::repository::TableStore;

use super::parse_layer_list;
use crate::embedded::EmbeddedNode;

#[derive(Subcommand)]
pub enum InstallCommand {
    /// Provision every table for a fresh deployment
    New {
        /// Comma-separated layer ids (default: installed layers from config)
        #[arg(value_name = "LAYERS")]
        layers: Option<String>,
    },

    /// Add a layer to an existing deployment without touching existing data
    Retrofit {
        /// Layer id to add
        #[arg(value_name = "LAYER")]
        layer: String,
    },
}

pub async fn handle_command(command: InstallCommand, config_path: Option<PathBuf>) -> Result<()> {
    let node = EmbeddedNode::load(config_path).await?;
    match command {
        InstallCommand::New { layers } => {
            let selected = layers
                .map(|l| parse_layer_list(&l))
                .unwrap_or_else(|| node.installed.clone());
            install_new(&node, &selected).await
        }
        InstallCommand::Retrofit { layer } => retrofit(&node, LayerId::new(layer)).await,
    }
}

async fn install_new(node: &EmbeddedNode, selected: &[LayerId]) -> Result<()> {
    println!("Installing into {}...", node.config.spec.store.path.bold());
    let results = node.installer().install_new_build(selected, node.store.as_ref()).await;
    report(&results)
}

async fn retrofit(node: &EmbeddedNode, layer: LayerId) -> Result<()> {
    let existing = node
        .store
        .list_tables()
        .await
        .context("Failed to list existing tables")?;
    println!(
        "Retrofitting {} onto {} existing tables...",
        layer.as_str().bold(),
        existing.len()
    );

    let results = node
        .installer()
        .install_retrofit(&layer, &existing, node.store.as_ref(), Some(node.store.as_ref()))
        .await;
    report(&results)?;

    if !node.installed.contains(&layer) {
        println!(
            "{}",
            format!("Add '{}' to spec.installed_layers to activate it", layer).yellow()
        );
    }
    Ok(())
}

fn report(results: &[InstallationResult]) -> Result<()> {
    for result in results {
        let status = if result.success { "✓".green() } else { "✗".red() };
        println!("{} {}", status, result.layer_id.as_str().bold());
        for table in &result.tables_created {
            println!("    created  {}", table);
        }
        for upgrade in &result.tables_upgraded {
            println!("    upgraded {} (+{})", upgrade.table, upgrade.columns.join(", "));
        }
        for error in &result.errors {
            println!("    {}", error.red());
        }
    }

    let failed: Vec<_> = results.iter().filter_map(|r| r.ensure_complete().err()).collect();
    if let Some(first) = failed.first() {
        anyhow::bail!("{} of {} layers incomplete: {}", failed.len(), results.len(), first);
    }
    Ok(())
}
