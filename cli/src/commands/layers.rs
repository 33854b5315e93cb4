// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Layer catalog commands
//!
//! Commands: list, resolve, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::application::LayerRegistry;
use trellis_core::domain::layer::LayerId;
use trellis_core::domain::node_config::NodeConfigManifest;

use super::parse_layer_list;

#[derive(Subcommand)]
pub enum LayersCommand {
    /// List every layer in the catalog
    List,

    /// Resolve a selection to its full install order and projections
    Resolve {
        /// Comma-separated layer ids (default: installed layers from config)
        #[arg(value_name = "LAYERS")]
        layers: Option<String>,
    },

    /// Check that every selected layer's direct dependencies are selected
    Validate {
        /// Comma-separated layer ids (default: installed layers from config)
        #[arg(value_name = "LAYERS")]
        layers: Option<String>,
    },
}

pub async fn handle_command(command: LayersCommand, config_path: Option<PathBuf>) -> Result<()> {
    let registry = LayerRegistry::builtin();
    match command {
        LayersCommand::List => list(&registry),
        LayersCommand::Resolve { layers } => resolve(&registry, selection(layers, config_path)?),
        LayersCommand::Validate { layers } => validate(&registry, selection(layers, config_path)?),
    }
}

/// Explicit list when given, else the configured installed layers.
pub(crate) fn selection(layers: Option<String>, config_path: Option<PathBuf>) -> Result<Vec<LayerId>> {
    match layers {
        Some(list) => Ok(parse_layer_list(&list)),
        None => {
            let config =
                NodeConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
            Ok(config
                .spec
                .installed_layers
                .iter()
                .map(|l| LayerId::new(l.as_str()))
                .collect())
        }
    }
}

fn list(registry: &LayerRegistry) -> Result<()> {
    println!("{:<14} {:<24} {:<8} {:<20} {}", "ID", "NAME", "VERSION", "DEPENDS", "AGENT");
    for layer in registry.layers() {
        let depends = layer
            .depends
            .iter()
            .map(LayerId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let agent = layer
            .agent
            .as_ref()
            .map(|a| format!("{} ({})", a.agent_id, a.initial_trust))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<24} {:<8} {:<20} {}",
            layer.id.as_str().bold(),
            layer.name,
            layer.version,
            if depends.is_empty() { "-".to_string() } else { depends },
            agent
        );
    }
    Ok(())
}

fn resolve(registry: &LayerRegistry, selected: Vec<LayerId>) -> Result<()> {
    let resolved = registry.resolve_dependencies(&selected);
    if resolved.is_empty() {
        anyhow::bail!("No known layers in selection");
    }

    println!("{}", "Install order:".bold());
    for (i, layer) in resolved.iter().enumerate() {
        let marker = if selected.contains(&layer.id) { "" } else { " (dependency)" };
        println!("  {}. {}{}", i + 1, layer.id, marker.dimmed());
    }
    println!();

    println!("{}", "Tables:".bold());
    for table in registry.required_tables(&resolved) {
        println!("  - {}", table);
    }
    println!();

    println!("{}", "Environment variables:".bold());
    let vars = registry.required_env_vars(&resolved);
    if vars.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for var in vars {
        println!("  - {}", var);
    }
    println!();

    println!("{}", "Sidebar:".bold());
    for item in registry.sidebar_items(&resolved) {
        println!("  - {} → {}", item.label, item.route);
    }

    Ok(())
}

fn validate(registry: &LayerRegistry, selected: Vec<LayerId>) -> Result<()> {
    let violations = registry.validate_dependencies(&selected);
    if violations.is_empty() {
        println!("{}", "✓ All dependencies are selected".green());
        return Ok(());
    }

    for v in &violations {
        println!(
            "{}",
            format!("✗ {} requires {}", v.layer, v.missing_dependency).red()
        );
    }
    anyhow::bail!("{} missing dependencies", violations.len())
}
