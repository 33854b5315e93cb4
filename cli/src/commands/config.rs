// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::domain::node_config::{resolve_secret, NodeConfigManifest};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./trellis-config.yaml)
        #[arg(short, long, default_value = "./trellis-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = NodeConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. TRELLIS_CONFIG_PATH: {}",
            std::env::var("TRELLIS_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./trellis-config.yaml");
        println!("  4. ~/.trellis/config.yaml");
        println!("  5. /etc/trellis/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Deployment:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!("  Store: {}", config.spec.store.path);
    println!("  Layers: {}", config.spec.installed_layers.join(", "));
    println!();

    println!("{}", "External services:".bold());
    match &config.spec.content_service {
        Some(content) => println!(
            "  Content: {} ({}, key {})",
            content.endpoint,
            content.model,
            secret_status(content.api_key.as_deref())
        ),
        None => println!("  Content: {}", "(not configured)".dimmed()),
    }
    match &config.spec.relationship_service {
        Some(crm) => println!(
            "  Relationships: {} (key {}, location {})",
            crm.endpoint,
            secret_status(crm.api_key.as_deref()),
            secret_status(crm.location_id.as_deref())
        ),
        None => println!("  Relationships: {}", "(not configured)".dimmed()),
    }
    println!();

    println!("{}", "Scheduler:".bold());
    println!("  Enabled: {}", config.spec.scheduler.enabled);
    for (agent, secs) in &config.spec.scheduler.interval_overrides {
        println!("  {} every {}s", agent, secs);
    }
    println!();

    Ok(())
}

fn secret_status(value: Option<&str>) -> String {
    match value.and_then(resolve_secret) {
        Some(_) => "set".green().to_string(),
        None => "missing".red().to_string(),
    }
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = NodeConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    let sample = include_str!("../../templates/config-minimal.yaml");

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_generated_template_is_valid() {
        let sample = include_str!("../../templates/config-minimal.yaml");
        let config = trellis_core::domain::node_config::NodeConfigManifest::from_yaml_str(sample).unwrap();
        config.validate().unwrap();
        assert!(config.spec.installed_layers.contains(&"infra".to_string()));
    }
}
