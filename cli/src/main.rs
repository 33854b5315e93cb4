// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Trellis CLI
//!
//! The `trellis` binary installs layers into a deployment's table store and
//! drives the per-layer agents.
//!
//! ## Commands
//!
//! - `trellis layers list|resolve|validate` - Layer catalog and dependencies
//! - `trellis install new|retrofit` - Provision tables
//! - `trellis dispatch check|sheets` - Table ownership and access
//! - `trellis trust evaluate` - Re-evaluate agent trust from the ledgers
//! - `trellis health aggregate` - System health across installed layers
//! - `trellis cycle run` - Run agent cycles once or on their intervals
//! - `trellis config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod embedded;

use commands::{
    ConfigCommand, CycleCommand, DispatchCommand, HealthCommand, InstallCommand, LayersCommand,
    TrustCommand,
};

/// Trellis - progressive-trust orchestration of installable layers
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "TRELLIS_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TRELLIS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Layer catalog and dependency resolution
    #[command(name = "layers")]
    Layers {
        #[command(subcommand)]
        command: LayersCommand,
    },

    /// Provision layer tables
    #[command(name = "install")]
    Install {
        #[command(subcommand)]
        command: InstallCommand,
    },

    /// Table ownership and access checks
    #[command(name = "dispatch")]
    Dispatch {
        #[command(subcommand)]
        command: DispatchCommand,
    },

    /// Agent trust ladder
    #[command(name = "trust")]
    Trust {
        #[command(subcommand)]
        command: TrustCommand,
    },

    /// System health
    #[command(name = "health")]
    Health {
        #[command(subcommand)]
        command: HealthCommand,
    },

    /// Agent cycles
    #[command(name = "cycle")]
    Cycle {
        #[command(subcommand)]
        command: CycleCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Layers { command }) => commands::layers::handle_command(command, cli.config).await,
        Some(Commands::Install { command }) => commands::install::handle_command(command, cli.config).await,
        Some(Commands::Dispatch { command }) => commands::dispatch::handle_command(command, cli.config).await,
        Some(Commands::Trust { command }) => commands::trust::handle_command(command, cli.config).await,
        Some(Commands::Health { command }) => commands::health::handle_command(command, cli.config).await,
        Some(Commands::Cycle { command }) => commands::cycle::handle_command(command, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
