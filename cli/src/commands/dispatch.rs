// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Table ownership and access commands
//!
//! Commands: check, sheets

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use trellis_core::application::dispatcher::{accessible_sheets, is_sheet_accessible, owner_of};

use super::layers::selection;

#[derive(Subcommand)]
pub enum DispatchCommand {
    /// Check whether a table is accessible with the installed layers
    Check {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,

        /// Comma-separated layer ids (default: installed layers from config)
        #[arg(long)]
        layers: Option<String>,
    },

    /// List every table accessible with the installed layers
    Sheets {
        /// Comma-separated layer ids (default: installed layers from config)
        #[arg(long)]
        layers: Option<String>,
    },
}

pub async fn handle_command(command: DispatchCommand, config_path: Option<PathBuf>) -> Result<()> {
    match command {
        DispatchCommand::Check { table, layers } => {
            let installed = selection(layers, config_path)?;
            let owner = owner_of(&table)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "(unowned)".to_string());

            if is_sheet_accessible(&table, &installed) {
                println!("{}", format!("✓ {} is accessible (owner: {})", table, owner).green());
                Ok(())
            } else {
                println!("{}", format!("✗ {} is not accessible (owner: {})", table, owner).red());
                anyhow::bail!("Table '{}' is not accessible", table)
            }
        }
        DispatchCommand::Sheets { layers } => {
            let installed = selection(layers, config_path)?;
            for sheet in accessible_sheets(&installed) {
                println!("{}", sheet);
            }
            Ok(())
        }
    }
}
