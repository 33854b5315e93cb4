// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Trellis CLI

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod health;
pub mod install;
pub mod layers;
pub mod trust;

pub use self::config::ConfigCommand;
pub use self::cycle::CycleCommand;
pub use self::dispatch::DispatchCommand;
pub use self::health::HealthCommand;
pub use self::install::InstallCommand;
pub use self::layers::LayersCommand;
pub use self::trust::TrustCommand;

use trellis_core::domain::layer::LayerId;

/// Parse a comma-separated layer list as given on the command line.
pub fn parse_layer_list(value: &str) -> Vec<LayerId> {
    value
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(LayerId::from)
        .collect()
}
