// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error taxonomy shared by agents, the installer and the external service
//! adapters.
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | `Configuration` | service adapters, dispatcher | surfaced, never retried here |
//! | `ExternalService` | service adapters | logged, caller decides on retry |
//! | `SchemaMismatch` | infrastructure-health scan | reported as a finding, never auto-repaired |
//! | `PartialInstall` | installer results | aggregated per layer, siblings continue |

use thiserror::Error;

use crate::domain::layer::LayerId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("Schema mismatch on table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("Partial install of layer '{layer}': {}", .errors.join("; "))]
    PartialInstall { layer: LayerId, errors: Vec<String> },
}

impl LayerError {
    pub fn external(service: &str, message: impl Into<String>) -> Self {
        LayerError::ExternalService {
            service: service.to_string(),
            message: message.into(),
        }
    }
}
