// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Layer Manifests
//!
//! A **layer** is an independently-deployable capability module. Each layer
//! declares its identity, the layers it depends on, the storage tables and UI
//! surface it provides, the environment variables it needs, and optionally the
//! configuration of the autonomous agent bound to it.
//!
//! Manifests are immutable and compiled into the binary (see
//! [`crate::domain::catalog`]). The `depends` edges are assumed to form a DAG;
//! nothing in the registry verifies acyclicity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::agent::AgentConfig;

/// Stable identifier of a layer (e.g. `"core"`, `"relationships"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered column schema for one backing-store table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

impl TableSchema {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Declared columns absent from `existing`, in declared order.
    pub fn missing_columns(&self, existing: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !existing.contains(c))
            .cloned()
            .collect()
    }
}

/// Navigation entry contributed to the admin sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarItem {
    pub label: String,
    pub route: String,
}

/// Everything a layer contributes to a deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerProvides {
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub sidebar: Vec<SidebarItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerManifest {
    pub id: LayerId,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub depends: Vec<LayerId>,
    #[serde(default)]
    pub provides: LayerProvides,
    #[serde(default)]
    pub env_vars: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,
}

impl LayerManifest {
    pub fn provides_table(&self, table: &str) -> bool {
        self.provides.tables.iter().any(|t| t == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_keeps_declared_order() {
        let schema = TableSchema::new("contacts", &["id", "name", "email", "stage"]);
        let existing = vec!["email".to_string(), "id".to_string(), "legacy".to_string()];

        assert_eq!(schema.missing_columns(&existing), vec!["name", "stage"]);
    }

    #[test]
    fn layer_id_serializes_as_plain_string() {
        let id = LayerId::from("core");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"core\"");
        assert_eq!(id.to_string(), "core");
    }
}
