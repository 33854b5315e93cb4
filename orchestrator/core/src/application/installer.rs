// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Installer
//!
//! Provisions the storage footprint of a layer selection.
//!
//! - **New build:** create every table of the resolved closure, restricted to
//!   the closure's declared tables plus the bootstrap set.
//! - **Retrofit:** bring an existing deployment up to one layer's closure.
//!   Missing tables are created; existing tables only ever gain columns.
//!
//! Failures are collected per layer and per table. One failing table never
//! stops its siblings, and no run aborts part-way.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::registry::LayerRegistry;
use crate::domain::catalog::BOOTSTRAP_TABLES;
use crate::domain::errors::LayerError;
use crate::domain::events::InstallEvent;
use crate::domain::layer::{LayerId, LayerManifest, TableSchema};
use crate::domain::repository::{ColumnAdder, TableCreator};
use crate::infrastructure::event_bus::EventBus;

/// Columns appended to an existing table during a retrofit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableUpgrade {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationResult {
    pub layer_id: LayerId,
    pub success: bool,
    pub tables_created: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tables_upgraded: Vec<TableUpgrade>,
    pub errors: Vec<String>,
}

impl InstallationResult {
    fn new(layer_id: LayerId) -> Self {
        Self {
            layer_id,
            success: true,
            tables_created: Vec::new(),
            tables_upgraded: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self
    }

    /// `PartialInstall` when any step failed.
    pub fn ensure_complete(&self) -> Result<(), LayerError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(LayerError::PartialInstall {
                layer: self.layer_id.clone(),
                errors: self.errors.clone(),
            })
        }
    }
}

pub struct Installer {
    registry: LayerRegistry,
    event_bus: Option<EventBus>,
}

impl Installer {
    pub fn new(registry: LayerRegistry) -> Self {
        Self {
            registry,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Create the tables of a fresh deployment. One result per resolved layer.
    pub async fn install_new_build(
        &self,
        selected: &[LayerId],
        creator: &dyn TableCreator,
    ) -> Vec<InstallationResult> {
        let resolved = self.registry.resolve_dependencies(selected);

        let mut allowed: HashSet<String> = BOOTSTRAP_TABLES.iter().map(|t| t.to_string()).collect();
        allowed.extend(self.registry.required_tables(&resolved));

        info!(
            layers = resolved.len(),
            tables = allowed.len(),
            "Installing new build"
        );

        let mut created = HashSet::new();
        let mut results = Vec::with_capacity(resolved.len());

        for layer in resolved {
            let mut result = InstallationResult::new(layer.id.clone());
            for table in layer.provides.tables.iter().filter(|t| allowed.contains(*t)) {
                if created.contains(table) {
                    continue;
                }
                if self.create(layer, table, creator, &mut result).await {
                    created.insert(table.clone());
                }
            }
            results.push(self.finish(result));
        }

        results
    }

    /// Bring an existing deployment up to `layer_id`'s closure without
    /// touching data. Columns are only added when `adder` is given.
    pub async fn install_retrofit(
        &self,
        layer_id: &LayerId,
        existing: &[TableSchema],
        creator: &dyn TableCreator,
        adder: Option<&dyn ColumnAdder>,
    ) -> Vec<InstallationResult> {
        let resolved = self.registry.resolve_dependencies(std::slice::from_ref(layer_id));
        if resolved.is_empty() {
            let mut result = InstallationResult::new(layer_id.clone());
            result.errors.push(format!("Unknown layer '{}'", layer_id));
            return vec![self.finish(result)];
        }

        info!(layer_id = %layer_id, layers = resolved.len(), "Retrofitting layer");

        let mut created = HashSet::new();
        let mut results = Vec::with_capacity(resolved.len());

        for layer in resolved {
            let mut result = InstallationResult::new(layer.id.clone());
            for table in &layer.provides.tables {
                match existing.iter().find(|s| &s.name == table) {
                    Some(current) => {
                        self.upgrade(layer, table, current, adder, &mut result).await;
                    }
                    None if created.contains(table) => {}
                    None => {
                        if self.create(layer, table, creator, &mut result).await {
                            created.insert(table.clone());
                        }
                    }
                }
            }
            results.push(self.finish(result));
        }

        results
    }

    async fn create(
        &self,
        layer: &LayerManifest,
        table: &str,
        creator: &dyn TableCreator,
        result: &mut InstallationResult,
    ) -> bool {
        let Some(schema) = self.registry.schema(table) else {
            warn!(layer_id = %layer.id, table, "No schema declared for table");
            result.errors.push(format!("{}: no schema declared", table));
            return false;
        };

        match creator.create_table(table, &schema.columns).await {
            Ok(()) => {
                debug!(layer_id = %layer.id, table, "Created table");
                result.tables_created.push(table.to_string());
                self.publish(InstallEvent::TableCreated {
                    layer_id: layer.id.clone(),
                    table: table.to_string(),
                    created_at: Utc::now(),
                });
                true
            }
            Err(e) => {
                warn!(layer_id = %layer.id, table, error = %e, "Failed to create table");
                result.errors.push(format!("{}: {}", table, e));
                false
            }
        }
    }

    async fn upgrade(
        &self,
        layer: &LayerManifest,
        table: &str,
        current: &TableSchema,
        adder: Option<&dyn ColumnAdder>,
        result: &mut InstallationResult,
    ) {
        let Some(schema) = self.registry.schema(table) else {
            return;
        };
        let missing = schema.missing_columns(&current.columns);
        if missing.is_empty() {
            return;
        }

        let Some(adder) = adder else {
            info!(table, missing = ?missing, "Columns missing but no column adder supplied, leaving table as is");
            return;
        };

        match adder.add_columns(table, &missing).await {
            Ok(()) => {
                debug!(layer_id = %layer.id, table, columns = ?missing, "Added columns");
                self.publish(InstallEvent::ColumnsAdded {
                    layer_id: layer.id.clone(),
                    table: table.to_string(),
                    columns: missing.clone(),
                    added_at: Utc::now(),
                });
                result.tables_upgraded.push(TableUpgrade {
                    table: table.to_string(),
                    columns: missing,
                });
            }
            Err(e) => {
                warn!(layer_id = %layer.id, table, error = %e, "Failed to add columns");
                result.errors.push(format!("{}: {}", table, e));
            }
        }
    }

    fn finish(&self, result: InstallationResult) -> InstallationResult {
        let result = result.finish();
        if !result.success {
            self.publish(InstallEvent::LayerInstallFailed {
                layer_id: result.layer_id.clone(),
                errors: result.errors.clone(),
                failed_at: Utc::now(),
            });
        }
        result
    }

    fn publish(&self, event: InstallEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish_install_event(event);
        }
    }
}
