// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Layer Registry
//!
//! Dependency resolution, validation and projections over a fixed set of
//! layer manifests.
//!
//! | Operation | Behaviour |
//! |-----------|-----------|
//! | `resolve_dependencies` | DFS post-order closure; dependencies precede dependents |
//! | `validate_dependencies` | flags direct dependencies missing from the selection, no expansion |
//! | `required_tables` / `required_env_vars` / `sidebar_items` | set-union projections, first-seen order |

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::domain::catalog::{ALL_LAYERS, ALL_SCHEMAS};
use crate::domain::layer::{LayerId, LayerManifest, SidebarItem, TableSchema};

/// A direct dependency absent from a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyViolation {
    pub layer: LayerId,
    pub missing_dependency: LayerId,
}

#[derive(Debug, Clone)]
pub struct LayerRegistry {
    layers: Vec<LayerManifest>,
    schemas: Vec<TableSchema>,
}

impl LayerRegistry {
    pub fn new(layers: Vec<LayerManifest>, schemas: Vec<TableSchema>) -> Self {
        Self { layers, schemas }
    }

    /// Registry over the compiled-in catalog.
    pub fn builtin() -> Self {
        Self::new(ALL_LAYERS.clone(), ALL_SCHEMAS.clone())
    }

    pub fn layers(&self) -> &[LayerManifest] {
        &self.layers
    }

    pub fn get(&self, id: &LayerId) -> Option<&LayerManifest> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.schemas.iter().find(|s| s.name == table)
    }

    /// Layer owning `table`, if any.
    pub fn owner_of(&self, table: &str) -> Option<&LayerManifest> {
        self.layers.iter().find(|l| l.provides_table(table))
    }

    /// Dependency closure of `selected`, every dependency ahead of its
    /// dependents. Unknown ids are logged and skipped.
    pub fn resolve_dependencies(&self, selected: &[LayerId]) -> Vec<&LayerManifest> {
        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        for id in selected {
            self.visit(id, &mut visited, &mut ordered);
        }
        ordered
    }

    fn visit<'a>(
        &'a self,
        id: &LayerId,
        visited: &mut HashSet<LayerId>,
        ordered: &mut Vec<&'a LayerManifest>,
    ) {
        if !visited.insert(id.clone()) {
            return;
        }
        let Some(layer) = self.get(id) else {
            warn!(layer_id = %id, "Unknown layer in selection, skipping");
            return;
        };
        for dep in &layer.depends {
            self.visit(dep, visited, ordered);
        }
        ordered.push(layer);
    }

    pub fn validate_dependencies(&self, selected: &[LayerId]) -> Vec<DependencyViolation> {
        selected
            .iter()
            .filter_map(|id| self.get(id))
            .flat_map(|layer| {
                layer
                    .depends
                    .iter()
                    .filter(|dep| !selected.contains(dep))
                    .map(|dep| DependencyViolation {
                        layer: layer.id.clone(),
                        missing_dependency: dep.clone(),
                    })
            })
            .collect()
    }

    pub fn required_tables(&self, layers: &[&LayerManifest]) -> Vec<String> {
        union(layers.iter().flat_map(|l| l.provides.tables.iter().cloned()))
    }

    pub fn required_env_vars(&self, layers: &[&LayerManifest]) -> Vec<String> {
        union(layers.iter().flat_map(|l| l.env_vars.iter().cloned()))
    }

    pub fn sidebar_items(&self, layers: &[&LayerManifest]) -> Vec<SidebarItem> {
        union(layers.iter().flat_map(|l| l.provides.sidebar.iter().cloned()))
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn union<T: Clone + PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{COMPLIANCE, CONTENT, CORE, INFRA, ORCHESTRATOR, PAGES, RELATIONSHIPS};

    fn ids(names: &[&str]) -> Vec<LayerId> {
        names.iter().map(|n| LayerId::from(*n)).collect()
    }

    fn assert_closed_and_ordered(registry: &LayerRegistry, selection: &[LayerId]) {
        let resolved = registry.resolve_dependencies(selection);
        let order: Vec<&LayerId> = resolved.iter().map(|l| &l.id).collect();

        for id in selection {
            assert!(order.contains(&id), "{} missing from {:?}", id, order);
        }
        for (pos, layer) in resolved.iter().enumerate() {
            for dep in &layer.depends {
                let dep_pos = order.iter().position(|id| *id == dep).unwrap();
                assert!(dep_pos < pos, "{} must precede {}", dep, layer.id);
            }
        }
    }

    #[test]
    fn test_resolution_is_closed_and_ordered_for_every_permutation() {
        let registry = LayerRegistry::builtin();
        let all = [CORE, INFRA, PAGES, CONTENT, RELATIONSHIPS, COMPLIANCE, ORCHESTRATOR];

        // Every non-empty subset, in both forward and reverse order
        for mask in 1u32..(1 << all.len()) {
            let subset: Vec<&str> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, id)| *id)
                .collect();
            let forward = ids(&subset);
            let mut reverse = forward.clone();
            reverse.reverse();

            assert_closed_and_ordered(&registry, &forward);
            assert_closed_and_ordered(&registry, &reverse);
        }
    }

    #[test]
    fn test_resolution_expands_transitively() {
        let registry = LayerRegistry::builtin();
        let resolved: Vec<_> = registry
            .resolve_dependencies(&ids(&[CONTENT]))
            .iter()
            .map(|l| l.id.as_str().to_string())
            .collect();
        assert_eq!(resolved, vec!["core", "pages", "content"]);
    }

    #[test]
    fn test_unknown_layers_are_skipped() {
        let registry = LayerRegistry::builtin();
        let resolved = registry.resolve_dependencies(&ids(&["billing", INFRA]));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_validation_does_not_expand() {
        let registry = LayerRegistry::builtin();

        let violations = registry.validate_dependencies(&ids(&[CONTENT]));
        assert_eq!(
            violations,
            vec![
                DependencyViolation { layer: LayerId::from(CONTENT), missing_dependency: LayerId::from(CORE) },
                DependencyViolation { layer: LayerId::from(CONTENT), missing_dependency: LayerId::from(PAGES) },
            ]
        );

        assert!(registry.validate_dependencies(&ids(&[CORE, PAGES, CONTENT])).is_empty());
    }

    #[test]
    fn test_projections_deduplicate() {
        let registry = LayerRegistry::builtin();
        let resolved = registry.resolve_dependencies(&ids(&[PAGES, CONTENT]));

        let env = registry.required_env_vars(&resolved);
        assert_eq!(env.iter().filter(|v| *v == "CONTENT_API_KEY").count(), 1);

        let tables = registry.required_tables(&resolved);
        assert_eq!(tables[0], "config");
        assert!(tables.contains(&"articles".to_string()));

        let sidebar = registry.sidebar_items(&resolved);
        assert_eq!(sidebar[0].label, "Dashboard");
    }
}
