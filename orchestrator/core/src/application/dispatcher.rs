// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Static ownership maps: table → owning layer, generation request → owning
//! layer. A deployment may touch a table or request type only when the owning
//! layer is installed.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::catalog::{
    ASSET_LOG_TABLE, COMPLIANCE, CONFIG_TABLE, CONTENT, COORDINATION_LOG_TABLE, CORE,
    EVENT_LOG_TABLE, INFRA, ORCHESTRATOR, ORCHESTRATOR_LEDGER_TABLE, PAGES, RELATIONSHIPS,
};
use crate::domain::content::GenerationRequestType;
use crate::domain::errors::LayerError;
use crate::domain::layer::LayerId;

static TABLE_OWNERS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (CONFIG_TABLE, CORE),
        (ASSET_LOG_TABLE, CORE),
        (EVENT_LOG_TABLE, CORE),
        (ORCHESTRATOR_LEDGER_TABLE, CORE),
        ("health_checks", INFRA),
        ("infra_ledger", INFRA),
        ("pages", PAGES),
        ("page_metrics", PAGES),
        ("pages_ledger", PAGES),
        ("articles", CONTENT),
        ("content_calendar", CONTENT),
        ("content_ledger", CONTENT),
        ("contacts", RELATIONSHIPS),
        ("pipeline", RELATIONSHIPS),
        ("relationships_ledger", RELATIONSHIPS),
        ("compliance_checks", COMPLIANCE),
        ("compliance_ledger", COMPLIANCE),
        (COORDINATION_LOG_TABLE, ORCHESTRATOR),
    ])
});

static GENERATION_ROUTES: Lazy<HashMap<GenerationRequestType, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (GenerationRequestType::PageContent, PAGES),
        (GenerationRequestType::ArticleContent, CONTENT),
        (GenerationRequestType::OutreachMessage, RELATIONSHIPS),
    ])
});

pub fn owner_of(table: &str) -> Option<LayerId> {
    TABLE_OWNERS.get(table).map(|owner| LayerId::from(*owner))
}

pub fn is_sheet_accessible(table: &str, installed: &[LayerId]) -> bool {
    TABLE_OWNERS
        .get(table)
        .is_some_and(|owner| installed.iter().any(|id| id.as_str() == *owner))
}

/// Every table reachable by a deployment, sorted by name.
pub fn accessible_sheets(installed: &[LayerId]) -> Vec<String> {
    let mut tables: Vec<String> = TABLE_OWNERS
        .iter()
        .filter(|(_, owner)| installed.iter().any(|id| id.as_str() == **owner))
        .map(|(table, _)| table.to_string())
        .collect();
    tables.sort();
    tables
}

/// Owning layer of a generation request, provided it is installed.
pub fn route_generation_request(
    kind: GenerationRequestType,
    installed: &[LayerId],
) -> Result<LayerId, LayerError> {
    let owner = GENERATION_ROUTES
        .get(&kind)
        .ok_or_else(|| LayerError::Configuration(format!("no layer handles '{}' requests", kind)))?;

    if installed.iter().any(|id| id.as_str() == *owner) {
        Ok(LayerId::from(*owner))
    } else {
        Err(LayerError::Configuration(format!(
            "'{}' requests need the '{}' layer, which is not installed",
            kind, owner
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ALL_LAYERS, ALL_SCHEMAS};

    fn ids(names: &[&str]) -> Vec<LayerId> {
        names.iter().map(|n| LayerId::from(*n)).collect()
    }

    #[test]
    fn test_contacts_needs_relationships_layer() {
        assert!(!is_sheet_accessible("contacts", &ids(&[CORE, INFRA])));
        assert!(is_sheet_accessible("contacts", &ids(&[CORE, INFRA, RELATIONSHIPS])));
    }

    #[test]
    fn test_unknown_table_is_never_accessible() {
        assert!(!is_sheet_accessible("payroll", &ids(&[CORE, INFRA, RELATIONSHIPS])));
    }

    #[test]
    fn test_accessible_sheets_for_core_only() {
        assert_eq!(
            accessible_sheets(&ids(&[CORE])),
            vec!["asset_log", "config", "event_log", "orchestrator_ledger"]
        );
    }

    #[test]
    fn test_ownership_agrees_with_catalog() {
        assert_eq!(TABLE_OWNERS.len(), ALL_SCHEMAS.len());
        for layer in ALL_LAYERS.iter() {
            for table in &layer.provides.tables {
                assert_eq!(owner_of(table).as_ref(), Some(&layer.id), "owner of {}", table);
            }
        }
    }

    #[test]
    fn test_generation_routing() {
        let installed = ids(&[CORE, PAGES]);
        assert_eq!(
            route_generation_request(GenerationRequestType::PageContent, &installed).unwrap(),
            LayerId::from(PAGES)
        );
        assert!(matches!(
            route_generation_request(GenerationRequestType::ArticleContent, &installed),
            Err(LayerError::Configuration(_))
        ));
    }
}
