// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Relationship-management (CRM) service interface and the static field map
//! used to sync `contacts` rows to and from the external schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::LayerError;
use crate::domain::repository::Row;

/// `contacts` column → external field name.
pub const CONTACT_FIELD_MAP: [(&str, &str); 7] = [
    ("first_name", "firstName"),
    ("last_name", "lastName"),
    ("email", "email"),
    ("phone", "phone"),
    ("source", "source"),
    ("tags", "tags"),
    ("external_id", "id"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[async_trait]
pub trait RelationshipService: Send + Sync {
    /// Create or update a contact. Returns `Ok(None)` when the service is not
    /// configured; this is logged, not raised.
    async fn upsert_contact(&self, fields: &Map<String, Value>) -> Result<Option<Contact>, LayerError>;

    /// Best-effort tagging; failures are logged and swallowed.
    async fn add_tags(&self, contact_id: &str, tags: &[String]);
}

/// Map a `contacts` row to external fields. Empty cells are omitted; `tags`
/// is split on commas.
pub fn row_to_external(columns: &[String], row: &Row) -> Map<String, Value> {
    let mut out = Map::new();
    for (column, external) in CONTACT_FIELD_MAP {
        let Some(idx) = columns.iter().position(|c| c == column) else {
            continue;
        };
        let Some(cell) = row.get(idx).filter(|c| !c.is_empty()) else {
            continue;
        };
        let value = if column == "tags" {
            Value::Array(
                cell.split(',')
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .map(|t| Value::String(t.to_string()))
                    .collect(),
            )
        } else {
            Value::String(cell.clone())
        };
        out.insert(external.to_string(), value);
    }
    out
}

/// Project an external contact back onto a `contacts` row. Columns outside the
/// field map keep the value from `base` (or blank when there is none).
pub fn external_to_row(columns: &[String], contact: &Map<String, Value>, base: Option<&Row>) -> Row {
    columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let mapped = CONTACT_FIELD_MAP
                .iter()
                .find(|(c, _)| c == column)
                .and_then(|(_, external)| contact.get(*external));
            match mapped {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                Some(Value::Null) | None => base
                    .and_then(|b| b.get(idx))
                    .cloned()
                    .unwrap_or_default(),
                Some(other) => other.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<String> {
        ["id", "first_name", "last_name", "email", "phone", "source", "tags", "external_id", "updated_at"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn row_maps_to_external_fields() {
        let row: Row = vec!["c-1", "Ada", "Lovelace", "ada@example.com", "", "referral", "vip, newsletter", "", "2026-01-01"]
            .into_iter()
            .map(String::from)
            .collect();

        let external = row_to_external(&columns(), &row);
        assert_eq!(external["firstName"], "Ada");
        assert_eq!(external["tags"], json!(["vip", "newsletter"]));
        assert!(external.get("phone").is_none());
        assert!(external.get("id").is_none());
    }

    #[test]
    fn external_maps_back_preserving_unmapped_columns() {
        let base: Row = vec!["c-1", "", "", "", "", "", "", "", "2026-01-01"]
            .into_iter()
            .map(String::from)
            .collect();
        let contact = json!({"id": "ext-9", "firstName": "Grace", "email": "g@example.com", "tags": ["a", "b"]});

        let row = external_to_row(&columns(), contact.as_object().unwrap(), Some(&base));
        assert_eq!(row[0], "c-1");
        assert_eq!(row[1], "Grace");
        assert_eq!(row[6], "a,b");
        assert_eq!(row[7], "ext-9");
        assert_eq!(row[8], "2026-01-01");
    }
}
