// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence contracts defined in
//! [`crate::domain::repository`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve tables, trust state and scan reports
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryTableStore** - `TableSet` behind a lock, for tests and dry runs
//! - **JsonFileTableStore** - the same `TableSet`, flushed to a JSON file after every write
//! - **ConfigTable** - key/value view over the `config` table; stores trust state
//! - **InMemoryScanReportRepository** - latest scan report per agent

pub mod config_table;
pub mod json_file;

pub use config_table::ConfigTable;
pub use json_file::JsonFileTableStore;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::agent::AgentId;
use crate::domain::layer::TableSchema;
use crate::domain::repository::{
    ColumnAdder, RepositoryError, Row, ScanReportRepository, TableCreator, TableStore,
};
use crate::domain::scan::ScanReport;

/// One table: ordered columns plus positional rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// The whole backing store as plain data. Shared by the in-memory and JSON
/// file adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSet {
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
}

impl TableSet {
    pub fn list(&self) -> Vec<TableSchema> {
        self.tables
            .iter()
            .map(|(name, table)| TableSchema {
                name: name.clone(),
                columns: table.columns.clone(),
            })
            .collect()
    }

    fn table(&self, name: &str) -> Result<&Table, RepositoryError> {
        self.tables
            .get(name)
            .ok_or_else(|| RepositoryError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, RepositoryError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| RepositoryError::TableNotFound(name.to_string()))
    }

    pub fn rows(&self, name: &str) -> Result<Vec<Row>, RepositoryError> {
        Ok(self.table(name)?.rows.clone())
    }

    pub fn append(&mut self, name: &str, row: Row) -> Result<(), RepositoryError> {
        let table = self.table_mut(name)?;
        let row = fit(name, row, table.columns.len())?;
        table.rows.push(row);
        Ok(())
    }

    pub fn update(&mut self, name: &str, index: usize, row: Row) -> Result<(), RepositoryError> {
        let table = self.table_mut(name)?;
        let row = fit(name, row, table.columns.len())?;
        let slot = table.rows.get_mut(index).ok_or_else(|| RepositoryError::RowOutOfRange {
            table: name.to_string(),
            index,
        })?;
        *slot = row;
        Ok(())
    }

    pub fn clear(&mut self, name: &str, index: usize) -> Result<(), RepositoryError> {
        let table = self.table_mut(name)?;
        let width = table.columns.len();
        let slot = table.rows.get_mut(index).ok_or_else(|| RepositoryError::RowOutOfRange {
            table: name.to_string(),
            index,
        })?;
        *slot = vec![String::new(); width];
        Ok(())
    }

    pub fn create(&mut self, name: &str, columns: &[String]) -> Result<(), RepositoryError> {
        if self.tables.contains_key(name) {
            return Err(RepositoryError::TableExists(name.to_string()));
        }
        self.tables.insert(
            name.to_string(),
            Table {
                columns: columns.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append columns not yet present. Existing columns and rows are kept in
    /// place; existing rows gain blank cells.
    pub fn add_columns(&mut self, name: &str, columns: &[String]) -> Result<(), RepositoryError> {
        let table = self.table_mut(name)?;
        for column in columns {
            if !table.columns.contains(column) {
                table.columns.push(column.clone());
            }
        }
        let width = table.columns.len();
        for row in &mut table.rows {
            row.resize(width, String::new());
        }
        Ok(())
    }
}

/// Pad a short row to the table width. Wider rows are rejected.
fn fit(table: &str, mut row: Row, width: usize) -> Result<Row, RepositoryError> {
    if row.len() > width {
        return Err(RepositoryError::Malformed(format!(
            "row has {} cells but table {} has {} columns",
            row.len(),
            table,
            width
        )));
    }
    row.resize(width, String::new());
    Ok(row)
}

/// Thread-safe in-memory table store.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    tables: Arc<RwLock<TableSet>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with empty tables for the given schemas.
    pub fn with_schemas(schemas: &[TableSchema]) -> Self {
        let mut set = TableSet::default();
        for schema in schemas {
            set.tables.insert(
                schema.name.clone(),
                Table {
                    columns: schema.columns.clone(),
                    rows: Vec::new(),
                },
            );
        }
        Self {
            tables: Arc::new(RwLock::new(set)),
        }
    }

    pub fn snapshot(&self) -> TableSet {
        self.tables.read().clone()
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn list_tables(&self) -> Result<Vec<TableSchema>, RepositoryError> {
        Ok(self.tables.read().list())
    }

    async fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, RepositoryError> {
        self.tables.read().rows(table)
    }

    async fn append_row(&self, table: &str, row: Row) -> Result<(), RepositoryError> {
        self.tables.write().append(table, row)
    }

    async fn update_row(&self, table: &str, index: usize, row: Row) -> Result<(), RepositoryError> {
        self.tables.write().update(table, index, row)
    }

    async fn clear_row(&self, table: &str, index: usize) -> Result<(), RepositoryError> {
        self.tables.write().clear(table, index)
    }
}

#[async_trait]
impl TableCreator for InMemoryTableStore {
    async fn create_table(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError> {
        self.tables.write().create(table, columns)
    }
}

#[async_trait]
impl ColumnAdder for InMemoryTableStore {
    async fn add_columns(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError> {
        self.tables.write().add_columns(table, columns)
    }
}

/// Latest scan report per agent, kept in process memory.
#[derive(Clone, Default)]
pub struct InMemoryScanReportRepository {
    reports: Arc<RwLock<BTreeMap<AgentId, ScanReport>>>,
}

impl InMemoryScanReportRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScanReportRepository for InMemoryScanReportRepository {
    async fn save(&self, report: &ScanReport) -> Result<(), RepositoryError> {
        self.reports
            .write()
            .insert(report.agent_id.clone(), report.clone());
        Ok(())
    }

    async fn latest(&self) -> Result<Vec<ScanReport>, RepositoryError> {
        Ok(self.reports.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_pads_short_rows() {
        let store = InMemoryTableStore::new();
        store.create_table("contacts", &cols(&["id", "email", "stage"])).await.unwrap();

        store
            .append_row("contacts", vec!["c-1".to_string()])
            .await
            .unwrap();

        let rows = store.read_all_rows("contacts").await.unwrap();
        assert_eq!(rows, vec![vec!["c-1".to_string(), String::new(), String::new()]]);
    }

    #[tokio::test]
    async fn test_wide_rows_are_rejected_not_truncated() {
        let store = InMemoryTableStore::new();
        store.create_table("t", &cols(&["a", "b"])).await.unwrap();
        store.append_row("t", cols(&["1", "x"])).await.unwrap();

        assert!(matches!(
            store.append_row("t", cols(&["2", "y", "extra"])).await,
            Err(RepositoryError::Malformed(_))
        ));
        assert!(matches!(
            store.update_row("t", 0, cols(&["1", "x", "extra"])).await,
            Err(RepositoryError::Malformed(_))
        ));
        assert_eq!(store.read_all_rows("t").await.unwrap(), vec![cols(&["1", "x"])]);
    }

    #[tokio::test]
    async fn test_clear_row_keeps_index_stable() {
        let store = InMemoryTableStore::new();
        store.create_table("t", &cols(&["a", "b"])).await.unwrap();
        store.append_row("t", cols(&["1", "x"])).await.unwrap();
        store.append_row("t", cols(&["2", "y"])).await.unwrap();

        store.clear_row("t", 0).await.unwrap();

        let rows = store.read_all_rows("t").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], cols(&["", ""]));
        assert_eq!(rows[1], cols(&["2", "y"]));
    }

    #[tokio::test]
    async fn test_add_columns_never_drops_existing_data() {
        let store = InMemoryTableStore::new();
        store.create_table("t", &cols(&["id", "legacy"])).await.unwrap();
        store.append_row("t", cols(&["1", "keep-me"])).await.unwrap();

        store.add_columns("t", &cols(&["id", "email"])).await.unwrap();

        let schema = &store.list_tables().await.unwrap()[0];
        assert_eq!(schema.columns, cols(&["id", "legacy", "email"]));
        let rows = store.read_all_rows("t").await.unwrap();
        assert_eq!(rows[0], cols(&["1", "keep-me", ""]));
    }

    #[tokio::test]
    async fn test_errors() {
        let store = InMemoryTableStore::new();
        assert!(matches!(
            store.read_all_rows("missing").await,
            Err(RepositoryError::TableNotFound(_))
        ));

        store.create_table("t", &cols(&["a"])).await.unwrap();
        assert!(matches!(
            store.create_table("t", &cols(&["a"])).await,
            Err(RepositoryError::TableExists(_))
        ));
        assert!(matches!(
            store.update_row("t", 3, cols(&["x"])).await,
            Err(RepositoryError::RowOutOfRange { index: 3, .. })
        ));
    }
}
