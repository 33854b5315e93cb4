// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts, defined in the domain layer and implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Purpose | Implementations |
//! |-------|---------|----------------|
//! | `TableStore` | row access to the tabular backing store | `InMemoryTableStore`, `JsonFileTableStore` |
//! | `TableCreator` / `ColumnAdder` | provisioning callbacks for the installer | same |
//! | `TrustStateRepository` | per-agent trust state between cycles | `ConfigTable` |
//! | `ScanReportRepository` | latest scan report per agent | `ConfigTable`, `InMemoryScanReportRepository` |
//! | `FollowUpRepository` | executed actions awaiting measurement | `ConfigTable` |
//!
//! ## Backing store semantics
//!
//! Tables are named, with a fixed ordered column list. There is no true row
//! delete: `clear_row` blanks every cell in place so row indices stay stable.
//! Each single call is atomic, but the store offers no transactions: a
//! read-then-write spanning two calls can interleave with another writer.
//! Agents only ever update rows keyed by their own id, which keeps the
//! scheduler's concurrent cycles safe.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::agent::AgentId;
use crate::domain::layer::TableSchema;
use crate::domain::learning::FollowUp;
use crate::domain::scan::ScanReport;
use crate::domain::trust::TrustState;

/// One table row; cells are positional against the table's columns.
pub type Row = Vec<String>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Row {index} out of range for table {table}")]
    RowOutOfRange { table: String, index: usize },

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Every table currently present, with its column order.
    async fn list_tables(&self) -> Result<Vec<TableSchema>, RepositoryError>;

    async fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, RepositoryError>;

    async fn append_row(&self, table: &str, row: Row) -> Result<(), RepositoryError>;

    async fn update_row(&self, table: &str, index: usize, row: Row) -> Result<(), RepositoryError>;

    /// Blank the cells of a row without removing it.
    async fn clear_row(&self, table: &str, index: usize) -> Result<(), RepositoryError>;
}

/// Installer callback creating a table with the given column order.
#[async_trait]
pub trait TableCreator: Send + Sync {
    async fn create_table(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError>;
}

/// Installer callback appending columns to an existing table. Implementations
/// must never drop or reorder existing columns or rows.
#[async_trait]
pub trait ColumnAdder: Send + Sync {
    async fn add_columns(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TrustStateRepository: Send + Sync {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<TrustState>, RepositoryError>;

    async fn save(&self, agent_id: &AgentId, state: &TrustState) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ScanReportRepository: Send + Sync {
    /// Replace the latest report for the report's agent.
    async fn save(&self, report: &ScanReport) -> Result<(), RepositoryError>;

    /// Latest report of every agent, ordered by agent id.
    async fn latest(&self) -> Result<Vec<ScanReport>, RepositoryError>;
}

#[async_trait]
pub trait FollowUpRepository: Send + Sync {
    async fn load(&self, agent_id: &AgentId) -> Result<Option<FollowUp>, RepositoryError>;

    /// Replace the pending follow-up, or clear it with `None`.
    async fn save(&self, agent_id: &AgentId, follow_up: Option<&FollowUp>) -> Result<(), RepositoryError>;
}
