// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON-file backed table store.
//!
//! The whole [`TableSet`] is held in memory and rewritten to disk after every
//! mutation. Mutations are serialized: each one is applied to a copy, flushed
//! through a temporary file renamed over the store, and only then becomes
//! visible to readers. A failed flush leaves both disk and memory unchanged.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::TableSet;
use crate::domain::layer::TableSchema;
use crate::domain::repository::{ColumnAdder, RepositoryError, Row, TableCreator, TableStore};

#[derive(Clone)]
pub struct JsonFileTableStore {
    path: PathBuf,
    tables: Arc<RwLock<TableSet>>,
    /// Held across mutate-and-flush so writes reach disk in order.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileTableStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => TableSet::default(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| RepositoryError::Serialization(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Store file {:?} not found, starting with an empty store", path);
                TableSet::default()
            }
            Err(e) => return Err(RepositoryError::Io(e.to_string())),
        };

        Ok(Self {
            path,
            tables: Arc::new(RwLock::new(tables)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Apply a mutation to a copy, flush it, then publish it.
    async fn mutate<F>(&self, f: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut TableSet) -> Result<(), RepositoryError>,
    {
        let _guard = self.write_lock.lock().await;

        let mut next = self.tables.read().clone();
        f(&mut next)?;
        let json = serde_json::to_string_pretty(&next)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Io(e.to_string()))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| RepositoryError::Io(format!("{}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RepositoryError::Io(format!("{}: {}", self.path.display(), e)))?;

        *self.tables.write() = next;
        debug!("Flushed store to {:?}", self.path);
        Ok(())
    }
}

#[async_trait]
impl TableStore for JsonFileTableStore {
    async fn list_tables(&self) -> Result<Vec<TableSchema>, RepositoryError> {
        Ok(self.tables.read().list())
    }

    async fn read_all_rows(&self, table: &str) -> Result<Vec<Row>, RepositoryError> {
        self.tables.read().rows(table)
    }

    async fn append_row(&self, table: &str, row: Row) -> Result<(), RepositoryError> {
        self.mutate(|t| t.append(table, row)).await
    }

    async fn update_row(&self, table: &str, index: usize, row: Row) -> Result<(), RepositoryError> {
        self.mutate(|t| t.update(table, index, row)).await
    }

    async fn clear_row(&self, table: &str, index: usize) -> Result<(), RepositoryError> {
        self.mutate(|t| t.clear(table, index)).await
    }
}

#[async_trait]
impl TableCreator for JsonFileTableStore {
    async fn create_table(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError> {
        self.mutate(|t| t.create(table, columns)).await
    }
}

#[async_trait]
impl ColumnAdder for JsonFileTableStore {
    async fn add_columns(&self, table: &str, columns: &[String]) -> Result<(), RepositoryError> {
        self.mutate(|t| t.add_columns(table, columns)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileTableStore::open(&path).await.unwrap();
        store
            .create_table("config", &["key".to_string(), "value".to_string()])
            .await
            .unwrap();
        store
            .append_row("config", vec!["site_name".to_string(), "Acme".to_string()])
            .await
            .unwrap();

        let reopened = JsonFileTableStore::open(&path).await.unwrap();
        let rows = reopened.read_all_rows("config").await.unwrap();
        assert_eq!(rows, vec![vec!["site_name".to_string(), "Acme".to_string()]]);
        assert_eq!(reopened.list_tables().await.unwrap()[0].name, "config");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_all_reach_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileTableStore::open(&path).await.unwrap();
        store.create_table("event_log", &["id".to_string()]).await.unwrap();

        let writers: Vec<_> = (0..64)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append_row("event_log", vec![i.to_string()]).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let reopened = JsonFileTableStore::open(&path).await.unwrap();
        let mut ids: Vec<usize> = reopened
            .read_all_rows("event_log")
            .await
            .unwrap()
            .iter()
            .map(|row| row[0].parse().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..64).collect::<Vec<_>>());
        assert!(!dir.path().join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileTableStore::open(&path).await.unwrap();
        store.create_table("config", &["key".to_string()]).await.unwrap();

        // a directory at the store path makes the final rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store.append_row("config", vec!["site_name".to_string()]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Io(_)));
        assert!(store.read_all_rows("config").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileTableStore::open(dir.path().join("absent.json")).await.unwrap();
        assert!(store.list_tables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            JsonFileTableStore::open(&path).await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}
