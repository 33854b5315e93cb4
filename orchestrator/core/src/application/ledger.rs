// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reading and appending an agent's learning ledger table.

use tracing::warn;

use crate::domain::learning::LearningRecord;
use crate::domain::repository::{RepositoryError, TableStore};

/// All records in `table`, in append order. Cleared rows are skipped and
/// unparseable rows are logged and skipped. A ledger table that was never
/// provisioned reads as empty.
pub async fn load_ledger(
    store: &dyn TableStore,
    table: &str,
) -> Result<Vec<LearningRecord>, RepositoryError> {
    let rows = match store.read_all_rows(table).await {
        Ok(rows) => rows,
        Err(RepositoryError::TableNotFound(_)) => {
            warn!(table, "Ledger table not provisioned, starting from an empty ledger");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        match LearningRecord::from_row(row) {
            Ok(record) => records.push(record),
            Err(e) => warn!(table, index, error = %e, "Skipping malformed ledger row"),
        }
    }

    Ok(records)
}

pub async fn append_records(
    store: &dyn TableStore,
    table: &str,
    records: &[LearningRecord],
) -> Result<(), RepositoryError> {
    for record in records {
        store.append_row(table, record.to_row()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{AgentAction, Measurement};
    use crate::domain::agent::AgentId;
    use crate::domain::catalog::ALL_SCHEMAS;
    use crate::domain::trust::TrustLevel;
    use crate::infrastructure::repositories::InMemoryTableStore;

    fn record(after: f64) -> LearningRecord {
        let action = AgentAction::propose(AgentId::from("infra-agent"), "repair", "pages", "", TrustLevel::Observe);
        LearningRecord::measure(
            "pages".to_string(),
            &Measurement {
                metric: "schema_drift".to_string(),
                before: 10.0,
                after,
                days_measured: 1,
            },
            &action,
            TrustLevel::Recommend,
        )
    }

    #[tokio::test]
    async fn test_round_trip_skips_cleared_and_malformed_rows() {
        let store = InMemoryTableStore::with_schemas(&ALL_SCHEMAS);
        append_records(&store, "infra_ledger", &[record(5.0), record(12.0)])
            .await
            .unwrap();
        store.clear_row("infra_ledger", 0).await.unwrap();
        store
            .append_row("infra_ledger", vec!["garbage".to_string()])
            .await
            .unwrap();

        let loaded = load_ledger(&store, "infra_ledger").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].after, 12.0);
        assert_eq!(loaded[0].trust_level, TrustLevel::Recommend);
    }

    #[tokio::test]
    async fn test_missing_ledger_reads_empty() {
        let store = InMemoryTableStore::new();
        assert!(load_ledger(&store, "infra_ledger").await.unwrap().is_empty());
    }
}
