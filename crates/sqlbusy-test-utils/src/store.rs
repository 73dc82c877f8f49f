// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temporary SQLite store fixture.
//!
//! `TempStore` owns a temp directory holding a prepared `busy` table. The
//! directory, and the database with it, is removed when the fixture drops.

use std::path::Path;
use std::time::Duration;

use rusqlite::params;
use sqlbusy_core::{SqlbusyError, StressRecord};
use sqlbusy_storage::database::open_blocking;
use sqlbusy_storage::queries::records;
use sqlbusy_storage::{ConnectionOptions, SharedStore};

/// A prepared store in its own temp directory.
pub struct TempStore {
    _dir: tempfile::TempDir,
    store: SharedStore,
}

impl TempStore {
    /// Prepare a store with a 2000 ms busy timeout.
    pub async fn new() -> Result<Self, SqlbusyError> {
        Self::with_busy_timeout(Duration::from_millis(2000)).await
    }

    /// Prepare a store whose worker connections use `busy_timeout`.
    pub async fn with_busy_timeout(busy_timeout: Duration) -> Result<Self, SqlbusyError> {
        let dir = tempfile::TempDir::new().map_err(|e| SqlbusyError::Storage { source: e.into() })?;
        let path = dir.path().join("busy.db3");
        let store =
            SharedStore::prepare(path, ConnectionOptions::with_busy_timeout(busy_timeout)).await?;
        Ok(Self { _dir: dir, store })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// A blocking connection outside any worker, e.g. to hold the write lock.
    pub fn raw_connection(&self, busy_timeout: Duration) -> Result<rusqlite::Connection, SqlbusyError> {
        open_blocking(self.path(), &ConnectionOptions::with_busy_timeout(busy_timeout))
    }

    /// Insert `(thread, sequence)` rows directly, outside the harness.
    pub fn seed(&self, rows: &[(u32, u64)]) -> Result<(), SqlbusyError> {
        let conn = self.raw_connection(Duration::from_millis(2000))?;
        for (thread, sequence) in rows {
            let sequence = i64::try_from(*sequence)
                .map_err(|e| SqlbusyError::Internal(format!("sequence out of range: {e}")))?;
            conn.execute(
                "INSERT INTO busy (thread, sequence) VALUES (?1, ?2)",
                params![thread, sequence],
            )
            .map_err(|e| SqlbusyError::Storage { source: e.into() })?;
        }
        Ok(())
    }

    /// Run arbitrary SQL, e.g. to add a unique index for constraint tests.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlbusyError> {
        self.raw_connection(Duration::from_millis(2000))?
            .execute_batch(sql)
            .map_err(|e| SqlbusyError::Storage { source: e.into() })
    }

    /// Every persisted row, ordered by thread then sequence.
    pub async fn records(&self) -> Result<Vec<StressRecord>, SqlbusyError> {
        let db = self.store.connect().await?;
        let rows = records::list_records(&db).await?;
        db.close().await?;
        Ok(rows)
    }

    /// Persisted sequences for one thread, ordered.
    pub async fn sequences_for(&self, thread: u32) -> Result<Vec<i64>, SqlbusyError> {
        Ok(self
            .records()
            .await?
            .into_iter()
            .filter(|r| r.thread == i64::from(thread))
            .map(|r| r.sequence)
            .collect())
    }

    pub async fn count(&self) -> Result<u64, SqlbusyError> {
        let db = self.store.connect().await?;
        let n = records::count_records(&db).await?;
        db.close().await?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn temp_store_is_prepared_and_seedable() {
        let store = TempStore::new().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        store.seed(&[(2, 1), (2, 2), (3, 1)]).unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
        assert_eq!(store.sequences_for(2).await.unwrap(), vec![1, 2]);
        assert!(store.path().exists());
    }
}
