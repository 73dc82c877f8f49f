// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stress table reads used by post-run verification and reporting.

use rusqlite::params;
use sqlbusy_core::SqlbusyError;

use crate::database::Database;
use crate::models::StressRecord;

const SELECT_RECORDS: &str = "SELECT id, thread, sequence, Created, run FROM busy";

fn to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StressRecord> {
    Ok(StressRecord {
        id: row.get(0)?,
        thread: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
        sequence: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
        created_at: row.get(3)?,
        run: row.get(4)?,
    })
}

/// List every row, ordered by writer identity then sequence.
pub async fn list_records(db: &Database) -> Result<Vec<StressRecord>, SqlbusyError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare(&format!("{SELECT_RECORDS} ORDER BY thread, sequence, id"))?;
            let rows = stmt.query_map([], to_record)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List the rows written during one run, ordered like [`list_records`].
pub async fn list_records_for_run(
    db: &Database,
    run: &str,
) -> Result<Vec<StressRecord>, SqlbusyError> {
    let run = run.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_RECORDS} WHERE run = ?1 ORDER BY thread, sequence, id"
            ))?;
            let rows = stmt.query_map(params![run], to_record)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count every row in the stress table.
pub async fn count_records(db: &Database) -> Result<u64, SqlbusyError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT COUNT(*) FROM busy", [], |row| row.get::<_, i64>(0)))
        .await
        .map(|n| n.max(0) as u64)
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::database::{ConnectionOptions, SharedStore};

    async fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let store = SharedStore::prepare(
            dir.path().join("records.db3"),
            ConnectionOptions::with_busy_timeout(Duration::from_millis(2000)),
        )
        .await
        .unwrap();
        let db = store.connect().await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn empty_table_has_no_records() {
        let (_dir, db) = setup().await;
        assert_eq!(count_records(&db).await.unwrap(), 0);
        assert!(list_records(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn records_are_ordered_by_thread_then_sequence() {
        let (_dir, db) = setup().await;
        db.connection()
            .call(|conn| {
                conn.execute_batch(
                    "INSERT INTO busy (thread, sequence) VALUES (3, 2);
                     INSERT INTO busy (thread, sequence) VALUES (2, 1);
                     INSERT INTO busy (thread, sequence) VALUES (3, 1);",
                )
            })
            .await
            .unwrap();

        let records = list_records(&db).await.unwrap();
        let keys: Vec<(i64, i64)> = records.iter().map(|r| (r.thread, r.sequence)).collect();
        assert_eq!(keys, vec![(2, 1), (3, 1), (3, 2)]);
        assert!(records.iter().all(|r| r.created_at.is_some()));

        assert_eq!(count_records(&db).await.unwrap(), 3);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn records_for_run_skip_other_runs() {
        let (_dir, db) = setup().await;
        db.connection()
            .call(|conn| {
                conn.execute_batch(
                    "INSERT INTO busy (thread, sequence, run) VALUES (2, 1, 'first');
                     INSERT INTO busy (thread, sequence, run) VALUES (2, 1, 'second');
                     INSERT INTO busy (thread, sequence) VALUES (2, 1);
                     INSERT INTO busy (thread, sequence, run) VALUES (2, 2, 'second');",
                )
            })
            .await
            .unwrap();

        let second = list_records_for_run(&db, "second").await.unwrap();
        assert_eq!(
            second.iter().map(|r| r.sequence).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(second.iter().all(|r| r.run.as_deref() == Some("second")));
        assert!(list_records_for_run(&db, "third").await.unwrap().is_empty());
        assert_eq!(list_records(&db).await.unwrap().len(), 4);
        db.close().await.unwrap();
    }
}
