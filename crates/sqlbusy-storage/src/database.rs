// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection opener: one connection per worker, WAL mode, busy timeout.
//!
//! Every worker opens its own [`Database`] through [`SharedStore::connect`].
//! Connections are never shared between workers and no in-process lock sits
//! in front of them: all serialization is left to SQLite's own write lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlbusy_config::model::{JournalMode, StorageConfig};
use sqlbusy_config::validation::MAX_BUSY_TIMEOUT_MS;
use sqlbusy_core::SqlbusyError;
use tracing::{debug, info, warn};

use crate::migrations;

/// Busy timeout policy: scale with worker count, never below a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyTimeoutPolicy {
    /// Wait budget contributed by each worker.
    pub per_worker: Duration,
    /// Hard minimum regardless of worker count.
    pub floor: Duration,
}

impl Default for BusyTimeoutPolicy {
    fn default() -> Self {
        Self {
            per_worker: Duration::from_millis(200),
            floor: Duration::from_millis(2000),
        }
    }
}

impl BusyTimeoutPolicy {
    pub fn from_config(storage: &StorageConfig) -> Self {
        Self {
            per_worker: Duration::from_millis(storage.busy_timeout_per_worker_ms),
            floor: Duration::from_millis(storage.min_busy_timeout_ms),
        }
    }

    /// `max(workers * per_worker, floor)`.
    pub fn timeout_for(&self, workers: u32) -> Duration {
        self.per_worker
            .checked_mul(workers)
            .unwrap_or(Duration::MAX)
            .max(self.floor)
    }
}

/// Settings applied to every connection right after it is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    pub busy_timeout: Duration,
}

impl ConnectionOptions {
    /// Options for a run with `workers` concurrent connections.
    pub fn for_workers(storage: &StorageConfig, workers: u32) -> Self {
        Self {
            journal_mode: storage.journal_mode,
            foreign_keys: storage.foreign_keys,
            busy_timeout: BusyTimeoutPolicy::from_config(storage).timeout_for(workers),
        }
    }

    /// WAL, foreign keys on, and an explicit busy timeout.
    pub fn with_busy_timeout(busy_timeout: Duration) -> Self {
        Self {
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
            busy_timeout,
        }
    }
}

/// Apply pragmas and the busy timeout to a freshly opened connection.
///
/// Returns the journal mode SQLite reports afterwards, which differs from the
/// requested one for in-memory databases. A busy timeout beyond what SQLite
/// accepts fails with `SQLITE_RANGE` before any pragma is touched.
pub fn apply_pragmas(
    conn: &rusqlite::Connection,
    options: &ConnectionOptions,
) -> Result<String, rusqlite::Error> {
    let timeout_ms = options.busy_timeout.as_millis();
    if timeout_ms > u128::from(MAX_BUSY_TIMEOUT_MS) {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_RANGE),
            Some(format!(
                "busy timeout of {timeout_ms} ms exceeds {MAX_BUSY_TIMEOUT_MS} ms"
            )),
        ));
    }
    conn.pragma_update(None, "foreign_keys", options.foreign_keys)?;
    let mode: String = conn.pragma_update_and_check(
        None,
        "journal_mode",
        options.journal_mode.pragma_value(),
        |row| row.get(0),
    )?;
    conn.busy_timeout(options.busy_timeout)?;
    Ok(mode)
}

/// Open a blocking connection with `options` applied.
///
/// Used for store preparation and by tests that need a second, independent
/// connection to the same file.
pub fn open_blocking(
    path: &Path,
    options: &ConnectionOptions,
) -> Result<rusqlite::Connection, SqlbusyError> {
    let conn = rusqlite::Connection::open(path).map_err(|e| SqlbusyError::Connection {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;
    apply_pragmas(&conn, options).map_err(|e| SqlbusyError::Configure {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;
    Ok(conn)
}

/// A worker's own connection to the shared store.
///
/// Wraps a `tokio_rusqlite::Connection`, whose background thread is where the
/// worker blocks while SQLite waits out the busy timeout.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
    busy_timeout: Duration,
}

impl Database {
    /// Open `path` and apply `options`.
    ///
    /// Fails with [`SqlbusyError::Connection`] when the file cannot be opened
    /// and [`SqlbusyError::Configure`] when pragmas cannot be applied.
    pub async fn open(path: &Path, options: &ConnectionOptions) -> Result<Self, SqlbusyError> {
        let shown = path.display().to_string();
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| SqlbusyError::Connection {
                path: shown.clone(),
                source: Box::new(e),
            })?;

        let opts = options.clone();
        let mode = conn
            .call(move |conn| apply_pragmas(conn, &opts))
            .await
            .map_err(|e: tokio_rusqlite::Error<rusqlite::Error>| SqlbusyError::Configure {
                path: shown.clone(),
                source: Box::new(e),
            })?;

        if mode != options.journal_mode.pragma_value() {
            warn!(
                path = %shown,
                requested = options.journal_mode.pragma_value(),
                actual = %mode,
                "journal mode not applied"
            );
        }
        info!(
            path = %shown,
            busy_timeout_ms = options.busy_timeout.as_millis() as u64,
            journal_mode = %mode,
            "busy timeout set"
        );

        Ok(Self {
            conn,
            path: shown,
            busy_timeout: options.busy_timeout,
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Close the connection, releasing its background thread.
    pub async fn close(self) -> Result<(), SqlbusyError> {
        self.conn.close().await.map_err(|e| SqlbusyError::Storage {
            source: Box::new(e),
        })?;
        debug!(path = %self.path, "connection closed");
        Ok(())
    }
}

/// Handle to the one physical store every worker connects to.
///
/// Cheap to clone; holds only the location and connection options, never a
/// connection.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    path: PathBuf,
    options: ConnectionOptions,
}

impl SharedStore {
    /// Reference an existing store without touching it.
    pub fn new(path: impl Into<PathBuf>, options: ConnectionOptions) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: path.into(),
                options,
            }),
        }
    }

    /// Create the store if needed, switch it to the configured journal mode,
    /// and run schema migrations. Must complete before any worker starts.
    pub async fn prepare(
        path: impl Into<PathBuf>,
        options: ConnectionOptions,
    ) -> Result<Self, SqlbusyError> {
        let store = Self::new(path, options);
        let db = store.connect().await?;
        db.connection()
            .call(|conn| Ok::<_, rusqlite::Error>(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;
        db.close().await?;
        info!(path = %store.path().display(), "store prepared");
        Ok(store)
    }

    /// Open a new, independent connection for one worker.
    pub async fn connect(&self) -> Result<Database, SqlbusyError> {
        Database::open(&self.inner.path, &self.inner.options).await
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.inner.options
    }
}

/// Convert a tokio-rusqlite error into `SqlbusyError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SqlbusyError {
    SqlbusyError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn busy_timeout_has_a_floor() {
        let policy = BusyTimeoutPolicy::default();
        assert_eq!(policy.timeout_for(1), Duration::from_millis(2000));
        assert_eq!(policy.timeout_for(10), Duration::from_millis(2000));
        assert_eq!(policy.timeout_for(20), Duration::from_millis(4000));
    }

    #[test]
    fn busy_timeout_from_config() {
        let storage = StorageConfig {
            busy_timeout_per_worker_ms: 500,
            min_busy_timeout_ms: 1000,
            ..StorageConfig::default()
        };
        let options = ConnectionOptions::for_workers(&storage, 3);
        assert_eq!(options.busy_timeout, Duration::from_millis(1500));
        assert_eq!(options.journal_mode, JournalMode::Wal);
        assert!(options.foreign_keys);
    }

    proptest! {
        #[test]
        fn busy_timeout_never_below_floor_and_monotonic(workers in 0u32..10_000) {
            let policy = BusyTimeoutPolicy::default();
            let t = policy.timeout_for(workers);
            prop_assert!(t >= policy.floor);
            prop_assert!(policy.timeout_for(workers + 1) >= t);
            prop_assert_eq!(t, Duration::from_millis(u64::from(workers) * 200).max(policy.floor));
        }
    }

    #[test]
    fn open_blocking_applies_pragmas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pragmas.db3");
        let conn = open_blocking(&path, &ConnectionOptions::with_busy_timeout(Duration::from_millis(2000))).unwrap();

        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
        let timeout: i64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 2000);
    }

    #[test]
    fn oversized_busy_timeout_is_a_configure_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("oversized.db3");
        let options = ConnectionOptions::with_busy_timeout(Duration::from_millis(3_000_000_000));

        let err = open_blocking(&path, &options).err().expect("open should fail");
        assert!(matches!(err, SqlbusyError::Configure { .. }), "got {err}");
        assert!(err.to_string().contains("3000000000 ms"));
    }

    #[tokio::test]
    async fn saturated_busy_timeout_fails_the_async_open() {
        let dir = tempdir().unwrap();
        let options = ConnectionOptions::for_workers(
            &StorageConfig {
                busy_timeout_per_worker_ms: u64::MAX,
                ..StorageConfig::default()
            },
            2,
        );
        assert_eq!(options.busy_timeout, Duration::MAX);

        let err = Database::open(&dir.path().join("saturated.db3"), &options)
            .await
            .err()
            .expect("open should fail");
        assert!(matches!(err, SqlbusyError::Configure { .. }), "got {err}");
    }

    #[tokio::test]
    async fn open_reports_connection_error_for_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("nested").join("busy.db3");
        let result = Database::open(&path, &ConnectionOptions::with_busy_timeout(Duration::from_millis(100))).await;
        let err = result.err().expect("open should fail");
        assert!(err.is_connection_error(), "got {err}");
    }

    #[tokio::test]
    async fn prepare_creates_schema_and_is_repeatable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepared.db3");
        let options = ConnectionOptions::with_busy_timeout(Duration::from_millis(2000));

        SharedStore::prepare(&path, options.clone()).await.unwrap();
        let store = SharedStore::prepare(&path, options).await.unwrap();

        let db = store.connect().await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM busy", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(db.busy_timeout(), Duration::from_millis(2000));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn each_connect_is_an_independent_connection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("independent.db3");
        let store = SharedStore::prepare(&path, ConnectionOptions::with_busy_timeout(Duration::from_millis(2000)))
            .await
            .unwrap();

        let a = store.connect().await.unwrap();
        let b = store.connect().await.unwrap();

        // A transaction opened on `a` is invisible to `b`'s autocommit state.
        a.connection()
            .call(|conn| conn.execute_batch("BEGIN IMMEDIATE"))
            .await
            .unwrap();
        let b_autocommit = b
            .connection()
            .call(|conn| Ok::<_, rusqlite::Error>(conn.is_autocommit()))
            .await
            .unwrap();
        assert!(b_autocommit);
        a.connection()
            .call(|conn| conn.execute_batch("COMMIT"))
            .await
            .unwrap();
    }
}
