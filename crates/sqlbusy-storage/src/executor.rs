// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`StatementExecutor`] over a live rusqlite connection, plus classification
//! of engine errors into [`StoreErrorKind`].

use rusqlite::{params, ErrorCode};
use sqlbusy_core::{Statement, StatementError, StatementExecutor, StoreErrorKind};

const INSERT_SQL: &str = "INSERT INTO busy (thread, sequence, run) VALUES (?1, ?2, ?3)";
const DELETE_ALL_SQL: &str = "DELETE FROM busy";

/// Executes statements on one borrowed connection.
///
/// Constructed inside a `tokio_rusqlite::Connection::call` closure so the
/// whole sequence runs on the connection's own thread.
pub struct SqliteExecutor<'c> {
    conn: &'c rusqlite::Connection,
    run: Option<&'c str>,
}

impl<'c> SqliteExecutor<'c> {
    pub fn new(conn: &'c rusqlite::Connection) -> Self {
        Self { conn, run: None }
    }

    /// Tag every inserted row with `run`.
    pub fn with_run(mut self, run: &'c str) -> Self {
        self.run = Some(run);
        self
    }
}

impl StatementExecutor for SqliteExecutor<'_> {
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError> {
        let result = match statement {
            Statement::Begin(mode) => self.conn.execute_batch(mode.sql()).map(|()| 0),
            Statement::Insert { thread, sequence } => {
                let sequence = i64::try_from(*sequence).map_err(|_| {
                    StatementError::new(
                        StoreErrorKind::Other,
                        format!("sequence {sequence} does not fit in INTEGER"),
                    )
                })?;
                self.conn
                    .prepare_cached(INSERT_SQL)
                    .and_then(|mut stmt| stmt.execute(params![thread.0, sequence, self.run]))
            }
            Statement::DeleteAll => self.conn.execute(DELETE_ALL_SQL, []),
            Statement::Commit => self.conn.execute_batch("COMMIT").map(|()| 0),
            Statement::Rollback => self.conn.execute_batch("ROLLBACK").map(|()| 0),
        };
        result.map_err(|e| classify(&e))
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

/// Map a rusqlite error onto the harness's error kinds.
///
/// Engine failures keep their extended result code; errors raised by
/// rusqlite itself (parameter binding, type conversion) have none and are
/// classified as [`StoreErrorKind::Other`].
pub fn classify(err: &rusqlite::Error) -> StatementError {
    match err {
        rusqlite::Error::SqliteFailure(ffi, message) => {
            let kind = match ffi.code {
                ErrorCode::ConstraintViolation => StoreErrorKind::Constraint,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => StoreErrorKind::Contention,
                ErrorCode::SystemIoFailure | ErrorCode::DiskFull | ErrorCode::CannotOpen => {
                    StoreErrorKind::Io
                }
                ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::ApiMisuse
                | ErrorCode::ReadOnly => StoreErrorKind::Closed,
                _ => StoreErrorKind::Other,
            };
            let text = message.clone().unwrap_or_else(|| ffi.to_string());
            StatementError::new(kind, text).with_code(ffi.extended_code)
        }
        other => StatementError::new(StoreErrorKind::Other, other.to_string()),
    }
}
