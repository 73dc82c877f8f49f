// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary via
//! `embed_migrations!` and applied once by [`SharedStore::prepare`](crate::SharedStore::prepare),
//! before any worker connects.

use sqlbusy_core::SqlbusyError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table,
/// so preparing an already-prepared store is a no-op.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), SqlbusyError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| SqlbusyError::Schema {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        tracing::debug!(migration = %migration, "applied migration");
    }
    Ok(())
}
