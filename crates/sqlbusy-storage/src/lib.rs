// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage layer for the sqlbusy stress harness.
//!
//! Opens one independent `tokio-rusqlite` connection per worker with WAL
//! mode, foreign keys, and a worker-scaled busy timeout. Provides embedded
//! migrations for the stress table, a [`SqliteExecutor`] implementing the
//! core statement seam, and read-side queries for verification.

pub mod database;
pub mod executor;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{BusyTimeoutPolicy, ConnectionOptions, Database, SharedStore};
pub use executor::{classify, SqliteExecutor};
pub use models::*;
