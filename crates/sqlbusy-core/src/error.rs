// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the sqlbusy stress harness.
//!
//! [`SqlbusyError`] covers failures that stop a worker or the whole run
//! (configuration, connection setup, schema preparation). Failures of a
//! single statement inside a transaction are plain values, see
//! [`StatementError`], because the sequence runner decides per kind whether
//! they are tolerated or abort the sequence.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across the sqlbusy crates.
#[derive(Debug, Error)]
pub enum SqlbusyError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The store could not be opened at `path`.
    #[error("cannot open store {path}: {source}")]
    Connection {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store was opened but applying pragmas or the busy timeout failed.
    #[error("cannot configure store {path}: {source}")]
    Configure {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage errors outside of a transaction sequence (queries, closed connection).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Schema migration failed.
    #[error("schema error: {source}")]
    Schema {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SqlbusyError {
    /// Returns `true` for the connection-setup failures that are fatal to a
    /// single worker (open or configure).
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Configure { .. })
    }
}

/// Classification of a failed statement.
///
/// Serialized in snake case so the same names work in TOML (`tolerate`) and
/// JSON reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    /// Integrity rule failure such as a uniqueness conflict.
    Constraint,
    /// The write lock was held past the busy timeout.
    Contention,
    /// Disk or filesystem failure.
    Io,
    /// The store is closed, corrupt, or otherwise unusable.
    Closed,
    /// Anything else.
    Other,
}

/// A single statement failure reported by a [`StatementExecutor`](crate::StatementExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct StatementError {
    /// Classified kind.
    pub kind: StoreErrorKind,
    /// Raw engine result code, when the engine reported one.
    pub code: Option<i32>,
    /// Human-readable engine message.
    pub message: String,
}

impl StatementError {
    /// Build a statement error without an engine result code.
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
        }
    }

    /// Attach the engine's raw result code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Shorthand for `self.kind == StoreErrorKind::Constraint`.
    pub fn is_constraint(&self) -> bool {
        self.kind == StoreErrorKind::Constraint
    }

    /// Shorthand for `self.kind == StoreErrorKind::Contention`.
    pub fn is_contention(&self) -> bool {
        self.kind == StoreErrorKind::Contention
    }
}
