// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the storage layer and the harness.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Name of the append-only table every worker writes to.
pub const STRESS_TABLE: &str = "busy";

/// Identity of a worker. Identities start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a worker plays during a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Inserts tagged rows inside one exclusive transaction.
    Writer,
    /// Periodically purges every row.
    Deleter,
}

/// How a transaction acquires the write lock at begin.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BeginMode {
    /// `BEGIN IMMEDIATE`: reserve the write lock now, readers continue.
    #[default]
    Immediate,
    /// `BEGIN EXCLUSIVE`: same as immediate under WAL, stricter otherwise.
    Exclusive,
}

impl BeginMode {
    /// The SQL text that opens a transaction in this mode.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Immediate => "BEGIN IMMEDIATE",
            Self::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// One statement issued by a worker.
///
/// `Insert` and `DeleteAll` are the work steps of a sequence; the others
/// open or close the transaction boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Begin(BeginMode),
    Insert { thread: WorkerId, sequence: u64 },
    DeleteAll,
    Commit,
    Rollback,
}

impl Statement {
    /// Returns `true` for statements counted as sequence steps.
    pub fn is_step(&self) -> bool {
        matches!(self, Self::Insert { .. } | Self::DeleteAll)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin(mode) => f.write_str(mode.sql()),
            Self::Insert { thread, sequence } => write!(
                f,
                "INSERT INTO {STRESS_TABLE} (thread, sequence) VALUES ({thread}, {sequence})"
            ),
            Self::DeleteAll => write!(f, "DELETE FROM {STRESS_TABLE}"),
            Self::Commit => f.write_str("COMMIT"),
            Self::Rollback => f.write_str("ROLLBACK"),
        }
    }
}

/// A row of the stress table as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    /// Identity of the writer that inserted the row.
    pub thread: i64,
    /// Writer's sequence counter at insert time.
    pub sequence: i64,
    /// Store-assigned creation timestamp.
    pub created_at: Option<String>,
    /// Run that wrote the row; `None` for rows written outside a run.
    #[serde(default)]
    pub run: Option<String>,
}
