// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-worker and per-run reports, rendered as text or JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlbusy_core::{Role, StatementError, WorkerId};
use uuid::Uuid;

/// How a worker's run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Every transaction or cycle completed.
    Finished,
    /// A sequence stopped at step `after` (0 when `BEGIN` never succeeded).
    Aborted { after: u64, error: StatementError },
    /// The worker could not open or configure its connection.
    ConnectionFailed { error: String },
    /// The connection failed outside a sequence, e.g. it was closed.
    Failed { error: String },
    /// The worker task panicked.
    Panicked { message: String },
}

/// Outcome of one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub identity: WorkerId,
    pub role: Role,
    #[serde(flatten)]
    pub status: WorkerStatus,
    /// Transactions (writer) or cycles (deleter) committed.
    pub committed: u32,
    /// Steps attempted across all transactions.
    pub attempted: u64,
    /// Steps made durable by a successful commit.
    pub persisted: u64,
    /// Steps whose error was tolerated.
    pub tolerated: u64,
    /// Rows removed by committed delete cycles.
    pub rows_deleted: u64,
    pub elapsed_ms: u64,
}

impl WorkerReport {
    pub fn new(identity: WorkerId, role: Role) -> Self {
        Self {
            identity,
            role,
            status: WorkerStatus::Finished,
            committed: 0,
            attempted: 0,
            persisted: 0,
            tolerated: 0,
            rows_deleted: 0,
            elapsed_ms: 0,
        }
    }

    pub fn with_status(identity: WorkerId, role: Role, status: WorkerStatus) -> Self {
        Self {
            status,
            ..Self::new(identity, role)
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, WorkerStatus::Aborted { .. })
    }
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} ({}): ", self.identity, self.role)?;
        match &self.status {
            WorkerStatus::Finished => match self.role {
                Role::Writer => write!(
                    f,
                    "finished, {} attempted, {} persisted",
                    self.attempted, self.persisted
                ),
                Role::Deleter => write!(
                    f,
                    "finished, {} cycles, {} rows deleted",
                    self.committed, self.rows_deleted
                ),
            },
            WorkerStatus::Aborted { after, error } => {
                write!(f, "aborted after {after} iterations: {error}")
            }
            WorkerStatus::ConnectionFailed { error } => write!(f, "connection failed: {error}"),
            WorkerStatus::Failed { error } => write!(f, "failed: {error}"),
            WorkerStatus::Panicked { message } => write!(f, "panicked: {message}"),
        }
    }
}

/// Totals across all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub finished: usize,
    pub aborted: usize,
    pub connection_failures: usize,
    pub failed: usize,
    pub panicked: usize,
    pub rows_persisted: u64,
    pub rows_deleted: u64,
    pub tolerated: u64,
}

/// Outcome of one coordinator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub busy_timeout_ms: u64,
    /// Sorted by identity.
    pub workers: Vec<WorkerReport>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        self.workers
            .iter()
            .fold(RunSummary::default(), |mut sum, worker| {
                match worker.status {
                    WorkerStatus::Finished => sum.finished += 1,
                    WorkerStatus::Aborted { .. } => sum.aborted += 1,
                    WorkerStatus::ConnectionFailed { .. } => sum.connection_failures += 1,
                    WorkerStatus::Failed { .. } => sum.failed += 1,
                    WorkerStatus::Panicked { .. } => sum.panicked += 1,
                }
                if worker.role == Role::Writer {
                    sum.rows_persisted += worker.persisted;
                }
                sum.rows_deleted += worker.rows_deleted;
                sum.tolerated += worker.tolerated;
                sum
            })
    }

    pub fn worker(&self, identity: WorkerId) -> Option<&WorkerReport> {
        self.workers.iter().find(|w| w.identity == identity)
    }

    /// One line per worker followed by a summary line.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "run {}: {} workers, busy timeout {} ms, {} ms\n",
            self.run_id,
            self.workers.len(),
            self.busy_timeout_ms,
            self.elapsed_ms
        );
        for worker in &self.workers {
            out.push_str(&worker.to_string());
            out.push('\n');
        }
        let s = self.summary();
        out.push_str(&format!(
            "summary: {} finished, {} aborted, {} connection failures, {} failed, {} panicked; \
             {} rows persisted, {} rows deleted, {} tolerated errors\n",
            s.finished,
            s.aborted,
            s.connection_failures,
            s.failed,
            s.panicked,
            s.rows_persisted,
            s.rows_deleted,
            s.tolerated
        ));
        out
    }

    /// Pretty-printed JSON including the summary.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct WithSummary<'a> {
            #[serde(flatten)]
            report: &'a RunReport,
            summary: RunSummary,
        }
        serde_json::to_string_pretty(&WithSummary {
            report: self,
            summary: self.summary(),
        })
    }
}
