// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction sequence runner shared by the writer and deleter roles.
//!
//! One call runs one transaction attempt:
//! `Idle -> BeginPending -> Executing(step) -> CommitPending -> Committed | Aborted`.
//! Waiting on a busy lock happens inside the executor and surfaces here only
//! as a contention error once the busy timeout has elapsed.
//!
//! Error policy per step: kinds listed in [`SequencePolicy::tolerate`] are
//! logged and skipped; anything else stops the sequence. The transaction
//! boundary is always closed: `COMMIT` when the transaction is still open,
//! `ROLLBACK` if that commit fails, nothing if the engine already ended it.

use serde::Serialize;
use sqlbusy_core::{
    BeginMode, Statement, StatementError, StatementExecutor, StoreErrorKind, WorkerId,
};
use tracing::{debug, error, trace, warn};

/// Per-run sequence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePolicy {
    pub begin_mode: BeginMode,
    /// Statement error kinds skipped instead of aborting.
    pub tolerate: Vec<StoreErrorKind>,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self {
            begin_mode: BeginMode::Immediate,
            tolerate: vec![StoreErrorKind::Constraint],
        }
    }
}

impl SequencePolicy {
    pub fn tolerates(&self, err: &StatementError) -> bool {
        self.tolerate.contains(&err.kind)
    }
}

/// How the transaction boundary was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// `BEGIN` failed; there was nothing to close.
    NeverOpened,
    /// `COMMIT` succeeded.
    Committed,
    /// `COMMIT` failed and `ROLLBACK` was issued.
    RolledBack,
    /// The engine ended the transaction itself after a step error.
    ClosedByEngine,
}

/// Result of one transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Every step ran (tolerated errors included) and the commit succeeded.
    Committed,
    /// The sequence stopped at `at_step` (1-based; 0 when `BEGIN` failed).
    Aborted { at_step: u64, error: StatementError },
    /// `BEGIN` timed out on the lock; nothing was attempted.
    Retryable(StatementError),
}

/// Accounting for one transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub outcome: AttemptOutcome,
    pub boundary: Boundary,
    /// Steps issued, including the failing one.
    pub attempted: u64,
    /// Steps that succeeded.
    pub applied: u64,
    /// Steps whose error was tolerated.
    pub tolerated: u64,
    /// Rows changed by successful steps.
    pub rows_changed: u64,
}

impl AttemptReport {
    fn never_opened(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            boundary: Boundary::NeverOpened,
            attempted: 0,
            applied: 0,
            tolerated: 0,
            rows_changed: 0,
        }
    }

    /// Steps that are durable after this attempt.
    pub fn persisted(&self) -> u64 {
        if self.boundary == Boundary::Committed {
            self.applied
        } else {
            0
        }
    }

    /// Rows changed that are durable after this attempt.
    pub fn rows_persisted(&self) -> u64 {
        if self.boundary == Boundary::Committed {
            self.rows_changed
        } else {
            0
        }
    }
}

/// Run one begin/steps/commit cycle.
///
/// `step` builds the statement for each sequence value. `counter` is the
/// worker's sequence counter: it supplies the value for each step and is
/// incremented after every attempted step, whether or not the step succeeded.
pub fn run_sequence<E, F>(
    exec: &mut E,
    identity: WorkerId,
    policy: &SequencePolicy,
    counter: &mut u64,
    steps: u64,
    mut step: F,
) -> AttemptReport
where
    E: StatementExecutor + ?Sized,
    F: FnMut(u64) -> Statement,
{
    trace!(worker = %identity, "begin pending");
    if let Err(err) = exec.execute(&Statement::Begin(policy.begin_mode)) {
        return if err.is_contention() {
            debug!(worker = %identity, error = %err, "begin timed out on the write lock");
            AttemptReport::never_opened(AttemptOutcome::Retryable(err))
        } else {
            warn!(worker = %identity, error = %err, "aborting worker {identity} after 0 iterations");
            AttemptReport::never_opened(AttemptOutcome::Aborted {
                at_step: 0,
                error: err,
            })
        };
    }

    let mut report = AttemptReport {
        outcome: AttemptOutcome::Committed,
        boundary: Boundary::Committed,
        attempted: 0,
        applied: 0,
        tolerated: 0,
        rows_changed: 0,
    };

    for index in 1..=steps {
        let sequence = *counter;
        let statement = step(sequence);
        *counter += 1;
        report.attempted = index;

        match exec.execute(&statement) {
            Ok(changed) => {
                report.applied += 1;
                report.rows_changed += changed as u64;
            }
            Err(err) if policy.tolerates(&err) => {
                report.tolerated += 1;
                warn!(
                    worker = %identity,
                    step = index,
                    sequence,
                    error = %err,
                    "tolerated statement error"
                );
            }
            Err(err) => {
                warn!(
                    worker = %identity,
                    step = index,
                    error = %err,
                    "aborting worker {identity} after {index} iterations"
                );
                report.outcome = AttemptOutcome::Aborted {
                    at_step: index,
                    error: err,
                };
                break;
            }
        }
    }

    report.boundary = close_boundary(exec, identity, &mut report);
    report
}

/// Close the transaction and return how it ended. A failed commit turns a
/// clean outcome into an abort at the last attempted step.
fn close_boundary<E>(exec: &mut E, identity: WorkerId, report: &mut AttemptReport) -> Boundary
where
    E: StatementExecutor + ?Sized,
{
    if !exec.in_transaction() {
        debug!(worker = %identity, "transaction already closed by the engine");
        return Boundary::ClosedByEngine;
    }

    trace!(worker = %identity, "commit pending");
    let err = match exec.execute(&Statement::Commit) {
        Ok(_) => return Boundary::Committed,
        Err(err) => err,
    };

    error!(worker = %identity, error = %err, "commit failed");
    if report.outcome == AttemptOutcome::Committed {
        report.outcome = AttemptOutcome::Aborted {
            at_step: report.attempted,
            error: err,
        };
    }

    if !exec.in_transaction() {
        return Boundary::ClosedByEngine;
    }
    match exec.execute(&Statement::Rollback) {
        Ok(_) => error!(worker = %identity, "transaction rolled back"),
        Err(e) => error!(worker = %identity, error = %e, "rollback failed"),
    }
    Boundary::RolledBack
}
