// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker lifecycle: open a private connection, run the role, close.

use std::time::Instant;

use sqlbusy_core::{Role, SqlbusyError, Statement, StatementExecutor, WorkerId};
use sqlbusy_storage::database::map_tr_err;
use sqlbusy_storage::{Database, SharedStore, SqliteExecutor};
use tracing::{debug, error, info, warn, Span};
use uuid::Uuid;

use crate::plan::WorkloadPlan;
use crate::report::{WorkerReport, WorkerStatus};
use crate::sequence::{run_sequence, AttemptOutcome, AttemptReport};
use crate::{deleter, writer};

/// The work steps of one transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Work {
    /// `n` inserts tagged with the worker's identity and sequence counter.
    Inserts(u64),
    /// One purge of the stress table.
    DeleteAll,
}

/// State owned by exactly one worker for its lifetime.
pub struct WorkerHandle {
    identity: WorkerId,
    role: Role,
    run: String,
    db: Database,
    sequence: u64,
}

impl WorkerHandle {
    /// Open this worker's own connection to `store`. Rows it inserts are
    /// tagged with `run`.
    pub async fn open(
        identity: WorkerId,
        role: Role,
        run: Uuid,
        store: &SharedStore,
    ) -> Result<Self, SqlbusyError> {
        let db = store.connect().await?;
        Ok(Self {
            identity,
            role,
            run: run.to_string(),
            db,
            sequence: 1,
        })
    }

    pub fn identity(&self) -> WorkerId {
        self.identity
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run one transaction attempt on the connection's thread.
    pub async fn attempt(
        &mut self,
        plan: &WorkloadPlan,
        work: Work,
    ) -> Result<AttemptReport, SqlbusyError> {
        let identity = self.identity;
        let policy = plan.policy.clone();
        let layer = plan.layer.clone();
        let run = self.run.clone();
        let mut counter = self.sequence;
        let span = Span::current();

        let (report, counter) = self
            .db
            .connection()
            .call(move |conn| {
                let _entered = span.enter();
                let base: Box<dyn StatementExecutor + '_> =
                    Box::new(SqliteExecutor::new(conn).with_run(&run));
                let mut exec = match &layer {
                    Some(layer) => layer.wrap(identity, base),
                    None => base,
                };
                let report = match work {
                    Work::Inserts(n) => {
                        run_sequence(&mut exec, identity, &policy, &mut counter, n, |sequence| {
                            Statement::Insert {
                                thread: identity,
                                sequence,
                            }
                        })
                    }
                    Work::DeleteAll => run_sequence(&mut exec, identity, &policy, &mut counter, 1, |_| {
                        Statement::DeleteAll
                    }),
                };
                Ok::<_, rusqlite::Error>((report, counter))
            })
            .await
            .map_err(map_tr_err)?;

        self.sequence = counter;
        Ok(report)
    }

    /// Run an attempt, retrying while `BEGIN` times out, up to
    /// `plan.begin_retries` extra times.
    pub async fn attempt_with_retries(
        &mut self,
        plan: &WorkloadPlan,
        work: Work,
    ) -> Result<AttemptReport, SqlbusyError> {
        let mut retries = 0;
        loop {
            let report = self.attempt(plan, work).await?;
            match &report.outcome {
                AttemptOutcome::Retryable(err) if retries < plan.begin_retries => {
                    retries += 1;
                    debug!(retry = retries, error = %err, "retrying begin");
                }
                _ => return Ok(report),
            }
        }
    }

    pub async fn close(self) -> Result<(), SqlbusyError> {
        self.db.close().await
    }
}

/// Fold one attempt into the worker's report. Returns the status that ends
/// the worker, if the attempt did not commit.
pub(crate) fn record_attempt(
    report: &mut WorkerReport,
    attempt: &AttemptReport,
) -> Option<WorkerStatus> {
    report.attempted += attempt.attempted;
    report.persisted += attempt.persisted();
    report.tolerated += attempt.tolerated;
    match &attempt.outcome {
        AttemptOutcome::Committed => {
            report.committed += 1;
            None
        }
        AttemptOutcome::Aborted { at_step, error } => Some(WorkerStatus::Aborted {
            after: *at_step,
            error: error.clone(),
        }),
        AttemptOutcome::Retryable(error) => {
            warn!(
                worker = %report.identity,
                error = %error,
                "aborting worker {} after 0 iterations",
                report.identity
            );
            Some(WorkerStatus::Aborted {
                after: 0,
                error: error.clone(),
            })
        }
    }
}

/// Open a connection, run the role, and report. Never fails: every error
/// ends up in the returned status.
pub async fn run_worker(
    identity: WorkerId,
    role: Role,
    run: Uuid,
    store: SharedStore,
    plan: &WorkloadPlan,
) -> WorkerReport {
    let started = Instant::now();
    info!("worker started");

    let mut handle = match WorkerHandle::open(identity, role, run, &store).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "connection failed");
            let mut report = WorkerReport::with_status(
                identity,
                role,
                WorkerStatus::ConnectionFailed {
                    error: e.to_string(),
                },
            );
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            return report;
        }
    };

    let result = match role {
        Role::Writer => writer::run(&mut handle, plan).await,
        Role::Deleter => deleter::run(&mut handle, plan).await,
    };
    let mut report = result.unwrap_or_else(|e| {
        error!(error = %e, "worker failed");
        WorkerReport::with_status(
            identity,
            role,
            WorkerStatus::Failed {
                error: e.to_string(),
            },
        )
    });

    if let Err(e) = handle.close().await {
        warn!(error = %e, "closing connection failed");
    }
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    match &report.status {
        WorkerStatus::Finished => info!(
            attempted = report.attempted,
            persisted = report.persisted,
            "worker finished"
        ),
        WorkerStatus::Aborted { after, .. } => {
            info!(after, "worker {identity} aborted after {after} iterations")
        }
        _ => {}
    }
    report
}
