// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting executor for deterministic contention tests.
//!
//! `FaultInjector` wraps any [`StatementExecutor`] and, at pre-configured
//! points, replaces a statement's result with a classified error or sleeps
//! before running it. Every statement a wrapped executor sees is recorded in
//! a shared [`Transcript`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sqlbusy_core::{
    ExecutorLayer, Statement, StatementError, StatementExecutor, StoreErrorKind, WorkerId,
};

/// SQLite's extended result code for a UNIQUE constraint failure.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;
const SQLITE_BUSY: i32 = 5;
const SQLITE_IOERR: i32 = 10;

/// Where a fault fires. Counts are 1-based and kept per worker across every
/// executor wrapped for that worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// The n-th `BEGIN`.
    Begin(u32),
    /// The n-th work step (insert or delete-all).
    Step(u64),
    /// The n-th `COMMIT`.
    Commit(u32),
}

/// What happens when a fault fires.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultAction {
    /// Return the error instead of running the statement.
    Fail(StatementError),
    /// Roll the real transaction back, then return the error. Mimics engine
    /// errors that end the transaction on their own.
    FailAndRollback(StatementError),
    /// Sleep on the connection thread, then run the statement.
    Delay(Duration),
}

impl FaultAction {
    /// A busy-timeout expiry.
    pub fn contention() -> Self {
        Self::Fail(
            StatementError::new(StoreErrorKind::Contention, "database is locked")
                .with_code(SQLITE_BUSY),
        )
    }

    /// A uniqueness conflict on the stress table.
    pub fn constraint() -> Self {
        Self::Fail(
            StatementError::new(
                StoreErrorKind::Constraint,
                "UNIQUE constraint failed: busy.thread, busy.sequence",
            )
            .with_code(SQLITE_CONSTRAINT_UNIQUE),
        )
    }

    /// A disk I/O error.
    pub fn io() -> Self {
        Self::Fail(StatementError::new(StoreErrorKind::Io, "disk I/O error").with_code(SQLITE_IOERR))
    }

    pub fn delay(duration: Duration) -> Self {
        Self::Delay(duration)
    }
}

/// A single configured fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    worker: Option<WorkerId>,
    point: FaultPoint,
    action: FaultAction,
}

impl Fault {
    pub fn at_step(step: u64, action: FaultAction) -> Self {
        Self {
            worker: None,
            point: FaultPoint::Step(step),
            action,
        }
    }

    pub fn at_begin(attempt: u32, action: FaultAction) -> Self {
        Self {
            worker: None,
            point: FaultPoint::Begin(attempt),
            action,
        }
    }

    pub fn at_commit(attempt: u32, action: FaultAction) -> Self {
        Self {
            worker: None,
            point: FaultPoint::Commit(attempt),
            action,
        }
    }

    /// Restrict the fault to one worker. Unrestricted faults fire for every
    /// worker that reaches the point.
    pub fn for_worker(mut self, worker: WorkerId) -> Self {
        self.worker = Some(worker);
        self
    }

    fn matches(&self, worker: WorkerId, point: FaultPoint) -> bool {
        self.point == point && self.worker.is_none_or(|w| w == worker)
    }
}

/// One statement seen by a wrapped executor.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub worker: WorkerId,
    pub statement: Statement,
    /// Rows changed, or the kind of error returned.
    pub result: Result<usize, StoreErrorKind>,
    /// Whether the result came from an injected fault.
    pub injected: bool,
}

/// Shared, append-only record of statements across all wrapped executors.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
}

impl Transcript {
    fn push(&self, entry: TranscriptEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Snapshot of every entry in execution order.
    pub fn entries(&self) -> Vec<TranscriptEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Statements issued by one worker, in order.
    pub fn statements_for(&self, worker: WorkerId) -> Vec<Statement> {
        self.entries()
            .into_iter()
            .filter(|e| e.worker == worker)
            .map(|e| e.statement)
            .collect()
    }

    /// Number of statements matching `predicate` issued by `worker`.
    pub fn count_for(&self, worker: WorkerId, predicate: impl Fn(&Statement) -> bool) -> usize {
        self.statements_for(worker)
            .iter()
            .filter(|s| predicate(s))
            .count()
    }

    /// The last statement issued by `worker`.
    pub fn last_for(&self, worker: WorkerId) -> Option<Statement> {
        self.statements_for(worker).pop()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    begins: u32,
    steps: u64,
    commits: u32,
}

#[derive(Debug, Default)]
struct InjectorState {
    faults: Vec<Fault>,
    counters: Mutex<HashMap<WorkerId, Counters>>,
}

impl InjectorState {
    /// Advance the worker's counter for `statement` and return the fault due
    /// at the new position, if any.
    fn next_fault(&self, worker: WorkerId, statement: &Statement) -> Option<FaultAction> {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let c = counters.entry(worker).or_default();
        let point = match statement {
            Statement::Begin(_) => {
                c.begins += 1;
                FaultPoint::Begin(c.begins)
            }
            Statement::Insert { .. } | Statement::DeleteAll => {
                c.steps += 1;
                FaultPoint::Step(c.steps)
            }
            Statement::Commit => {
                c.commits += 1;
                FaultPoint::Commit(c.commits)
            }
            Statement::Rollback => return None,
        };
        self.faults
            .iter()
            .find(|f| f.matches(worker, point))
            .map(|f| f.action.clone())
    }
}

/// Wraps executors with a fixed set of faults and a shared transcript.
///
/// Cheap to clone; clones share counters and transcript.
#[derive(Debug, Clone, Default)]
pub struct FaultInjector {
    state: Arc<InjectorState>,
    transcript: Transcript,
}

impl FaultInjector {
    /// An injector that fires `faults`.
    pub fn new(faults: Vec<Fault>) -> Self {
        Self {
            state: Arc::new(InjectorState {
                faults,
                counters: Mutex::new(HashMap::new()),
            }),
            transcript: Transcript::default(),
        }
    }

    /// An injector with no faults that only records the transcript.
    pub fn recording() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Wrap `inner` for `worker`.
    pub fn wrap_executor<E: StatementExecutor>(&self, worker: WorkerId, inner: E) -> Injected<E> {
        Injected {
            worker,
            inner,
            state: Arc::clone(&self.state),
            transcript: self.transcript.clone(),
        }
    }
}

impl ExecutorLayer for FaultInjector {
    fn wrap<'c>(
        &self,
        worker: WorkerId,
        inner: Box<dyn StatementExecutor + 'c>,
    ) -> Box<dyn StatementExecutor + 'c> {
        Box::new(self.wrap_executor(worker, inner))
    }
}

/// An executor wrapped by a [`FaultInjector`].
pub struct Injected<E> {
    worker: WorkerId,
    inner: E,
    state: Arc<InjectorState>,
    transcript: Transcript,
}

impl<E> Injected<E> {
    pub fn into_inner(self) -> E {
        self.inner
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: StatementExecutor> StatementExecutor for Injected<E> {
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError> {
        let (result, injected) = match self.state.next_fault(self.worker, statement) {
            Some(FaultAction::Fail(err)) => (Err(err), true),
            Some(FaultAction::FailAndRollback(err)) => {
                if let Err(e) = self.inner.execute(&Statement::Rollback) {
                    tracing::debug!(error = %e, "injected rollback failed");
                }
                (Err(err), true)
            }
            Some(FaultAction::Delay(duration)) => {
                std::thread::sleep(duration);
                (self.inner.execute(statement), false)
            }
            None => (self.inner.execute(statement), false),
        };

        self.transcript.push(TranscriptEntry {
            worker: self.worker,
            statement: statement.clone(),
            result: result.as_ref().copied().map_err(|e| e.kind),
            injected,
        });
        result
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}
