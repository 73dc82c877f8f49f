// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Statement executor trait: the only capability the sequence runner needs
//! from a store connection.

use crate::error::StatementError;
use crate::types::{Statement, WorkerId};

/// Executes statements against one connection.
///
/// Implementations own (or exclusively borrow) a single connection and never
/// share it between workers. Blocking on a busy lock happens inside
/// `execute`, bounded by the connection's busy timeout.
pub trait StatementExecutor {
    /// Execute one statement and return the number of rows it changed.
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError>;

    /// Whether an explicit transaction is currently open.
    ///
    /// Used after a failed step: some engine errors roll the transaction
    /// back on their own, in which case no `COMMIT` must be issued.
    fn in_transaction(&self) -> bool;
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for &mut E {
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError> {
        (**self).execute(statement)
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }
}

impl<E: StatementExecutor + ?Sized> StatementExecutor for Box<E> {
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError> {
        (**self).execute(statement)
    }

    fn in_transaction(&self) -> bool {
        (**self).in_transaction()
    }
}

/// Wraps the executor each worker builds for its connection.
///
/// The harness calls [`wrap`](ExecutorLayer::wrap) once per transaction
/// attempt on the worker's connection thread. Test utilities use it to
/// inject failures or delays into an otherwise real run.
pub trait ExecutorLayer: Send + Sync {
    fn wrap<'c>(
        &self,
        worker: WorkerId,
        inner: Box<dyn StatementExecutor + 'c>,
    ) -> Box<dyn StatementExecutor + 'c>;
}
