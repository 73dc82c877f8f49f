// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory executor with begin/commit/rollback semantics.
//!
//! Lets sequence-runner tests check what would be persisted without a
//! database file. Rows are `(thread, sequence)` pairs.

use sqlbusy_core::{Statement, StatementError, StatementExecutor, StoreErrorKind};

const SQLITE_ERROR: i32 = 1;

/// A single-connection, in-memory stand-in for the stress table.
#[derive(Debug, Default, Clone)]
pub struct MemoryExecutor {
    committed: Vec<(u32, u64)>,
    working: Option<Vec<(u32, u64)>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `rows` already committed.
    pub fn with_rows(rows: impl IntoIterator<Item = (u32, u64)>) -> Self {
        Self {
            committed: rows.into_iter().collect(),
            working: None,
        }
    }

    /// Committed rows, in insertion order.
    pub fn rows(&self) -> &[(u32, u64)] {
        &self.committed
    }

    /// Committed sequences for one thread, in insertion order.
    pub fn sequences_for(&self, thread: u32) -> Vec<u64> {
        self.committed
            .iter()
            .filter(|(t, _)| *t == thread)
            .map(|(_, s)| *s)
            .collect()
    }

    fn table(&mut self) -> &mut Vec<(u32, u64)> {
        match self.working.as_mut() {
            Some(working) => working,
            None => &mut self.committed,
        }
    }

    fn misuse(message: &str) -> StatementError {
        StatementError::new(StoreErrorKind::Other, message).with_code(SQLITE_ERROR)
    }
}

impl StatementExecutor for MemoryExecutor {
    fn execute(&mut self, statement: &Statement) -> Result<usize, StatementError> {
        match statement {
            Statement::Begin(_) => {
                if self.working.is_some() {
                    return Err(Self::misuse(
                        "cannot start a transaction within a transaction",
                    ));
                }
                self.working = Some(self.committed.clone());
                Ok(0)
            }
            Statement::Insert { thread, sequence } => {
                self.table().push((thread.0, *sequence));
                Ok(1)
            }
            Statement::DeleteAll => {
                let table = self.table();
                let removed = table.len();
                table.clear();
                Ok(removed)
            }
            Statement::Commit => match self.working.take() {
                Some(working) => {
                    self.committed = working;
                    Ok(0)
                }
                None => Err(Self::misuse("cannot commit - no transaction is active")),
            },
            Statement::Rollback => match self.working.take() {
                Some(_) => Ok(0),
                None => Err(Self::misuse("cannot rollback - no transaction is active")),
            },
        }
    }

    fn in_transaction(&self) -> bool {
        self.working.is_some()
    }
}

#[cfg(test)]
mod tests {
    use sqlbusy_core::{BeginMode, WorkerId};

    use super::*;

    #[test]
    fn uncommitted_rows_are_invisible_until_commit() {
        let mut exec = MemoryExecutor::new();
        exec.execute(&Statement::Begin(BeginMode::Immediate)).unwrap();
        exec.execute(&Statement::Insert {
            thread: WorkerId(2),
            sequence: 1,
        })
        .unwrap();
        assert!(exec.rows().is_empty());
        exec.execute(&Statement::Commit).unwrap();
        assert_eq!(exec.rows(), &[(2, 1)]);
    }

    #[test]
    fn delete_all_counts_rows_and_is_idempotent() {
        let mut exec = MemoryExecutor::with_rows([(2, 1), (3, 1)]);
        assert_eq!(exec.execute(&Statement::DeleteAll).unwrap(), 2);
        assert_eq!(exec.execute(&Statement::DeleteAll).unwrap(), 0);
    }

    #[test]
    fn nested_begin_and_stray_commit_fail() {
        let mut exec = MemoryExecutor::new();
        assert!(exec.execute(&Statement::Commit).is_err());
        exec.execute(&Statement::Begin(BeginMode::Exclusive)).unwrap();
        assert!(exec.execute(&Statement::Begin(BeginMode::Exclusive)).is_err());
        exec.execute(&Statement::Rollback).unwrap();
        assert!(!exec.in_transaction());
    }
}
