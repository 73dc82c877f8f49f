// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the sqlbusy stress harness.
//!
//! This crate provides the error types, the statement model, and the
//! [`StatementExecutor`] seam shared by the storage layer, the harness, and
//! the test utilities.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{SqlbusyError, StatementError, StoreErrorKind};
pub use traits::{ExecutorLayer, StatementExecutor};
pub use types::{BeginMode, Role, Statement, StressRecord, WorkerId, STRESS_TABLE};
