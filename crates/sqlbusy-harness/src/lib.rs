// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrency stress harness for SQLite.
//!
//! Writers and deleters each open their own connection to one shared store
//! and contend for its write lock. The [`Coordinator`] spawns one task per
//! identity, joins them all, and aggregates a [`RunReport`].
//!
//! All serialization between workers is SQLite's own: the harness holds no
//! lock around the store.

pub mod coordinator;
pub mod deleter;
pub mod plan;
pub mod report;
pub mod roles;
pub mod sequence;
pub mod verify;
pub mod worker;
pub mod writer;

pub use coordinator::Coordinator;
pub use plan::WorkloadPlan;
pub use report::{RunReport, RunSummary, WorkerReport, WorkerStatus};
pub use roles::RoleAssignment;
pub use sequence::{run_sequence, AttemptOutcome, AttemptReport, Boundary, SequencePolicy};
pub use verify::{verify_records, Verification, Violation};
pub use worker::{run_worker, Work, WorkerHandle};
