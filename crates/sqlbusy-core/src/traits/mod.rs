// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the harness and the storage engine.

pub mod executor;

pub use executor::{ExecutorLayer, StatementExecutor};
