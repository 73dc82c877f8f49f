// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for sqlbusy integration tests.
//!
//! Provides fault injection and store fixtures for fast, deterministic
//! tests of the contention protocol.
//!
//! # Components
//!
//! - [`FaultInjector`] - Wraps any executor, injects classified errors or delays
//!   at chosen statements, and records a transcript
//! - [`MemoryExecutor`] - In-memory table with transaction semantics
//! - [`TempStore`] - Temp-dir SQLite store with the schema applied

pub mod fault;
pub mod memory;
pub mod store;

pub use fault::{Fault, FaultAction, FaultInjector, FaultPoint, Transcript, TranscriptEntry};
pub use memory::MemoryExecutor;
pub use store::TempStore;
