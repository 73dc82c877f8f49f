// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the stress table.
//!
//! The canonical type lives in `sqlbusy-core` so the harness can verify rows
//! without depending on rusqlite; this module re-exports it.

pub use sqlbusy_core::types::{StressRecord, STRESS_TABLE};
