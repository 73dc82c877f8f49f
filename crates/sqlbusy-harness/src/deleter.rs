// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deleter role: periodic purges of the whole stress table.

use sqlbusy_core::SqlbusyError;
use tracing::info;

use crate::plan::WorkloadPlan;
use crate::report::WorkerReport;
use crate::worker::{record_attempt, Work, WorkerHandle};

/// Run `delete_cycles` begin/delete-all/commit cycles, sleeping
/// `delete_interval` before each. Stops early if a cycle aborts.
pub async fn run(
    handle: &mut WorkerHandle,
    plan: &WorkloadPlan,
) -> Result<WorkerReport, SqlbusyError> {
    let mut report = WorkerReport::new(handle.identity(), handle.role());

    for cycle in 1..=plan.delete_cycles {
        tokio::time::sleep(plan.delete_interval).await;

        let attempt = handle
            .attempt_with_retries(plan, Work::DeleteAll)
            .await?;
        report.rows_deleted += attempt.rows_persisted();
        if let Some(status) = record_attempt(&mut report, &attempt) {
            report.status = status;
            break;
        }
        info!(cycle, deleted = attempt.rows_persisted(), "delete cycle committed");
    }

    Ok(report)
}
