// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writer role: transactions of tagged inserts.

use sqlbusy_core::SqlbusyError;
use tracing::debug;

use crate::plan::WorkloadPlan;
use crate::report::WorkerReport;
use crate::worker::{record_attempt, Work, WorkerHandle};

/// Run `transactions_per_writer` insert transactions back to back.
///
/// The sequence counter carries over between transactions. The writer stops
/// at the first transaction that does not commit.
pub async fn run(
    handle: &mut WorkerHandle,
    plan: &WorkloadPlan,
) -> Result<WorkerReport, SqlbusyError> {
    let mut report = WorkerReport::new(handle.identity(), handle.role());

    for transaction in 1..=plan.transactions_per_writer {
        let attempt = handle
            .attempt_with_retries(plan, Work::Inserts(plan.inserts_per_writer))
            .await?;
        debug!(
            transaction,
            attempted = attempt.attempted,
            persisted = attempt.persisted(),
            "writer transaction closed"
        );
        if let Some(status) = record_attempt(&mut report, &attempt) {
            report.status = status;
            break;
        }
    }

    Ok(report)
}
