// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordinator: spawn one task per identity, join all, aggregate.
//!
//! Workers never see each other. The coordinator does not cancel siblings
//! when one worker aborts and imposes no timeout beyond the store's busy
//! timeout; it only observes each worker's final report.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use sqlbusy_config::SqlbusyConfig;
use sqlbusy_core::{Role, WorkerId};
use sqlbusy_storage::SharedStore;
use tokio::task::JoinError;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::plan::WorkloadPlan;
use crate::report::{RunReport, WorkerReport, WorkerStatus};
use crate::roles::RoleAssignment;
use crate::worker::run_worker;

/// Runs one stress test against a prepared store.
#[derive(Debug, Clone)]
pub struct Coordinator {
    store: SharedStore,
    plan: Arc<WorkloadPlan>,
    roles: RoleAssignment,
    workers: u32,
}

impl Coordinator {
    pub fn new(store: SharedStore, plan: WorkloadPlan, roles: RoleAssignment, workers: u32) -> Self {
        Self {
            store,
            plan: Arc::new(plan),
            roles,
            workers,
        }
    }

    /// Build a coordinator from validated configuration.
    pub fn from_config(store: SharedStore, config: &SqlbusyConfig) -> Self {
        Self::new(
            store,
            WorkloadPlan::from_config(config),
            RoleAssignment::from_config(&config.roles),
            config.workload.workers,
        )
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    /// Spawn every worker, wait for all of them, and report.
    pub async fn run(&self) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, workers = self.workers);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> RunReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let busy_timeout_ms = self.store.options().busy_timeout.as_millis() as u64;
        info!(busy_timeout_ms, "starting workers");

        let handles: Vec<_> = self
            .roles
            .assign(self.workers)
            .map(|(identity, role)| {
                let store = self.store.clone();
                let plan = Arc::clone(&self.plan);
                let span = info_span!("worker", worker = %identity, %role);
                let handle = tokio::spawn(
                    async move { run_worker(identity, role, run_id, store, &plan).await }.instrument(span),
                );
                (identity, role, handle)
            })
            .collect();

        let (meta, handles): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(identity, role, handle)| ((identity, role), handle))
            .unzip();
        let results = join_all(handles).await;

        let mut workers: Vec<WorkerReport> = meta
            .into_iter()
            .zip(results)
            .map(|((identity, role), result)| {
                result.unwrap_or_else(|e| joined_with_error(identity, role, e))
            })
            .collect();
        workers.sort_by_key(|w| w.identity);

        let report = RunReport {
            run_id,
            started_at,
            elapsed_ms: started.elapsed().as_millis() as u64,
            busy_timeout_ms,
            workers,
        };
        let summary = report.summary();
        info!(
            finished = summary.finished,
            aborted = summary.aborted,
            connection_failures = summary.connection_failures,
            elapsed_ms = report.elapsed_ms,
            "run complete"
        );
        report
    }
}

fn joined_with_error(identity: WorkerId, role: Role, err: JoinError) -> WorkerReport {
    let message = if err.is_panic() {
        let payload = err.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string())
    } else {
        "worker task cancelled".to_string()
    };
    tracing::error!(worker = %identity, %message, "worker panicked");
    WorkerReport::with_status(identity, role, WorkerStatus::Panicked { message })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn explode() {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicked_task_is_reported_not_propagated() {
        let handle = tokio::spawn(explode());
        let err = handle.await.unwrap_err();
        let report = joined_with_error(WorkerId(4), Role::Writer, err);
        assert_eq!(
            report.status,
            WorkerStatus::Panicked {
                message: "boom".to_string()
            }
        );
    }
}
