// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workload plan shared read-only by every worker of a run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sqlbusy_config::SqlbusyConfig;
use sqlbusy_core::ExecutorLayer;

use crate::sequence::SequencePolicy;

/// What each worker does, derived from `[workload]` and `[storage]`.
#[derive(Clone)]
pub struct WorkloadPlan {
    pub policy: SequencePolicy,
    pub inserts_per_writer: u64,
    pub transactions_per_writer: u32,
    pub delete_cycles: u32,
    /// Pause before each delete cycle.
    pub delete_interval: Duration,
    /// Extra `BEGIN` attempts after a contention failure.
    pub begin_retries: u32,
    /// Optional wrapper around every worker's executor.
    pub layer: Option<Arc<dyn ExecutorLayer>>,
}

impl Default for WorkloadPlan {
    fn default() -> Self {
        Self {
            policy: SequencePolicy::default(),
            inserts_per_writer: 1000,
            transactions_per_writer: 1,
            delete_cycles: 5,
            delete_interval: Duration::from_secs(1),
            begin_retries: 0,
            layer: None,
        }
    }
}

impl WorkloadPlan {
    pub fn from_config(config: &SqlbusyConfig) -> Self {
        let workload = &config.workload;
        Self {
            policy: SequencePolicy {
                begin_mode: config.storage.begin_mode,
                tolerate: workload.tolerate.clone(),
            },
            inserts_per_writer: workload.inserts_per_writer,
            transactions_per_writer: workload.transactions_per_writer,
            delete_cycles: workload.delete_cycles,
            delete_interval: Duration::from_millis(workload.delete_interval_ms),
            begin_retries: workload.begin_retries,
            layer: None,
        }
    }

    /// Wrap every worker executor with `layer`.
    pub fn with_layer(mut self, layer: Arc<dyn ExecutorLayer>) -> Self {
        self.layer = Some(layer);
        self
    }
}

impl fmt::Debug for WorkloadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadPlan")
            .field("policy", &self.policy)
            .field("inserts_per_writer", &self.inserts_per_writer)
            .field("transactions_per_writer", &self.transactions_per_writer)
            .field("delete_cycles", &self.delete_cycles)
            .field("delete_interval", &self.delete_interval)
            .field("begin_retries", &self.begin_retries)
            .field("layer", &self.layer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sqlbusy_core::{BeginMode, StoreErrorKind};

    use super::*;

    #[test]
    fn plan_follows_config() {
        let mut config = SqlbusyConfig::default();
        config.storage.begin_mode = BeginMode::Exclusive;
        config.workload.inserts_per_writer = 50;
        config.workload.delete_interval_ms = 10;
        config.workload.tolerate = vec![StoreErrorKind::Constraint, StoreErrorKind::Io];

        let plan = WorkloadPlan::from_config(&config);
        assert_eq!(plan.policy.begin_mode, BeginMode::Exclusive);
        assert_eq!(plan.inserts_per_writer, 50);
        assert_eq!(plan.delete_interval, Duration::from_millis(10));
        assert_eq!(plan.policy.tolerate.len(), 2);
        assert!(plan.layer.is_none());
    }

    #[test]
    fn default_plan_matches_default_config() {
        let plan = WorkloadPlan::from_config(&SqlbusyConfig::default());
        let default = WorkloadPlan::default();
        assert_eq!(plan.policy, default.policy);
        assert_eq!(plan.inserts_per_writer, default.inserts_per_writer);
        assert_eq!(plan.delete_cycles, default.delete_cycles);
        assert_eq!(plan.delete_interval, default.delete_interval);
    }
}
