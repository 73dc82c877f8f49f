// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the sqlbusy stress harness.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently running the default workload.

use serde::{Deserialize, Serialize};
use sqlbusy_core::{BeginMode, StoreErrorKind};

/// Top-level sqlbusy configuration.
///
/// Every section is optional; an empty file reproduces the classic
/// 10-worker / 1000-insert busy test against `busy.db3`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SqlbusyConfig {
    /// Store location and connection settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Workload shape: worker count, inserts, delete cadence.
    #[serde(default)]
    pub workload: WorkloadConfig,

    /// Role assignment policy.
    #[serde(default)]
    pub roles: RolesConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `journal_mode` pragma value applied to every worker connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Write-ahead log.
    #[default]
    Wal,
    /// Rollback journal, deleted after each transaction.
    Delete,
}

impl JournalMode {
    /// Returns the SQLite pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the shared SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Journal mode for every connection.
    #[serde(default)]
    pub journal_mode: JournalMode,

    /// Enforce foreign keys on every connection.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,

    /// Busy timeout contributed by each worker, in milliseconds.
    #[serde(default = "default_busy_timeout_per_worker_ms")]
    pub busy_timeout_per_worker_ms: u64,

    /// Floor for the busy timeout regardless of worker count, in milliseconds.
    #[serde(default = "default_min_busy_timeout_ms")]
    pub min_busy_timeout_ms: u64,

    /// How transactions take the write lock.
    #[serde(default)]
    pub begin_mode: BeginMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            journal_mode: JournalMode::default(),
            foreign_keys: default_foreign_keys(),
            busy_timeout_per_worker_ms: default_busy_timeout_per_worker_ms(),
            min_busy_timeout_ms: default_min_busy_timeout_ms(),
            begin_mode: BeginMode::default(),
        }
    }
}

fn default_database_path() -> String {
    "busy.db3".to_string()
}

fn default_foreign_keys() -> bool {
    true
}

fn default_busy_timeout_per_worker_ms() -> u64 {
    200
}

fn default_min_busy_timeout_ms() -> u64 {
    2000
}

/// Workload configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Total number of workers, deleters included.
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Inserts per writer transaction.
    #[serde(default = "default_inserts_per_writer")]
    pub inserts_per_writer: u64,

    /// Transactions each writer runs back to back.
    #[serde(default = "default_transactions_per_writer")]
    pub transactions_per_writer: u32,

    /// Delete cycles each deleter runs.
    #[serde(default = "default_delete_cycles")]
    pub delete_cycles: u32,

    /// Pause before each delete cycle, in milliseconds.
    #[serde(default = "default_delete_interval_ms")]
    pub delete_interval_ms: u64,

    /// Extra attempts when `BEGIN` itself times out on the lock.
    #[serde(default)]
    pub begin_retries: u32,

    /// Statement error kinds that are logged and skipped instead of aborting.
    #[serde(default = "default_tolerate")]
    pub tolerate: Vec<StoreErrorKind>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            inserts_per_writer: default_inserts_per_writer(),
            transactions_per_writer: default_transactions_per_writer(),
            delete_cycles: default_delete_cycles(),
            delete_interval_ms: default_delete_interval_ms(),
            begin_retries: 0,
            tolerate: default_tolerate(),
        }
    }
}

fn default_workers() -> u32 {
    10
}

fn default_inserts_per_writer() -> u64 {
    1000
}

fn default_transactions_per_writer() -> u32 {
    1
}

fn default_delete_cycles() -> u32 {
    5
}

fn default_delete_interval_ms() -> u64 {
    1000
}

fn default_tolerate() -> Vec<StoreErrorKind> {
    vec![StoreErrorKind::Constraint]
}

/// Role assignment configuration.
///
/// Identities `1..=deleters` run the deleter role, the rest are writers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RolesConfig {
    /// Number of deleter workers.
    #[serde(default = "default_deleters")]
    pub deleters: u32,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            deleters: default_deleters(),
        }
    }
}

fn default_deleters() -> u32 {
    1
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_busy_test() {
        let config = SqlbusyConfig::default();
        assert_eq!(config.storage.database_path, "busy.db3");
        assert_eq!(config.storage.journal_mode, JournalMode::Wal);
        assert!(config.storage.foreign_keys);
        assert_eq!(config.storage.busy_timeout_per_worker_ms, 200);
        assert_eq!(config.storage.min_busy_timeout_ms, 2000);
        assert_eq!(config.storage.begin_mode, BeginMode::Immediate);
        assert_eq!(config.workload.workers, 10);
        assert_eq!(config.workload.inserts_per_writer, 1000);
        assert_eq!(config.workload.transactions_per_writer, 1);
        assert_eq!(config.workload.delete_cycles, 5);
        assert_eq!(config.workload.delete_interval_ms, 1000);
        assert_eq!(config.workload.begin_retries, 0);
        assert_eq!(config.workload.tolerate, vec![StoreErrorKind::Constraint]);
        assert_eq!(config.roles.deleters, 1);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn journal_mode_pragma_values() {
        assert_eq!(JournalMode::Wal.pragma_value(), "wal");
        assert_eq!(JournalMode::Delete.pragma_value(), "delete");
    }

    #[test]
    fn tolerate_list_deserializes_snake_case() {
        let toml_str = r#"
[workload]
tolerate = ["constraint", "io"]
"#;
        let config: SqlbusyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.workload.tolerate,
            vec![StoreErrorKind::Constraint, StoreErrorKind::Io]
        );
    }

    #[test]
    fn begin_mode_deserializes() {
        let toml_str = r#"
[storage]
begin_mode = "exclusive"
"#;
        let config: SqlbusyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.begin_mode, BeginMode::Exclusive);
    }
}
