// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express: non-zero counts,
//! role counts within the worker count, and which statement error kinds may
//! be tolerated by the sequence runner.

use sqlbusy_core::StoreErrorKind;

use crate::diagnostic::ConfigError;
use crate::model::SqlbusyConfig;

/// Error kinds a sequence may skip over. Tolerating contention or a closed
/// store would hide exactly the behavior the harness exists to surface.
pub const TOLERABLE_KINDS: [StoreErrorKind; 2] = [StoreErrorKind::Constraint, StoreErrorKind::Io];

/// Largest busy timeout SQLite accepts, in milliseconds.
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &SqlbusyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let storage = &config.storage;
    let workload = &config.workload;
    if storage.min_busy_timeout_ms == 0 {
        fail("storage.min_busy_timeout_ms must be at least 1".to_string());
    }
    if storage.min_busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
        fail(format!(
            "storage.min_busy_timeout_ms must not exceed {MAX_BUSY_TIMEOUT_MS}"
        ));
    }
    let scaled = storage
        .busy_timeout_per_worker_ms
        .checked_mul(u64::from(workload.workers));
    if scaled.is_none_or(|ms| ms > MAX_BUSY_TIMEOUT_MS) {
        fail(format!(
            "storage.busy_timeout_per_worker_ms ({}) times workload.workers ({}) must not exceed {MAX_BUSY_TIMEOUT_MS} ms",
            storage.busy_timeout_per_worker_ms, workload.workers
        ));
    }

    if workload.workers == 0 {
        fail("workload.workers must be at least 1".to_string());
    }
    if workload.inserts_per_writer == 0 {
        fail("workload.inserts_per_writer must be at least 1".to_string());
    }
    if workload.transactions_per_writer == 0 {
        fail("workload.transactions_per_writer must be at least 1".to_string());
    }

    for kind in &workload.tolerate {
        if !TOLERABLE_KINDS.contains(kind) {
            fail(format!(
                "workload.tolerate may only contain `constraint` or `io`, got `{kind}`"
            ));
        }
    }

    if config.roles.deleters > workload.workers {
        fail(format!(
            "roles.deleters ({}) must not exceed workload.workers ({})",
            config.roles.deleters, workload.workers
        ));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SqlbusyConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SqlbusyConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn zero_workers_and_inserts_are_both_reported() {
        let mut config = SqlbusyConfig::default();
        config.workload.workers = 0;
        config.workload.inserts_per_writer = 0;
        config.roles.deleters = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "workload.workers"));
        assert!(has_message(&errors, "inserts_per_writer"));
    }

    #[test]
    fn more_deleters_than_workers_fails() {
        let mut config = SqlbusyConfig::default();
        config.workload.workers = 2;
        config.roles.deleters = 3;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "roles.deleters"));
    }

    #[test]
    fn all_deleters_is_allowed() {
        let mut config = SqlbusyConfig::default();
        config.workload.workers = 2;
        config.roles.deleters = 2;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn tolerating_contention_is_rejected() {
        let mut config = SqlbusyConfig::default();
        config.workload.tolerate = vec![StoreErrorKind::Constraint, StoreErrorKind::Contention];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "`contention`"));
    }

    #[test]
    fn tolerating_io_is_allowed() {
        let mut config = SqlbusyConfig::default();
        config.workload.tolerate = vec![StoreErrorKind::Constraint, StoreErrorKind::Io];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn busy_timeout_floor_beyond_sqlite_range_fails() {
        let mut config = SqlbusyConfig::default();
        config.storage.min_busy_timeout_ms = 3_000_000_000;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(has_message(&errors, "storage.min_busy_timeout_ms"));
    }

    #[test]
    fn scaled_busy_timeout_beyond_sqlite_range_fails() {
        let mut config = SqlbusyConfig::default();
        config.workload.workers = 11_000_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "busy_timeout_per_worker_ms"));

        config.workload.workers = 10_000_000;
        assert!(validate_config(&config).is_ok());

        config.storage.busy_timeout_per_worker_ms = u64::MAX;
        assert!(has_message(
            &validate_config(&config).unwrap_err(),
            "busy_timeout_per_worker_ms"
        ));
    }

    #[test]
    fn unknown_log_level_fails() {
        let mut config = SqlbusyConfig::default();
        config.logging.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "logging.level"));
    }
}
