// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the sqlbusy configuration system.

use sqlbusy_config::diagnostic::ConfigError;
use sqlbusy_config::model::JournalMode;
use sqlbusy_config::{load_and_validate_str, load_config_from_str};
use sqlbusy_core::{BeginMode, StoreErrorKind};

/// A file setting every known key deserializes into the model.
#[test]
fn full_toml_deserializes_into_config() {
    let toml = r#"
[storage]
database_path = "/tmp/stress.db3"
journal_mode = "delete"
foreign_keys = false
busy_timeout_per_worker_ms = 250
min_busy_timeout_ms = 3000
begin_mode = "exclusive"

[workload]
workers = 20
inserts_per_writer = 500
transactions_per_writer = 3
delete_cycles = 8
delete_interval_ms = 250
begin_retries = 2
tolerate = ["constraint", "io"]

[roles]
deleters = 2

[logging]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.storage.database_path, "/tmp/stress.db3");
    assert_eq!(config.storage.journal_mode, JournalMode::Delete);
    assert!(!config.storage.foreign_keys);
    assert_eq!(config.storage.busy_timeout_per_worker_ms, 250);
    assert_eq!(config.storage.min_busy_timeout_ms, 3000);
    assert_eq!(config.storage.begin_mode, BeginMode::Exclusive);
    assert_eq!(config.workload.workers, 20);
    assert_eq!(config.workload.inserts_per_writer, 500);
    assert_eq!(config.workload.transactions_per_writer, 3);
    assert_eq!(config.workload.delete_cycles, 8);
    assert_eq!(config.workload.delete_interval_ms, 250);
    assert_eq!(config.workload.begin_retries, 2);
    assert_eq!(
        config.workload.tolerate,
        vec![StoreErrorKind::Constraint, StoreErrorKind::Io]
    );
    assert_eq!(config.roles.deleters, 2);
    assert_eq!(config.logging.level, "debug");
}

/// An empty file is the classic busy test.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("empty TOML should validate");
    assert_eq!(config.storage.database_path, "busy.db3");
    assert_eq!(config.workload.workers, 10);
    assert_eq!(config.workload.inserts_per_writer, 1000);
    assert_eq!(config.roles.deleters, 1);
}

/// Unknown key produces an UnknownKey diagnostic with a suggestion and span.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[workload]
workrs = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key should be rejected");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "workrs");
            assert_eq!(suggestion.as_deref(), Some("workers"));
            assert!(span.is_some(), "inline source should resolve a span");
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level section is rejected by deny_unknown_fields.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    let err = load_config_from_str(toml).expect_err("unknown section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention the unknown section, got: {err_str}"
    );
}

/// A wrong type surfaces as InvalidType with the dotted key.
#[test]
fn wrong_type_is_reported_with_key() {
    let toml = r#"
[workload]
workers = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("string for u32 should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::InvalidType { key, .. } if key.contains("workers")
    )));
}

/// An unknown enum value surfaces as InvalidValue.
#[test]
fn unknown_begin_mode_is_reported() {
    let toml = r#"
[storage]
begin_mode = "deferred"
"#;
    let errors = load_and_validate_str(toml).expect_err("deferred is not a begin mode");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidValue { .. } | ConfigError::Other(_))),
        "got {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[workload]
workers = 1

[roles]
deleters = 2
"#;
    let errors = load_and_validate_str(toml).expect_err("deleters > workers should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("roles.deleters"))
    ));
}

/// Diagnostics render through miette without panicking.
#[test]
fn diagnostics_render() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[storage]\ndatabse_path = \"x\"\n").unwrap_err();
    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    let diagnostic: &dyn Diagnostic = &errors[0];
    handler.render_report(&mut buf, diagnostic).unwrap();
    assert!(buf.contains("database_path"));
}
