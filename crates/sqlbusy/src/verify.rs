// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sqlbusy verify` command implementation.

use std::path::PathBuf;

use sqlbusy_config::model::SqlbusyConfig;
use sqlbusy_core::SqlbusyError;
use sqlbusy_harness::{verify_records, Verification};
use sqlbusy_storage::queries::records;
use sqlbusy_storage::{ConnectionOptions, SharedStore};
use uuid::Uuid;

/// Highest sequence a writer can reach with this configuration.
fn max_sequence(config: &SqlbusyConfig) -> Option<i64> {
    let workload = &config.workload;
    workload
        .inserts_per_writer
        .checked_mul(u64::from(workload.transactions_per_writer))
        .and_then(|n| i64::try_from(n).ok())
}

/// Read persisted rows and check the sequence invariants. With `run`, only
/// the rows that run wrote are read.
pub async fn verify_store(
    store: &SharedStore,
    config: &SqlbusyConfig,
    run: Option<Uuid>,
) -> Result<Verification, SqlbusyError> {
    let db = store.connect().await?;
    let rows = match run {
        Some(run) => records::list_records_for_run(&db, &run.to_string()).await,
        None => records::list_records(&db).await,
    };
    db.close().await?;
    Ok(verify_records(&rows?, max_sequence(config)))
}

/// Run the `sqlbusy verify` command. Returns `Ok(false)` on violations.
pub async fn run_verify(config: &SqlbusyConfig, json: bool) -> Result<bool, SqlbusyError> {
    let path = PathBuf::from(&config.storage.database_path);
    if !path.exists() {
        return Err(SqlbusyError::Config(format!(
            "database {} does not exist; run `sqlbusy init` or `sqlbusy run` first",
            path.display()
        )));
    }
    let options = ConnectionOptions::for_workers(&config.storage, 1);
    let verification = verify_store(&SharedStore::new(path, options), config, None).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&verification)
            .map_err(|e| SqlbusyError::Internal(format!("failed to serialize result: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", verification.render_text());
    }
    Ok(verification.is_ok())
}
