// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sqlbusy run` and `sqlbusy init` command implementations.

use std::path::PathBuf;

use sqlbusy_config::model::SqlbusyConfig;
use sqlbusy_core::SqlbusyError;
use sqlbusy_harness::Coordinator;
use sqlbusy_storage::{ConnectionOptions, SharedStore};
use tracing::info;

/// Open the configured store, switch it to the configured journal mode, and
/// apply migrations.
pub async fn prepare_store(config: &SqlbusyConfig) -> Result<SharedStore, SqlbusyError> {
    let options = ConnectionOptions::for_workers(&config.storage, config.workload.workers);
    SharedStore::prepare(PathBuf::from(&config.storage.database_path), options).await
}

/// Run the `sqlbusy init` command.
pub async fn init_store(config: &SqlbusyConfig) -> Result<(), SqlbusyError> {
    let store = prepare_store(config).await?;
    println!("store prepared at {}", store.path().display());
    Ok(())
}

/// Run the `sqlbusy run` command.
///
/// Returns `Ok(true)` once the run completes, whatever the individual
/// workers' outcomes. Returns `Ok(false)` only when `verify` was requested
/// and found violations.
pub async fn run_stress(
    config: &SqlbusyConfig,
    json: bool,
    verify: bool,
) -> Result<bool, SqlbusyError> {
    let store = prepare_store(config).await?;
    info!(
        path = %store.path().display(),
        workers = config.workload.workers,
        inserts_per_writer = config.workload.inserts_per_writer,
        "starting run"
    );

    let report = Coordinator::from_config(store.clone(), config).run().await;

    if json {
        let rendered = report
            .to_json()
            .map_err(|e| SqlbusyError::Internal(format!("failed to serialize report: {e}")))?;
        println!("{rendered}");
    } else {
        print!("{}", report.render_text());
    }

    if !verify {
        return Ok(true);
    }
    let verification = crate::verify::verify_store(&store, config, Some(report.run_id)).await?;
    if !json {
        print!("{}", verification.render_text());
    }
    Ok(verification.is_ok())
}
