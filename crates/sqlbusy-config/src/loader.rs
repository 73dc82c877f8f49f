// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./sqlbusy.toml` > `~/.config/sqlbusy/sqlbusy.toml` >
//! `/etc/sqlbusy/sqlbusy.toml`, with `SQLBUSY_*` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SqlbusyConfig;

/// File name searched in each directory of the hierarchy.
pub const CONFIG_FILE_NAME: &str = "sqlbusy.toml";

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/sqlbusy/sqlbusy.toml";

/// Sections that environment variables may target.
const ENV_SECTIONS: [&str; 4] = ["storage", "workload", "roles", "logging"];

/// Per-user configuration path, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sqlbusy").join(CONFIG_FILE_NAME))
}

/// Build the layered Figment without extracting it.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sqlbusy/sqlbusy.toml`
/// 3. `~/.config/sqlbusy/sqlbusy.toml`
/// 4. `./sqlbusy.toml`
/// 5. `SQLBUSY_*` environment variables
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SqlbusyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SqlbusyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SqlbusyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SqlbusyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, with env var overrides.
///
/// Used by `--config`; the file hierarchy is skipped entirely.
pub fn load_config_from_path(path: &Path) -> Result<SqlbusyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SqlbusyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `SQLBUSY_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `SQLBUSY_STORAGE_DATABASE_PATH` maps to `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("SQLBUSY_").map(|key| {
        let key_str = key.as_str();
        for section in ENV_SECTIONS {
            if let Some(rest) = key_str
                .strip_prefix(section)
                .and_then(|r| r.strip_prefix('_'))
            {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}
