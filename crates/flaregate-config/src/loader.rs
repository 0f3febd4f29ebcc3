// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Lowest to highest precedence: compiled defaults, `/etc/flaregate/flaregate.toml`,
//! `$XDG_CONFIG_HOME/flaregate/flaregate.toml`, `./flaregate.toml`, then
//! `FLAREGATE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FlaregateConfig;

const ENV_PREFIX: &str = "FLAREGATE_";

/// Top-level sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "verification",
    "bot",
    "keys",
    "identity",
    "sweep",
];

/// Config files consulted, lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/flaregate/flaregate.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("flaregate").join("flaregate.toml"));
    }
    paths.push(PathBuf::from("flaregate.toml"));
    paths
}

/// Builds the full layered figment without extracting it.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(FlaregateConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<FlaregateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<FlaregateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FlaregateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FlaregateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FlaregateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Maps `FLAREGATE_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first segment is treated as the section, so keys that contain
/// underscores survive: `FLAREGATE_BOT_DEFAULT_BOT` becomes `bot.default_bot`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}
