// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Flaregate.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Flaregate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlaregateConfig {
    /// HTTP listener and logging.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Verification code lifetime and attempt limits.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Bots that can be time-sliced between users.
    #[serde(default)]
    pub bot: BotConfig,

    /// Access key issuance.
    #[serde(default)]
    pub keys: KeysConfig,

    /// External identity provider client.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Operator allowlist.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Background expiry sweep.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("flaregate").join("flaregate.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("flaregate.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Verification gate limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationConfig {
    /// Lifetime of a verification session in seconds.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,

    /// Failed checks allowed before the lockout starts.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Lockout length in seconds.
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,

    /// Unverified sessions with no follow-up older than this are purged by the sweeper.
    #[serde(default = "default_session_retention_secs")]
    pub session_retention_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl_secs(),
            max_attempts: default_max_attempts(),
            lockout_secs: default_lockout_secs(),
            session_retention_secs: default_session_retention_secs(),
        }
    }
}

fn default_code_ttl_secs() -> u64 {
    600
}

fn default_max_attempts() -> u32 {
    5
}

fn default_lockout_secs() -> u64 {
    1800
}

fn default_session_retention_secs() -> u64 {
    86_400
}

/// Bot exclusivity settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Every bot name seeded into storage at startup.
    #[serde(default = "default_bot_names")]
    pub names: Vec<String>,

    /// Bot that key submissions are issued against.
    #[serde(default = "default_bot")]
    pub default_bot: String,

    /// Length of one usage window in seconds.
    #[serde(default = "default_session_secs")]
    pub session_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            names: default_bot_names(),
            default_bot: default_bot(),
            session_secs: default_session_secs(),
        }
    }
}

fn default_bot_names() -> Vec<String> {
    vec![default_bot()]
}

fn default_bot() -> String {
    "FlareBot_V1".to_string()
}

fn default_session_secs() -> u64 {
    600
}

/// Access key issuance settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeysConfig {
    /// Link attached to every newly issued key until an operator provides another.
    #[serde(default = "default_access_link")]
    pub access_link: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            access_link: default_access_link(),
        }
    }
}

fn default_access_link() -> String {
    "https://getnative.cc/linkvertise".to_string()
}

/// Identity provider client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    /// Base URL of the users API.
    #[serde(default = "default_users_base_url")]
    pub users_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long an existence answer is reused.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Outbound call budget per rolling minute.
    #[serde(default = "default_max_calls_per_minute")]
    pub max_calls_per_minute: u32,

    /// User-Agent header sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            users_base_url: default_users_base_url(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_calls_per_minute: default_max_calls_per_minute(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_users_base_url() -> String {
    "https://users.roblox.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_max_calls_per_minute() -> u32 {
    10
}

fn default_user_agent() -> String {
    "FlareBot/1.0".to_string()
}

/// Operator allowlist.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Operators allowed to log in to the admin surface. Empty disables admin login.
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
}

/// A single operator credential.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    pub username: String,
    /// Argon2 PHC string, e.g. from `flaregate hash-password`.
    pub password_hash: String,
}

impl std::fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("username", &self.username)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

/// Expiry sweeper settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    30
}
