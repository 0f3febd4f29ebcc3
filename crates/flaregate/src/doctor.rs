// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flaregate doctor` command implementation.
//!
//! Runs diagnostic checks against the configured environment: config
//! validity, database reachability and schema, identity client setup, and
//! the admin operator list.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use flaregate_config::FlaregateConfig;
use flaregate_core::{FlareError, HealthStatus, PluginAdapter};
use flaregate_identity::RobloxIdentity;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `flaregate doctor` command.
///
/// With `plain`, disables colored output. Fails when any check fails so
/// scripts can gate on the exit code.
pub async fn run_doctor(
    config: &FlaregateConfig,
    config_path: Option<&Path>,
    plain: bool,
) -> Result<(), FlareError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_config(config_path).await,
        check_database(&config.storage.database_path).await,
        check_bots(&config.storage.database_path, &config.bot.names).await,
        check_identity(config).await,
        check_operators(config),
        check_memory_baseline(),
    ];

    println!();
    println!("  flaregate doctor");
    println!("  {}", "-".repeat(50));

    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let fail_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Fail)
        .count();
    let warn_count = results
        .iter()
        .filter(|r| r.status == CheckStatus::Warn)
        .count();

    if fail_count + warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if fail_count > 0 {
        return Err(FlareError::Internal(format!(
            "{fail_count} diagnostic check(s) failed"
        )));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Re-loads configuration from the same source the command used.
async fn check_config(config_path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match config_path {
        Some(path) => flaregate_config::load_and_validate_path(path),
        None => flaregate_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check the database file exists and answers a query.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();

    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };

    let query_result: Result<(), tokio_rusqlite::Error> = conn
        .call(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await;

    match query_result {
        Ok(()) => CheckResult::new("Database", CheckStatus::Pass, "connected", start),
        Err(e) => CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("query failed: {e}"),
            start,
        ),
    }
}

/// Compare configured bot names with the rows seeded in `bot_status`.
async fn check_bots(db_path: &str, configured: &[String]) -> CheckResult {
    let start = Instant::now();

    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Bots",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new("Bots", CheckStatus::Fail, format!("open failed: {e}"), start);
        }
    };

    let seeded: Result<Vec<(String, bool)>, tokio_rusqlite::Error> = conn
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT bot_name, in_use FROM bot_status")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await;

    match seeded {
        Ok(rows) => {
            let missing: Vec<&str> = configured
                .iter()
                .filter(|name| !rows.iter().any(|(seeded, _)| seeded == *name))
                .map(String::as_str)
                .collect();
            let in_use = rows.iter().filter(|(_, in_use)| *in_use).count();
            if missing.is_empty() {
                CheckResult::new(
                    "Bots",
                    CheckStatus::Pass,
                    format!("{} seeded, {in_use} in use", rows.len()),
                    start,
                )
            } else {
                CheckResult::new(
                    "Bots",
                    CheckStatus::Warn,
                    format!("not yet seeded: {} (seeded on next serve)", missing.join(", ")),
                    start,
                )
            }
        }
        Err(e) => CheckResult::new(
            "Bots",
            CheckStatus::Warn,
            format!("schema not initialized: {e}"),
            start,
        ),
    }
}

/// Build the identity client and ask for its health without spending the call budget.
async fn check_identity(config: &FlaregateConfig) -> CheckResult {
    let start = Instant::now();
    let identity = match RobloxIdentity::new(&config.identity) {
        Ok(identity) => identity,
        Err(e) => {
            return CheckResult::new(
                "Identity provider",
                CheckStatus::Fail,
                format!("client setup failed: {e}"),
                start,
            );
        }
    };

    match identity.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Identity provider",
            CheckStatus::Pass,
            format!("client ready ({})", config.identity.users_base_url),
            start,
        ),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Identity provider", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Identity provider", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new(
            "Identity provider",
            CheckStatus::Fail,
            e.to_string(),
            start,
        ),
    }
}

fn check_operators(config: &FlaregateConfig) -> CheckResult {
    let start = Instant::now();
    match config.admin.operators.len() {
        0 => CheckResult::new(
            "Admin operators",
            CheckStatus::Warn,
            "none configured (run `flaregate hash-password`)",
            start,
        ),
        n => CheckResult::new(
            "Admin operators",
            CheckStatus::Pass,
            format!("{n} configured"),
            start,
        ),
    }
}

/// Memory baseline via jemalloc.
fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}

#[cfg(test)]
mod tests {
    use flaregate_core::StorageAdapter;
    use flaregate_storage::SqliteStorage;

    use super::*;

    fn default_config() -> FlaregateConfig {
        flaregate_config::load_and_validate_str("").unwrap()
    }

    #[tokio::test]
    async fn check_database_missing_warns() {
        let result = check_database("/tmp/nonexistent-flaregate-test-xyz.db").await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
    }

    #[tokio::test]
    async fn check_config_fails_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flaregate.toml");
        std::fs::write(&path, "[server]\nprot = 5000\n").unwrap();
        let result = check_config(Some(&path)).await;
        assert_eq!(result.status, CheckStatus::Fail);
    }

    #[tokio::test]
    async fn seeded_database_passes_bot_check() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("doctor.db").to_string_lossy().into_owned();

        let mut config = default_config();
        config.storage.database_path = db_path.clone();
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();

        let names = vec!["FlareBot_V1".to_string()];
        let result = check_bots(&db_path, &names).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("FlareBot_V1"));

        storage.seed_bots(&names, chrono::Utc::now()).await.unwrap();
        storage.close().await.unwrap();

        assert_eq!(check_database(&db_path).await.status, CheckStatus::Pass);
        let result = check_bots(&db_path, &names).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
        assert_eq!(result.message, "1 seeded, 0 in use");
    }

    #[tokio::test]
    async fn identity_client_builds_from_defaults() {
        let result = check_identity(&default_config()).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
    }

    #[test]
    fn missing_operators_warn() {
        let result = check_operators(&default_config());
        assert_eq!(result.status, CheckStatus::Warn);
    }

    #[test]
    fn plain_lines_carry_status_tags() {
        let result = CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Fail,
            message: "open failed".to_string(),
            duration: Duration::from_millis(3),
        };
        let line = format_line(&result, false);
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("open failed (3ms)"));
    }
}
