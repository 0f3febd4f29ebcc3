// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of stopping at the first one.

use std::collections::HashSet;

use argon2::password_hash::PasswordHash;

use crate::diagnostic::ConfigError;
use crate::model::FlaregateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &FlaregateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_server(config, &mut errors);

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let verification = &config.verification;
    for (key, value) in [
        ("verification.code_ttl_secs", verification.code_ttl_secs),
        ("verification.lockout_secs", verification.lockout_secs),
        (
            "verification.session_retention_secs",
            verification.session_retention_secs,
        ),
        ("bot.session_secs", config.bot.session_secs),
        ("identity.timeout_secs", config.identity.timeout_secs),
        ("sweep.interval_secs", config.sweep.interval_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!(
                "{key} must be greater than 0"
            )));
        }
    }
    if verification.max_attempts == 0 {
        errors.push(ConfigError::validation(
            "verification.max_attempts must be at least 1",
        ));
    }
    if config.identity.max_calls_per_minute == 0 {
        errors.push(ConfigError::validation(
            "identity.max_calls_per_minute must be at least 1",
        ));
    }

    validate_bots(config, &mut errors);

    for (key, url) in [
        ("keys.access_link", &config.keys.access_link),
        ("identity.users_base_url", &config.identity.users_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "{key} `{url}` must be an http(s) URL"
            )));
        }
    }

    validate_operators(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(config: &FlaregateConfig, errors: &mut Vec<ConfigError>) {
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "server.log_level `{}` must be one of: {}",
            config.server.log_level,
            LOG_LEVELS.join(", ")
        )));
    }
}

fn validate_bots(config: &FlaregateConfig, errors: &mut Vec<ConfigError>) {
    if config.bot.names.is_empty() {
        errors.push(ConfigError::validation("bot.names must not be empty"));
    }

    let mut seen = HashSet::new();
    for (i, name) in config.bot.names.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "bot.names[{i}] must not be empty"
            )));
        } else if !seen.insert(name.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate bot name `{name}` in bot.names"
            )));
        }
    }

    if !config.bot.names.contains(&config.bot.default_bot) {
        errors.push(ConfigError::validation(format!(
            "bot.default_bot `{}` is not listed in bot.names",
            config.bot.default_bot
        )));
    }
}

fn validate_operators(config: &FlaregateConfig, errors: &mut Vec<ConfigError>) {
    let mut seen = HashSet::new();
    for (i, operator) in config.admin.operators.iter().enumerate() {
        if operator.username.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "admin.operators[{i}].username must not be empty"
            )));
        } else if !seen.insert(operator.username.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate operator `{}` in admin.operators",
                operator.username
            )));
        }

        if PasswordHash::new(&operator.password_hash).is_err() {
            errors.push(ConfigError::validation(format!(
                "admin.operators[{i}].password_hash is not a PHC string \
                 (generate one with `flaregate hash-password`)"
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperatorConfig;

    const SAMPLE_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$YWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXoxMjM0NTY";

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&FlaregateConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FlaregateConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn zero_durations_are_all_reported() {
        let mut config = FlaregateConfig::default();
        config.verification.code_ttl_secs = 0;
        config.bot.session_secs = 0;
        config.verification.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_message(&errors, "code_ttl_secs"));
        assert!(has_message(&errors, "bot.session_secs"));
        assert!(has_message(&errors, "max_attempts"));
    }

    #[test]
    fn default_bot_must_be_listed() {
        let mut config = FlaregateConfig::default();
        config.bot.default_bot = "GhostBot".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "GhostBot"));
    }

    #[test]
    fn duplicate_bot_names_fail_validation() {
        let mut config = FlaregateConfig::default();
        config.bot.names = vec!["FlareBot_V1".into(), "FlareBot_V1".into()];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate bot name"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = FlaregateConfig::default();
        config.server.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }

    #[test]
    fn access_link_must_be_http() {
        let mut config = FlaregateConfig::default();
        config.keys.access_link = "ftp://example.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "keys.access_link"));
    }

    #[test]
    fn plaintext_operator_password_is_rejected() {
        let mut config = FlaregateConfig::default();
        config.admin.operators = vec![OperatorConfig {
            username: "admin".into(),
            password_hash: "hunter2".into(),
        }];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "password_hash is not a PHC string"));
    }

    #[test]
    fn valid_operator_passes() {
        let mut config = FlaregateConfig::default();
        config.admin.operators = vec![OperatorConfig {
            username: "admin".into(),
            password_hash: SAMPLE_HASH.into(),
        }];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn duplicate_operators_fail_validation() {
        let op = OperatorConfig {
            username: "admin".into(),
            password_hash: SAMPLE_HASH.into(),
        };
        let mut config = FlaregateConfig::default();
        config.admin.operators = vec![op.clone(), op];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate operator"));
    }
}
