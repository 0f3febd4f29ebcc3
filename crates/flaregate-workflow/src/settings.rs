// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Workflow timings and names resolved from configuration.

use chrono::Duration;
use flaregate_config::FlaregateConfig;

/// Upper bound for any configured window, so timestamp arithmetic cannot overflow.
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Lifetime of a verification session.
    pub code_ttl: Duration,
    pub max_attempts: u32,
    pub lockout: Duration,
    /// Age after which unreferenced, unverified sessions are purged.
    pub session_retention: Duration,
    /// Length of a granted bot session.
    pub bot_session: Duration,
    /// Bot assigned to newly issued keys.
    pub default_bot: String,
    /// Access link attached to newly issued keys.
    pub access_link: String,
}

impl WorkflowSettings {
    pub fn from_config(config: &FlaregateConfig) -> Self {
        Self {
            code_ttl: secs(config.verification.code_ttl_secs),
            max_attempts: config.verification.max_attempts,
            lockout: secs(config.verification.lockout_secs),
            session_retention: secs(config.verification.session_retention_secs),
            bot_session: secs(config.bot.session_secs),
            default_bot: config.bot.default_bot.clone(),
            access_link: config.keys.access_link.clone(),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&FlaregateConfig::default())
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_WINDOW_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_windows() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.code_ttl, Duration::minutes(10));
        assert_eq!(settings.lockout, Duration::minutes(30));
        assert_eq!(settings.bot_session, Duration::minutes(10));
        assert_eq!(settings.max_attempts, 5);
        assert_eq!(settings.default_bot, "FlareBot_V1");
    }

    #[test]
    fn huge_windows_are_capped() {
        assert_eq!(secs(u64::MAX), Duration::seconds(MAX_WINDOW_SECS as i64));
    }
}
