// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `flaregate-core`.
//!
//! Timestamps are stored as fixed-width RFC 3339 text (millisecond
//! precision, `Z` suffix) so that SQL string comparison matches
//! chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub use flaregate_core::types::{
    AdminSession, BotConfiguration, BotStatus, ExternalAccount, KeyStatus, KeySubmission,
    VerificationSession,
};

/// Formats a timestamp for storage.
pub fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn opt_ts(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(ts)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

pub(crate) fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

pub(crate) const ACCOUNT_COLUMNS: &str = "id, name, password_hash, permanent_code, created_at";

pub(crate) fn account_from_row(row: &Row<'_>) -> rusqlite::Result<ExternalAccount> {
    let password_hash: Option<String> = row.get(2)?;
    Ok(ExternalAccount {
        id: row.get(0)?,
        name: row.get(1)?,
        password_set: password_hash.is_some(),
        password_hash,
        permanent_code: row.get(3)?,
        created_at: get_ts(row, 4)?,
    })
}

pub(crate) const SESSION_COLUMNS: &str =
    "id, account_name, code, verified, attempts, locked_until, expires_at, created_at";

pub(crate) fn session_from_row(row: &Row<'_>) -> rusqlite::Result<VerificationSession> {
    Ok(VerificationSession {
        id: row.get(0)?,
        external_account_name: row.get(1)?,
        code: row.get(2)?,
        verified: row.get(3)?,
        attempts: row.get(4)?,
        locked_until: get_opt_ts(row, 5)?,
        expires_at: get_ts(row, 6)?,
        created_at: get_ts(row, 7)?,
    })
}

pub(crate) const CONFIG_COLUMNS: &str =
    "id, session_id, game, mode, additional_settings, completed, created_at";

pub(crate) fn config_from_row(row: &Row<'_>) -> rusqlite::Result<BotConfiguration> {
    Ok(BotConfiguration {
        id: row.get(0)?,
        session_id: row.get(1)?,
        game: row.get(2)?,
        mode: row.get(3)?,
        additional_settings: row.get(4)?,
        completed: row.get(5)?,
        created_at: get_ts(row, 6)?,
    })
}

pub(crate) const KEY_COLUMNS: &str = "id, session_id, bot_name, access_key, access_link, \
     submitted_key, status, admin_approval_time, game_access_time, next_intent_time, \
     created_at, updated_at";

pub(crate) fn key_from_row(row: &Row<'_>) -> rusqlite::Result<KeySubmission> {
    let status: String = row.get(6)?;
    let status = KeyStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;
    Ok(KeySubmission {
        id: row.get(0)?,
        session_id: row.get(1)?,
        bot_name: row.get(2)?,
        access_key: row.get(3)?,
        access_link: row.get(4)?,
        submitted_key: row.get(5)?,
        status,
        admin_approval_time: get_opt_ts(row, 7)?,
        game_access_time: get_opt_ts(row, 8)?,
        next_intent_time: get_opt_ts(row, 9)?,
        created_at: get_ts(row, 10)?,
        updated_at: get_ts(row, 11)?,
    })
}

pub(crate) const BOT_COLUMNS: &str =
    "bot_name, in_use, holder, session_start, session_end, updated_at";

pub(crate) fn bot_from_row(row: &Row<'_>) -> rusqlite::Result<BotStatus> {
    Ok(BotStatus {
        bot_name: row.get(0)?,
        in_use: row.get(1)?,
        current_user: row.get(2)?,
        session_start: get_opt_ts(row, 3)?,
        session_end: get_opt_ts(row, 4)?,
        updated_at: get_ts(row, 5)?,
    })
}

pub(crate) const ADMIN_COLUMNS: &str = "id, username, active, created_at";

pub(crate) fn admin_from_row(row: &Row<'_>) -> rusqlite::Result<AdminSession> {
    Ok(AdminSession {
        id: row.get(0)?,
        username: row.get(1)?,
        active: row.get(2)?,
        created_at: get_ts(row, 3)?,
    })
}
