// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot status rows: the mutual-exclusion lock.
//!
//! Acquire is a single conditional `UPDATE`. Because every statement runs on
//! the one connection thread, exactly one of several racing callers can see
//! an affected row.

use chrono::{DateTime, Utc};
use flaregate_core::FlareError;
use flaregate_core::types::AcquireOutcome;
use rusqlite::params;

use crate::database::Database;
use crate::models::{BOT_COLUMNS, BotStatus, bot_from_row, ts};
use crate::queries::optional;

fn select_by_name(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<BotStatus> {
    conn.query_row(
        &format!("SELECT {BOT_COLUMNS} FROM bot_status WHERE bot_name = ?1"),
        params![name],
        bot_from_row,
    )
}

/// Inserts a free row for each name not yet present.
pub async fn seed(db: &Database, names: &[String], now: DateTime<Utc>) -> Result<(), FlareError> {
    let names = names.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO bot_status (bot_name, in_use, updated_at)
                     VALUES (?1, 0, ?2)",
                )?;
                let now = ts(now);
                for name in &names {
                    stmt.execute(params![name, now])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_status(db: &Database, name: &str) -> Result<Option<BotStatus>, FlareError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| optional(select_by_name(conn, &name)))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_statuses(db: &Database) -> Result<Vec<BotStatus>, FlareError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOT_COLUMNS} FROM bot_status ORDER BY bot_name"
            ))?;
            let rows = stmt
                .query_map([], bot_from_row)?
                .collect::<Result<Vec<_>, _>>();
            rows
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claims the bot for `user` until `until` when it is free or its last session ended by `now`.
pub async fn try_acquire(
    db: &Database,
    name: &str,
    user: &str,
    now: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<AcquireOutcome, FlareError> {
    let name = name.to_string();
    let user = user.to_string();
    db.connection()
        .call(move |conn| {
            let now = ts(now);
            let changed = conn.execute(
                "UPDATE bot_status
                 SET in_use = 1, holder = ?2, session_start = ?3, session_end = ?4, updated_at = ?3
                 WHERE bot_name = ?1
                   AND (in_use = 0 OR (session_end IS NOT NULL AND session_end <= ?3))",
                params![name, user, now, ts(until)],
            )?;
            let current = optional(select_by_name(conn, &name))?;
            Ok(match (changed, current) {
                (_, None) => AcquireOutcome::UnknownBot,
                (1, Some(status)) => AcquireOutcome::Acquired(status),
                (_, Some(status)) => AcquireOutcome::Busy(status),
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clears the holder. Releasing a free bot changes nothing but `updated_at`.
pub async fn release(
    db: &Database,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<BotStatus>, FlareError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_status
                 SET in_use = 0, holder = NULL, session_start = NULL, session_end = NULL,
                     updated_at = ?2
                 WHERE bot_name = ?1",
                params![name, ts(now)],
            )?;
            optional(select_by_name(conn, &name))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Releases every bot whose session ended at or before `now`, returning their names.
pub async fn release_expired(db: &Database, now: DateTime<Utc>) -> Result<Vec<String>, FlareError> {
    db.connection()
        .call(move |conn| {
            let now = ts(now);
            let tx = conn.transaction()?;
            let names = {
                let mut stmt = tx.prepare(
                    "SELECT bot_name FROM bot_status
                     WHERE in_use = 1 AND session_end IS NOT NULL AND session_end <= ?1
                     ORDER BY bot_name",
                )?;
                let rows = stmt
                    .query_map(params![now], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };
            tx.execute(
                "UPDATE bot_status
                 SET in_use = 0, holder = NULL, session_start = NULL, session_end = NULL,
                     updated_at = ?1
                 WHERE in_use = 1 AND session_end IS NOT NULL AND session_end <= ?1",
                params![now],
            )?;
            tx.commit()?;
            Ok(names)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
