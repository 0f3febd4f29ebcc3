// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verification session rows, attempt accounting, and the dashboard join.

use chrono::{DateTime, Duration, Utc};
use flaregate_core::FlareError;
use flaregate_core::types::{FailedAttempt, SubmissionRecord};
use rusqlite::params;

use crate::database::Database;
use crate::models::{
    CONFIG_COLUMNS, KEY_COLUMNS, SESSION_COLUMNS, VerificationSession, config_from_row,
    get_opt_ts, key_from_row, opt_ts, session_from_row, ts,
};
use crate::queries::optional;

fn select_by_id(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<VerificationSession> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM verification_sessions WHERE id = ?1"),
        params![id],
        session_from_row,
    )
}

pub async fn create_session(db: &Database, session: &VerificationSession) -> Result<(), FlareError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO verification_sessions
                     (id, account_name, code, verified, attempts, locked_until, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id,
                    session.external_account_name,
                    session.code,
                    session.verified,
                    session.attempts,
                    opt_ts(session.locked_until),
                    ts(session.expires_at),
                    ts(session.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_session(db: &Database, id: &str) -> Result<Option<VerificationSession>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| optional(select_by_id(conn, &id)))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Latest lock still in force at `now` across every session of the account.
pub async fn account_locked_until(
    db: &Database,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, FlareError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT MAX(locked_until) FROM verification_sessions
                 WHERE account_name = ?1 AND locked_until > ?2",
                params![name, ts(now)],
                |row| get_opt_ts(row, 0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sets `verified`. The flag never reverts.
pub async fn mark_verified(
    db: &Database,
    id: &str,
) -> Result<Option<VerificationSession>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE verification_sessions SET verified = 1 WHERE id = ?1",
                params![id],
            )?;
            optional(select_by_id(conn, &id))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counts one failed check inside a transaction.
///
/// Verified sessions and sessions still inside their lock are left untouched.
/// A lock that has lapsed at `now` is cleared and the counter restarts.
pub async fn record_failed_attempt(
    db: &Database,
    id: &str,
    now: DateTime<Utc>,
    max_attempts: u32,
    lockout: Duration,
) -> Result<Option<FailedAttempt>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current = optional(tx.query_row(
                "SELECT verified, attempts, locked_until FROM verification_sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, bool>(0)?,
                        row.get::<_, u32>(1)?,
                        get_opt_ts(row, 2)?,
                    ))
                },
            ))?;

            let Some((verified, mut attempts, mut locked_until)) = current else {
                return Ok(None);
            };

            let still_locked = locked_until.is_some_and(|until| now < until);
            if verified || still_locked {
                return Ok(Some(FailedAttempt {
                    attempts,
                    locked_until,
                    verified,
                }));
            }

            if locked_until.is_some() {
                attempts = 0;
                locked_until = None;
            }
            attempts += 1;
            if attempts >= max_attempts {
                locked_until = Some(now + lockout);
            }

            tx.execute(
                "UPDATE verification_sessions SET attempts = ?2, locked_until = ?3 WHERE id = ?1",
                params![id, attempts, opt_ts(locked_until)],
            )?;
            tx.commit()?;

            Ok(Some(FailedAttempt {
                attempts,
                locked_until,
                verified: false,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Deletes the session together with its configurations and key submissions.
pub async fn delete_cascade(db: &Database, id: &str) -> Result<bool, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM key_submissions WHERE session_id = ?1", params![id])?;
            tx.execute(
                "DELETE FROM bot_configurations WHERE session_id = ?1",
                params![id],
            )?;
            let removed = tx.execute("DELETE FROM verification_sessions WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Removes unverified sessions created before `created_before` that nothing references.
pub async fn purge_stale(db: &Database, created_before: DateTime<Utc>) -> Result<usize, FlareError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM verification_sessions
                 WHERE verified = 0
                   AND created_at < ?1
                   AND NOT EXISTS (SELECT 1 FROM bot_configurations c WHERE c.session_id = verification_sessions.id)
                   AND NOT EXISTS (SELECT 1 FROM key_submissions k WHERE k.session_id = verification_sessions.id)",
                params![ts(created_before)],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every session, newest first, with its latest configuration and key submission.
pub async fn list_submission_records(db: &Database) -> Result<Vec<SubmissionRecord>, FlareError> {
    db.connection()
        .call(|conn| {
            let sessions = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM verification_sessions
                     ORDER BY created_at DESC, rowid DESC"
                ))?;
                let rows = stmt
                    .query_map([], session_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            let mut config_stmt = conn.prepare(&format!(
                "SELECT {CONFIG_COLUMNS} FROM bot_configurations
                 WHERE session_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ))?;
            let mut key_stmt = conn.prepare(&format!(
                "SELECT {KEY_COLUMNS} FROM key_submissions
                 WHERE session_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ))?;

            let mut records = Vec::with_capacity(sessions.len());
            for session in sessions {
                let latest_config =
                    optional(config_stmt.query_row(params![session.id], config_from_row))?;
                let latest_key = optional(key_stmt.query_row(params![session.id], key_from_row))?;
                records.push(SubmissionRecord {
                    session,
                    latest_config,
                    latest_key,
                });
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
