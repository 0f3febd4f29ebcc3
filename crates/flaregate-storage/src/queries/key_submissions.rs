// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key submission rows with compare-and-set status transitions.

use chrono::{DateTime, Utc};
use flaregate_core::FlareError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{KEY_COLUMNS, KeyStatus, KeySubmission, key_from_row, opt_ts, ts};
use crate::queries::optional;

pub async fn create_submission(db: &Database, sub: &KeySubmission) -> Result<(), FlareError> {
    let sub = sub.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("INSERT INTO key_submissions ({KEY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
                params![
                    sub.id,
                    sub.session_id,
                    sub.bot_name,
                    sub.access_key,
                    sub.access_link,
                    sub.submitted_key,
                    sub.status.to_string(),
                    opt_ts(sub.admin_approval_time),
                    opt_ts(sub.game_access_time),
                    opt_ts(sub.next_intent_time),
                    ts(sub.created_at),
                    ts(sub.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_submission(db: &Database, id: &str) -> Result<Option<KeySubmission>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                &format!("SELECT {KEY_COLUMNS} FROM key_submissions WHERE id = ?1"),
                params![id],
                key_from_row,
            ))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn latest_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<KeySubmission>, FlareError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                &format!(
                    "SELECT {KEY_COLUMNS} FROM key_submissions
                     WHERE session_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![session_id],
                key_from_row,
            ))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Writes the mutable fields of `sub` only if the stored status is still `expected`.
pub async fn transition(
    db: &Database,
    sub: &KeySubmission,
    expected: KeyStatus,
) -> Result<bool, FlareError> {
    let sub = sub.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE key_submissions
                 SET access_link = ?3, submitted_key = ?4, status = ?5,
                     admin_approval_time = ?6, game_access_time = ?7, next_intent_time = ?8,
                     updated_at = ?9
                 WHERE id = ?1 AND status = ?2",
                params![
                    sub.id,
                    expected.to_string(),
                    sub.access_link,
                    sub.submitted_key,
                    sub.status.to_string(),
                    opt_ts(sub.admin_approval_time),
                    opt_ts(sub.game_access_time),
                    opt_ts(sub.next_intent_time),
                    ts(sub.updated_at),
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Moves every granted submission whose window ended at or before `now` to `expired`.
pub async fn expire_granted(db: &Database, now: DateTime<Utc>) -> Result<usize, FlareError> {
    db.connection()
        .call(move |conn| {
            let now = ts(now);
            conn.execute(
                "UPDATE key_submissions SET status = 'expired', updated_at = ?1
                 WHERE status = 'granted'
                   AND next_intent_time IS NOT NULL
                   AND next_intent_time <= ?1",
                params![now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
