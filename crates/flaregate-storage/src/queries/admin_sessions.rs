// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin session rows. At most one row is active.

use flaregate_core::FlareError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ADMIN_COLUMNS, AdminSession, admin_from_row, ts};
use crate::queries::optional;

/// Deactivates every active session and inserts `session` in one transaction.
pub async fn create_session(db: &Database, session: &AdminSession) -> Result<(), FlareError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("UPDATE admin_sessions SET active = 0 WHERE active = 1", [])?;
            tx.execute(
                "INSERT INTO admin_sessions (id, username, active, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.id,
                    session.username,
                    session.active,
                    ts(session.created_at)
                ],
            )?;
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_session(db: &Database, id: &str) -> Result<Option<AdminSession>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                &format!("SELECT {ADMIN_COLUMNS} FROM admin_sessions WHERE id = ?1"),
                params![id],
                admin_from_row,
            ))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Returns whether an active row was switched off.
pub async fn deactivate(db: &Database, id: &str) -> Result<bool, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE admin_sessions SET active = 0 WHERE id = ?1 AND active = 1",
                params![id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
