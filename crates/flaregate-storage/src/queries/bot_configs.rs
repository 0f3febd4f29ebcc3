// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot configuration rows. Several may exist per session; the newest one wins.

use flaregate_core::FlareError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{BotConfiguration, CONFIG_COLUMNS, config_from_row, ts};
use crate::queries::optional;

fn select_by_id(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<BotConfiguration> {
    conn.query_row(
        &format!("SELECT {CONFIG_COLUMNS} FROM bot_configurations WHERE id = ?1"),
        params![id],
        config_from_row,
    )
}

pub async fn create_config(db: &Database, config: &BotConfiguration) -> Result<(), FlareError> {
    let config = config.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bot_configurations
                     (id, session_id, game, mode, additional_settings, completed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    config.id,
                    config.session_id,
                    config.game,
                    config.mode,
                    config.additional_settings,
                    config.completed,
                    ts(config.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_config(db: &Database, id: &str) -> Result<Option<BotConfiguration>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| optional(select_by_id(conn, &id)))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn complete_config(
    db: &Database,
    id: &str,
) -> Result<Option<BotConfiguration>, FlareError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE bot_configurations SET completed = 1 WHERE id = ?1",
                params![id],
            )?;
            optional(select_by_id(conn, &id))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn latest_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<BotConfiguration>, FlareError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            optional(conn.query_row(
                &format!(
                    "SELECT {CONFIG_COLUMNS} FROM bot_configurations
                     WHERE session_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![session_id],
                config_from_row,
            ))
        })
        .await
        .map_err(crate::database::map_tr_err)
}
