// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One query module per table.

pub mod accounts;
pub mod admin_sessions;
pub mod bot_configs;
pub mod bot_status;
pub mod key_submissions;
pub mod verification_sessions;

/// Turns `QueryReturnedNoRows` into `Ok(None)`.
pub(crate) fn optional<T>(result: rusqlite::Result<T>) -> rusqlite::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}
