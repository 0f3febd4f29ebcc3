// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External account rows.

use chrono::{DateTime, Utc};
use flaregate_core::FlareError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{ACCOUNT_COLUMNS, ExternalAccount, account_from_row, ts};
use crate::queries::optional;

fn select_by_name(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<ExternalAccount> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE name = ?1"),
        params![name],
        account_from_row,
    )
}

pub async fn get_account(db: &Database, name: &str) -> Result<Option<ExternalAccount>, FlareError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| optional(select_by_name(conn, &name)))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Creates the account if needed and assigns `candidate_code` only when no
/// permanent code exists yet.
pub async fn ensure_account_code(
    db: &Database,
    name: &str,
    candidate_code: &str,
    now: DateTime<Utc>,
) -> Result<ExternalAccount, FlareError> {
    let name = name.to_string();
    let code = candidate_code.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO accounts (id, name, permanent_code, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, name, code, ts(now)],
            )?;
            tx.execute(
                "UPDATE accounts SET permanent_code = ?2
                 WHERE name = ?1 AND permanent_code IS NULL",
                params![name, code],
            )?;
            let account = select_by_name(&tx, &name)?;
            tx.commit()?;
            Ok(account)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Creates the account if needed and overwrites its password hash.
pub async fn set_account_password(
    db: &Database,
    name: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<ExternalAccount, FlareError> {
    let name = name.to_string();
    let hash = password_hash.to_string();
    let id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, name, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET password_hash = excluded.password_hash",
                params![id, name, hash, ts(now)],
            )?;
            select_by_name(conn, &name)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{setup_db, t0};

    #[tokio::test]
    async fn first_code_becomes_permanent() {
        let (db, _dir) = setup_db().await;

        let first = ensure_account_code(&db, "alice", "Verify_AAAAAAAA", t0())
            .await
            .unwrap();
        assert_eq!(first.permanent_code.as_deref(), Some("Verify_AAAAAAAA"));

        let second = ensure_account_code(&db, "alice", "Verify_BBBBBBBB", t0())
            .await
            .unwrap();
        assert_eq!(second.permanent_code.as_deref(), Some("Verify_AAAAAAAA"));
        assert_eq!(second.id, first.id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn names_match_regardless_of_case() {
        let (db, _dir) = setup_db().await;
        let first = ensure_account_code(&db, "alice", "Verify_AAAAAAAA", t0())
            .await
            .unwrap();
        let upper = ensure_account_code(&db, "ALICE", "Verify_BBBBBBBB", t0())
            .await
            .unwrap();
        assert_eq!(upper.id, first.id);
        assert_eq!(upper.permanent_code.as_deref(), Some("Verify_AAAAAAAA"));

        set_account_password(&db, "Alice", "$argon2id$hash", t0())
            .await
            .unwrap();
        let account = get_account(&db, "alice").await.unwrap().unwrap();
        assert_eq!(account.id, first.id);
        assert!(account.password_set);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn password_account_gets_code_later() {
        let (db, _dir) = setup_db().await;

        let account = set_account_password(&db, "bob", "$argon2id$hash", t0())
            .await
            .unwrap();
        assert!(account.password_set);
        assert!(account.permanent_code.is_none());

        let account = ensure_account_code(&db, "bob", "Verify_CCCCCCCC", t0())
            .await
            .unwrap();
        assert!(account.password_set);
        assert_eq!(account.permanent_code.as_deref(), Some("Verify_CCCCCCCC"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_password_overwrites() {
        let (db, _dir) = setup_db().await;
        set_account_password(&db, "carol", "first", t0()).await.unwrap();
        set_account_password(&db, "carol", "second", t0()).await.unwrap();

        let account = get_account(&db, "carol").await.unwrap().unwrap();
        assert_eq!(account.password_hash.as_deref(), Some("second"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_account_is_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_account(&db, "nobody").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
