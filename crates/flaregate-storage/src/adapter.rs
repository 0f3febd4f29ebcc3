// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use flaregate_config::model::StorageConfig;
use flaregate_core::types::{
    AcquireOutcome, AdminSession, BotConfiguration, BotStatus, ExternalAccount, FailedAttempt,
    KeyStatus, KeySubmission, SubmissionRecord, VerificationSession,
};
use flaregate_core::{AdapterType, FlareError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`initialize`](StorageAdapter::initialize).
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, FlareError> {
        self.db.get().ok_or_else(|| FlareError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FlareError> {
        self.db()?
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlareError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), FlareError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FlareError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FlareError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Accounts ---

    async fn get_account(&self, name: &str) -> Result<Option<ExternalAccount>, FlareError> {
        queries::accounts::get_account(self.db()?, name).await
    }

    async fn ensure_account_code(
        &self,
        name: &str,
        candidate_code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExternalAccount, FlareError> {
        queries::accounts::ensure_account_code(self.db()?, name, candidate_code, now).await
    }

    async fn set_account_password(
        &self,
        name: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ExternalAccount, FlareError> {
        queries::accounts::set_account_password(self.db()?, name, password_hash, now).await
    }

    // --- Verification sessions ---

    async fn create_verification_session(
        &self,
        session: &VerificationSession,
    ) -> Result<(), FlareError> {
        queries::verification_sessions::create_session(self.db()?, session).await
    }

    async fn get_verification_session(
        &self,
        id: &str,
    ) -> Result<Option<VerificationSession>, FlareError> {
        queries::verification_sessions::get_session(self.db()?, id).await
    }

    async fn account_locked_until(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, FlareError> {
        queries::verification_sessions::account_locked_until(self.db()?, name, now).await
    }

    async fn mark_session_verified(
        &self,
        id: &str,
    ) -> Result<Option<VerificationSession>, FlareError> {
        queries::verification_sessions::mark_verified(self.db()?, id).await
    }

    async fn record_failed_attempt(
        &self,
        id: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: Duration,
    ) -> Result<Option<FailedAttempt>, FlareError> {
        queries::verification_sessions::record_failed_attempt(
            self.db()?,
            id,
            now,
            max_attempts,
            lockout,
        )
        .await
    }

    async fn delete_session_cascade(&self, id: &str) -> Result<bool, FlareError> {
        queries::verification_sessions::delete_cascade(self.db()?, id).await
    }

    async fn purge_stale_sessions(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<usize, FlareError> {
        queries::verification_sessions::purge_stale(self.db()?, created_before).await
    }

    async fn list_submission_records(&self) -> Result<Vec<SubmissionRecord>, FlareError> {
        queries::verification_sessions::list_submission_records(self.db()?).await
    }

    // --- Bot configurations ---

    async fn create_bot_config(&self, config: &BotConfiguration) -> Result<(), FlareError> {
        queries::bot_configs::create_config(self.db()?, config).await
    }

    async fn get_bot_config(&self, id: &str) -> Result<Option<BotConfiguration>, FlareError> {
        queries::bot_configs::get_config(self.db()?, id).await
    }

    async fn complete_bot_config(
        &self,
        id: &str,
    ) -> Result<Option<BotConfiguration>, FlareError> {
        queries::bot_configs::complete_config(self.db()?, id).await
    }

    async fn latest_config_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<BotConfiguration>, FlareError> {
        queries::bot_configs::latest_for_session(self.db()?, session_id).await
    }

    // --- Key submissions ---

    async fn create_key_submission(&self, submission: &KeySubmission) -> Result<(), FlareError> {
        queries::key_submissions::create_submission(self.db()?, submission).await
    }

    async fn get_key_submission(&self, id: &str) -> Result<Option<KeySubmission>, FlareError> {
        queries::key_submissions::get_submission(self.db()?, id).await
    }

    async fn latest_key_submission_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<KeySubmission>, FlareError> {
        queries::key_submissions::latest_for_session(self.db()?, session_id).await
    }

    async fn transition_key_submission(
        &self,
        submission: &KeySubmission,
        expected: KeyStatus,
    ) -> Result<bool, FlareError> {
        queries::key_submissions::transition(self.db()?, submission, expected).await
    }

    async fn expire_granted_submissions(&self, now: DateTime<Utc>) -> Result<usize, FlareError> {
        queries::key_submissions::expire_granted(self.db()?, now).await
    }

    // --- Bot status ---

    async fn seed_bots(&self, names: &[String], now: DateTime<Utc>) -> Result<(), FlareError> {
        queries::bot_status::seed(self.db()?, names, now).await
    }

    async fn get_bot_status(&self, name: &str) -> Result<Option<BotStatus>, FlareError> {
        queries::bot_status::get_status(self.db()?, name).await
    }

    async fn list_bot_statuses(&self) -> Result<Vec<BotStatus>, FlareError> {
        queries::bot_status::list_statuses(self.db()?).await
    }

    async fn try_acquire_bot(
        &self,
        name: &str,
        user: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<AcquireOutcome, FlareError> {
        queries::bot_status::try_acquire(self.db()?, name, user, now, until).await
    }

    async fn release_bot(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BotStatus>, FlareError> {
        queries::bot_status::release(self.db()?, name, now).await
    }

    async fn release_expired_bots(&self, now: DateTime<Utc>) -> Result<Vec<String>, FlareError> {
        queries::bot_status::release_expired(self.db()?, now).await
    }

    // --- Admin sessions ---

    async fn create_admin_session(&self, session: &AdminSession) -> Result<(), FlareError> {
        queries::admin_sessions::create_session(self.db()?, session).await
    }

    async fn get_admin_session(&self, id: &str) -> Result<Option<AdminSession>, FlareError> {
        queries::admin_sessions::get_session(self.db()?, id).await
    }

    async fn deactivate_admin_session(&self, id: &str) -> Result<bool, FlareError> {
        queries::admin_sessions::deactivate(self.db()?, id).await
    }
}
