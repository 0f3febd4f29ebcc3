// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::FlareError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AcquireOutcome, AdminSession, BotConfiguration, BotStatus, ExternalAccount, FailedAttempt,
    KeyStatus, KeySubmission, SubmissionRecord, VerificationSession,
};

/// Adapter for storage and persistence backends.
///
/// One logical collection per entity, keyed by generated id. Every method
/// is a single atomic read-modify-write on the backend; callers never hold
/// a transaction open across awaits.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection pool, etc.).
    async fn initialize(&self) -> Result<(), FlareError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), FlareError>;

    // --- Accounts ---

    async fn get_account(&self, name: &str) -> Result<Option<ExternalAccount>, FlareError>;

    /// Creates the account if missing and assigns `candidate_code` unless a
    /// permanent code already exists. Returns the stored account, whose
    /// `permanent_code` is authoritative.
    async fn ensure_account_code(
        &self,
        name: &str,
        candidate_code: &str,
        now: DateTime<Utc>,
    ) -> Result<ExternalAccount, FlareError>;

    /// Creates the account if missing and stores the password hash.
    async fn set_account_password(
        &self,
        name: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<ExternalAccount, FlareError>;

    // --- Verification sessions ---

    async fn create_verification_session(
        &self,
        session: &VerificationSession,
    ) -> Result<(), FlareError>;

    async fn get_verification_session(
        &self,
        id: &str,
    ) -> Result<Option<VerificationSession>, FlareError>;

    /// Latest `locked_until` still in force at `now` across all of the
    /// account's sessions, or `None` if none of them is locked.
    async fn account_locked_until(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, FlareError>;

    /// Sets `verified = true`. Returns `None` if the session does not exist.
    async fn mark_session_verified(
        &self,
        id: &str,
    ) -> Result<Option<VerificationSession>, FlareError>;

    /// Increments `attempts` and sets `locked_until = now + lockout` once
    /// `attempts >= max_attempts`. A lock that has already elapsed is
    /// cleared, and its counter reset, before counting. No-op on verified
    /// sessions, which report `verified = true`. Returns `None` if the
    /// session does not exist.
    async fn record_failed_attempt(
        &self,
        id: &str,
        now: DateTime<Utc>,
        max_attempts: u32,
        lockout: Duration,
    ) -> Result<Option<FailedAttempt>, FlareError>;

    /// Deletes a session with its configurations and key submissions.
    async fn delete_session_cascade(&self, id: &str) -> Result<bool, FlareError>;

    /// Deletes unverified sessions created before `created_before` that have
    /// no configurations or key submissions.
    async fn purge_stale_sessions(&self, created_before: DateTime<Utc>)
    -> Result<usize, FlareError>;

    /// All sessions with their latest configuration and key submission,
    /// newest first.
    async fn list_submission_records(&self) -> Result<Vec<SubmissionRecord>, FlareError>;

    // --- Bot configurations ---

    async fn create_bot_config(&self, config: &BotConfiguration) -> Result<(), FlareError>;

    async fn get_bot_config(&self, id: &str) -> Result<Option<BotConfiguration>, FlareError>;

    /// Sets `completed = true`. Returns `None` if the configuration does not exist.
    async fn complete_bot_config(&self, id: &str)
    -> Result<Option<BotConfiguration>, FlareError>;

    async fn latest_config_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<BotConfiguration>, FlareError>;

    // --- Key submissions ---

    async fn create_key_submission(&self, submission: &KeySubmission) -> Result<(), FlareError>;

    async fn get_key_submission(&self, id: &str) -> Result<Option<KeySubmission>, FlareError>;

    async fn latest_key_submission_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<KeySubmission>, FlareError>;

    /// Writes `submission` only if the stored status is still `expected`.
    /// Returns whether the write happened.
    async fn transition_key_submission(
        &self,
        submission: &KeySubmission,
        expected: KeyStatus,
    ) -> Result<bool, FlareError>;

    /// Moves granted submissions whose `next_intent_time` has passed to `expired`.
    async fn expire_granted_submissions(&self, now: DateTime<Utc>) -> Result<usize, FlareError>;

    // --- Bot status ---

    /// Inserts a free status row for every name not yet present.
    async fn seed_bots(&self, names: &[String], now: DateTime<Utc>) -> Result<(), FlareError>;

    async fn get_bot_status(&self, name: &str) -> Result<Option<BotStatus>, FlareError>;

    async fn list_bot_statuses(&self) -> Result<Vec<BotStatus>, FlareError>;

    /// Atomically claims the bot for `user` until `until` if it is free or
    /// its previous session has lapsed at `now`.
    async fn try_acquire_bot(
        &self,
        name: &str,
        user: &str,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<AcquireOutcome, FlareError>;

    /// Clears the holder. Returns `None` if the bot does not exist.
    async fn release_bot(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BotStatus>, FlareError>;

    /// Releases every bot whose session ended at or before `now`.
    /// Returns the released names.
    async fn release_expired_bots(&self, now: DateTime<Utc>) -> Result<Vec<String>, FlareError>;

    // --- Admin sessions ---

    /// Deactivates every active admin session and inserts `session`, in one
    /// transaction.
    async fn create_admin_session(&self, session: &AdminSession) -> Result<(), FlareError>;

    async fn get_admin_session(&self, id: &str) -> Result<Option<AdminSession>, FlareError>;

    /// Returns whether a row changed.
    async fn deactivate_admin_session(&self, id: &str) -> Result<bool, FlareError>;
}
