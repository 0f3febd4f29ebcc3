// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, workflow, and gateway.
//!
//! Field names on the wire follow the public JSON contract
//! (`robloxUsername`, `isInUse`, ...), which is why most structs carry
//! explicit serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Identity,
    Observability,
}

/// An external account whose ownership is proven by publishing a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub id: String,
    #[serde(rename = "username")]
    pub name: String,
    #[serde(rename = "isPasswordSet")]
    pub password_set: bool,
    /// Argon2 PHC string; never serialized.
    #[serde(skip)]
    pub password_hash: Option<String>,
    /// Issued once per account and reused by every later verification.
    #[serde(rename = "verificationCode")]
    pub permanent_code: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// One attempt at proving ownership of an external account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub id: String,
    #[serde(rename = "robloxUsername")]
    pub external_account_name: String,
    #[serde(rename = "verificationCode")]
    pub code: String,
    #[serde(rename = "isVerified")]
    pub verified: bool,
    #[serde(rename = "verificationAttempts")]
    pub attempts: u32,
    #[serde(rename = "lockedUntil")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl VerificationSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Task parameters a user picked for the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfiguration {
    pub id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub game: String,
    pub mode: String,
    #[serde(rename = "additionalSettings")]
    pub additional_settings: Option<String>,
    #[serde(rename = "isCompleted")]
    pub completed: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a [`KeySubmission`].
///
/// ```text
/// pending --link--> link_provided --match--> accepted --approve--> granted --time--> expired
///    \__________________\--mismatch--> rejected (retryable)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    Pending,
    LinkProvided,
    Accepted,
    Granted,
    Rejected,
    Expired,
}

impl KeyStatus {
    /// States in which the user may (re)submit a key.
    pub fn accepts_submission(self) -> bool {
        matches!(
            self,
            KeyStatus::Pending | KeyStatus::LinkProvided | KeyStatus::Rejected
        )
    }
}

/// An issued access key and its progress through approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySubmission {
    pub id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "botName")]
    pub bot_name: String,
    /// Only handed out through the link-generation response and the admin feed.
    #[serde(skip_serializing, default)]
    pub access_key: String,
    #[serde(rename = "accessLink")]
    pub access_link: Option<String>,
    #[serde(skip_serializing, default)]
    pub submitted_key: Option<String>,
    pub status: KeyStatus,
    #[serde(rename = "adminApprovalTime")]
    pub admin_approval_time: Option<DateTime<Utc>>,
    #[serde(rename = "gameAccessTime")]
    pub game_access_time: Option<DateTime<Utc>>,
    #[serde(rename = "nextIntentTime")]
    pub next_intent_time: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Exclusive-use state of a named bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStatus {
    #[serde(rename = "botName")]
    pub bot_name: String,
    #[serde(rename = "isInUse")]
    pub in_use: bool,
    #[serde(rename = "currentUser")]
    pub current_user: Option<String>,
    #[serde(rename = "sessionStartTime")]
    pub session_start: Option<DateTime<Utc>>,
    #[serde(rename = "sessionEndTime")]
    pub session_end: Option<DateTime<Utc>>,
    #[serde(rename = "lastUpdated")]
    pub updated_at: DateTime<Utc>,
}

impl BotStatus {
    /// True while a user holds the bot. A lapsed session counts as free.
    pub fn is_held(&self, now: DateTime<Utc>) -> bool {
        self.in_use && self.session_end.is_none_or(|end| now < end)
    }

    /// Returns a copy as readers should see it at `now`.
    pub fn observed_at(&self, now: DateTime<Utc>) -> BotStatus {
        if self.in_use && !self.is_held(now) {
            BotStatus {
                in_use: false,
                current_user: None,
                session_start: None,
                session_end: None,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }
}

/// Result of an atomic acquire attempt on a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(BotStatus),
    Busy(BotStatus),
    UnknownBot,
}

/// Attempt counters after recording a failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    /// The session was already verified; nothing was counted.
    pub verified: bool,
}

/// An operator login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub id: String,
    pub username: String,
    #[serde(rename = "isActive")]
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A verification session joined with its most recent configuration and key submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub session: VerificationSession,
    pub latest_config: Option<BotConfiguration>,
    pub latest_key: Option<KeySubmission>,
}

/// Dashboard status of a verification session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Verified,
    Failed,
}

/// One row of the admin submission feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub id: String,
    pub roblox_username: String,
    pub verification_code: String,
    pub is_verified: bool,
    pub game: Option<String>,
    pub mode: Option<String>,
    pub additional_settings: Option<String>,
    pub key_submission_id: Option<String>,
    pub submitted_key: Option<String>,
    pub access_key: Option<String>,
    pub key_status: Option<KeyStatus>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub session_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub status: SubmissionStatus,
}

/// Aggregate counters shown above the submission feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_submissions: usize,
    pub active_users: usize,
    pub pending_verifications: usize,
    pub failed_verifications: usize,
    pub bot_configs: usize,
    pub awaiting_approval: usize,
}

/// Counts produced by one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub released_bots: usize,
    pub expired_submissions: usize,
    pub purged_sessions: usize,
}
