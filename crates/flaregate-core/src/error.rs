// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Flaregate.
//!
//! Every failure the workflow can report has its own variant so that the
//! HTTP layer never has to merge meanings (a wrong key is not a busy bot).
//! Variants are grouped into coarse [`ErrorKind`]s for status mapping.

use chrono::{DateTime, Utc};
use strum::Display;
use thiserror::Error;

/// Coarse classification of a [`FlareError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Expired,
    LockedOut,
    Conflict,
    Validation,
    Unauthorized,
    UpstreamUnavailable,
    Internal,
}

/// The primary error type used across all Flaregate crates.
#[derive(Debug, Error)]
pub enum FlareError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Password does not satisfy the password policy.
    #[error("{0}")]
    WeakPassword(String),

    #[error("verification session not found")]
    SessionNotFound { session_id: String },

    #[error("verification code expired")]
    SessionExpired { expired_at: DateTime<Utc> },

    /// Verification attempts are rejected until `locked_until`.
    #[error("account locked until {locked_until}")]
    AccountLocked { locked_until: DateTime<Utc> },

    /// The attempt that crossed the threshold; the lock starts now.
    #[error("too many failed attempts, account locked until {locked_until}")]
    TooManyAttempts { locked_until: DateTime<Utc> },

    #[error("verification code not found in profile")]
    CodeNotFound { attempts_remaining: u32 },

    /// The identity provider reports no such external account.
    #[error("external account `{name}` not found")]
    AccountNotFound { name: String },

    #[error("verification session is not verified")]
    SessionNotVerified { session_id: String },

    #[error("bot configuration not found")]
    ConfigNotFound { config_id: String },

    #[error("key submission not found")]
    SubmissionNotFound { id: String },

    #[error("bot `{bot_name}` not found")]
    BotNotFound { bot_name: String },

    /// Another user holds the bot.
    #[error("bot `{bot_name}` is in use")]
    BotBusy {
        bot_name: String,
        session_end: Option<DateTime<Utc>>,
    },

    /// Submitted key differs from the issued key.
    #[error("submitted key does not match the issued key")]
    KeyMismatch,

    /// Approval requested for a submission whose key was never accepted.
    #[error("key submission is `{status}`, expected `accepted`")]
    NotAccepted { status: String },

    #[error("cannot {action} a key submission in state `{status}`")]
    InvalidTransition { status: String, action: &'static str },

    /// Missing, unknown, or inactive admin session, or bad credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The external identity provider could not be reached or answered garbage.
    #[error("identity provider unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FlareError {
    /// Returns the coarse kind used for status mapping and metrics labels.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlareError::Validation(_)
            | FlareError::WeakPassword(_)
            | FlareError::CodeNotFound { .. }
            | FlareError::SessionNotVerified { .. } => ErrorKind::Validation,
            FlareError::SessionNotFound { .. }
            | FlareError::AccountNotFound { .. }
            | FlareError::ConfigNotFound { .. }
            | FlareError::SubmissionNotFound { .. }
            | FlareError::BotNotFound { .. } => ErrorKind::NotFound,
            FlareError::SessionExpired { .. } => ErrorKind::Expired,
            FlareError::AccountLocked { .. } | FlareError::TooManyAttempts { .. } => {
                ErrorKind::LockedOut
            }
            FlareError::BotBusy { .. }
            | FlareError::KeyMismatch
            | FlareError::NotAccepted { .. }
            | FlareError::InvalidTransition { .. } => ErrorKind::Conflict,
            FlareError::Unauthorized(_) => ErrorKind::Unauthorized,
            FlareError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            FlareError::Config(_) | FlareError::Storage { .. } | FlareError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            FlareError::Config(_) => "config",
            FlareError::Storage { .. } => "storage",
            FlareError::Validation(_) => "validation",
            FlareError::WeakPassword(_) => "weak_password",
            FlareError::SessionNotFound { .. } => "session_not_found",
            FlareError::SessionExpired { .. } => "session_expired",
            FlareError::AccountLocked { .. } => "account_locked",
            FlareError::TooManyAttempts { .. } => "too_many_attempts",
            FlareError::CodeNotFound { .. } => "code_not_found",
            FlareError::AccountNotFound { .. } => "account_not_found",
            FlareError::SessionNotVerified { .. } => "session_not_verified",
            FlareError::ConfigNotFound { .. } => "config_not_found",
            FlareError::SubmissionNotFound { .. } => "submission_not_found",
            FlareError::BotNotFound { .. } => "bot_not_found",
            FlareError::BotBusy { .. } => "bot_busy",
            FlareError::KeyMismatch => "key_mismatch",
            FlareError::NotAccepted { .. } => "not_accepted",
            FlareError::InvalidTransition { .. } => "invalid_transition",
            FlareError::Unauthorized(_) => "unauthorized",
            FlareError::UpstreamUnavailable { .. } => "upstream_unavailable",
            FlareError::Internal(_) => "internal",
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FlareError::Storage {
            source: Box::new(err),
        }
    }
}
