// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity verification gate.
//!
//! A session binds an external account name to that account's permanent
//! code. The user publishes the code on their public profile and asks for
//! a check; the session flips to verified once the profile contains it.
//! Failed checks count toward a lockout.

use flaregate_core::FlareError;
use flaregate_core::token;
use flaregate_core::types::VerificationSession;
use flaregate_prometheus::record_verification;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{Workflow, new_id};

/// Whether an account can skip verification by logging in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCheck {
    pub has_password: bool,
    pub requires_login: bool,
}

/// Trims and lowercases an account name. External names are case-insensitive,
/// so every stored name and lookup uses the folded form.
pub(crate) fn normalize_name(name: &str) -> Result<String, FlareError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FlareError::Validation("robloxUsername is required".into()));
    }
    Ok(name.to_lowercase())
}

impl Workflow {
    /// Opens a verification session for `name`, reusing the account's
    /// permanent code when one was issued before.
    pub async fn start_verification(&self, name: &str) -> Result<VerificationSession, FlareError> {
        let name = normalize_name(name)?;
        if !self.identity.account_exists(&name).await? {
            return Err(FlareError::AccountNotFound { name });
        }

        let now = self.now();
        // A fresh session must not reset an active lockout on any earlier one.
        if let Some(locked_until) = self.storage.account_locked_until(&name, now).await? {
            warn!(username = %name, %locked_until, "verification refused, account locked");
            return Err(FlareError::AccountLocked { locked_until });
        }

        let code = self.permanent_code(&name).await?;
        let session = VerificationSession {
            id: new_id(),
            external_account_name: name.clone(),
            code,
            verified: false,
            attempts: 0,
            locked_until: None,
            expires_at: now + self.settings.code_ttl,
            created_at: now,
        };
        self.storage.create_verification_session(&session).await?;

        info!(
            session_id = %session.id,
            username = %name,
            expires_at = %session.expires_at,
            "verification session started"
        );
        Ok(session)
    }

    /// Returns the account's permanent code, minting one on first use.
    pub(crate) async fn permanent_code(&self, name: &str) -> Result<String, FlareError> {
        let candidate = token::verification_code();
        let account = self
            .storage
            .ensure_account_code(name, &candidate, self.now())
            .await?;
        account.permanent_code.ok_or_else(|| {
            FlareError::Internal(format!("account `{name}` has no permanent code after assignment"))
        })
    }

    /// Looks up a session for display. Expired sessions are reported as such.
    pub async fn get_session(&self, session_id: &str) -> Result<VerificationSession, FlareError> {
        let session = self.find_session(session_id).await?;
        if session.is_expired(self.now()) {
            return Err(FlareError::SessionExpired {
                expired_at: session.expires_at,
            });
        }
        Ok(session)
    }

    /// Checks the external profile for the session's code.
    ///
    /// Order of checks: missing, expired, already verified (no-op success),
    /// locked, then the profile lookup. An unreachable identity provider
    /// fails the call without counting an attempt.
    pub async fn check_verification(
        &self,
        session_id: &str,
    ) -> Result<VerificationSession, FlareError> {
        let session = self.find_session(session_id).await?;
        let now = self.now();

        if session.is_expired(now) {
            record_verification("expired");
            return Err(FlareError::SessionExpired {
                expired_at: session.expires_at,
            });
        }
        if session.verified {
            debug!(session_id, "session already verified");
            return Ok(session);
        }
        if let Some(locked_until) = session.locked_until.filter(|_| session.is_locked(now)) {
            record_verification("locked");
            return Err(FlareError::AccountLocked { locked_until });
        }

        let profile = self
            .identity
            .profile_text(&session.external_account_name)
            .await?;
        let found = profile.is_some_and(|text| text.contains(&session.code));

        if found {
            let verified = self
                .storage
                .mark_session_verified(session_id)
                .await?
                .ok_or_else(|| FlareError::SessionNotFound {
                    session_id: session_id.to_string(),
                })?;
            record_verification("verified");
            info!(
                session_id,
                username = %verified.external_account_name,
                "account verified"
            );
            return Ok(verified);
        }

        let attempt = self
            .storage
            .record_failed_attempt(
                session_id,
                now,
                self.settings.max_attempts,
                self.settings.lockout,
            )
            .await?
            .ok_or_else(|| FlareError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        if attempt.verified {
            // A concurrent check verified the session between our lookup and the count.
            debug!(session_id, "session verified concurrently");
            return self.find_session(session_id).await;
        }
        if let Some(locked_until) = attempt.locked_until {
            record_verification("too_many_attempts");
            warn!(
                session_id,
                attempts = attempt.attempts,
                %locked_until,
                "verification locked after repeated failures"
            );
            return Err(FlareError::TooManyAttempts { locked_until });
        }

        record_verification("code_not_found");
        debug!(session_id, attempts = attempt.attempts, "code not found in profile");
        Err(FlareError::CodeNotFound {
            attempts_remaining: self.settings.max_attempts.saturating_sub(attempt.attempts),
        })
    }

    /// Reports whether `name` already has a password and should log in instead.
    pub async fn check_user(&self, name: &str) -> Result<AccountCheck, FlareError> {
        let name = normalize_name(name)?;
        if !self.identity.account_exists(&name).await? {
            return Err(FlareError::AccountNotFound { name });
        }
        let has_password = self
            .storage
            .get_account(&name)
            .await?
            .is_some_and(|account| account.password_set);
        Ok(AccountCheck {
            has_password,
            requires_login: has_password,
        })
    }

    pub(crate) async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<VerificationSession, FlareError> {
        self.storage
            .get_verification_session(session_id)
            .await?
            .ok_or_else(|| FlareError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use flaregate_core::{ErrorKind, StorageAdapter};

    use crate::test_support::{fixture, t0};

    use super::*;

    #[tokio::test]
    async fn unknown_account_is_rejected() {
        let fx = fixture().await;
        let err = fx.workflow.start_verification("ghost").await.unwrap_err();
        assert!(matches!(err, FlareError::AccountNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_name_is_validation_error() {
        let fx = fixture().await;
        let err = fx.workflow.start_verification("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn upstream_outage_is_not_account_missing() {
        let fx = fixture().await;
        fx.identity.set_down(true);
        let err = fx.workflow.start_verification("alice").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn code_is_permanent_per_account() {
        let fx = fixture().await;
        fx.identity.add("alice", "");
        let first = fx.workflow.start_verification("alice").await.unwrap();
        let second = fx.workflow.start_verification(" alice ").await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.code, second.code);
        assert!(first.code.starts_with("Verify_"));
        assert_eq!(first.expires_at, t0() + Duration::minutes(10));
    }

    #[tokio::test]
    async fn verifies_once_then_is_a_noop() {
        let fx = fixture().await;
        fx.identity.add("alice", "");
        let session = fx.workflow.start_verification("alice").await.unwrap();
        fx.identity.add("alice", &format!("hi {}", session.code));

        let verified = fx.workflow.check_verification(&session.id).await.unwrap();
        assert!(verified.verified);

        // Profile no longer carries the code; still a success, no attempt counted.
        fx.identity.add("alice", "");
        let again = fx.workflow.check_verification(&session.id).await.unwrap();
        assert!(again.verified);
        assert_eq!(again.attempts, 0);
    }

    #[tokio::test]
    async fn missing_code_reports_remaining_attempts() {
        let fx = fixture().await;
        fx.identity.add("bob", "nothing here");
        let session = fx.workflow.start_verification("bob").await.unwrap();

        let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
        assert!(matches!(
            err,
            FlareError::CodeNotFound {
                attempts_remaining: 4
            }
        ));
    }

    #[tokio::test]
    async fn fifth_failure_locks_and_lock_outlives_new_sessions() {
        let fx = fixture().await;
        fx.identity.add("bob", "nothing here");
        let session = fx.workflow.start_verification("bob").await.unwrap();

        for _ in 0..4 {
            let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
            assert!(matches!(err, FlareError::CodeNotFound { .. }));
        }
        let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
        assert!(matches!(err, FlareError::TooManyAttempts { .. }));

        // Even with the code published, the lock holds.
        fx.identity.add("bob", &session.code);
        let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
        assert!(matches!(err, FlareError::AccountLocked { .. }));

        let err = fx.workflow.start_verification("bob").await.unwrap_err();
        assert!(matches!(err, FlareError::AccountLocked { .. }));

        let stored = fx
            .storage
            .get_verification_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 5);
    }

    #[tokio::test]
    async fn name_case_does_not_bypass_lockout() {
        let fx = fixture().await;
        fx.identity.add("bob", "nothing here");
        let session = fx.workflow.start_verification("bob").await.unwrap();
        for _ in 0..5 {
            fx.workflow.check_verification(&session.id).await.unwrap_err();
        }

        for variant in ["BOB", "Bob", " bOb "] {
            let err = fx.workflow.start_verification(variant).await.unwrap_err();
            assert!(matches!(err, FlareError::AccountLocked { .. }), "{variant}");
        }
    }

    #[tokio::test]
    async fn name_case_shares_one_permanent_code() {
        let fx = fixture().await;
        fx.identity.add("alice", "");
        let lower = fx.workflow.start_verification("alice").await.unwrap();
        let upper = fx.workflow.start_verification("ALICE").await.unwrap();

        assert_eq!(upper.code, lower.code);
        assert_eq!(upper.external_account_name, "alice");
    }

    #[tokio::test]
    async fn lock_on_older_session_blocks_new_ones() {
        let fx = fixture().await;
        fx.identity.add("carl", "nothing here");
        let first = fx.workflow.start_verification("carl").await.unwrap();
        fx.clock.advance(Duration::seconds(1));
        let second = fx.workflow.start_verification("carl").await.unwrap();

        for _ in 0..5 {
            fx.workflow.check_verification(&first.id).await.unwrap_err();
        }

        // The newest session is unlocked, but the account is not.
        let err = fx.workflow.start_verification("carl").await.unwrap_err();
        assert!(matches!(err, FlareError::AccountLocked { .. }));
        let newest = fx.workflow.get_session(&second.id).await.unwrap();
        assert!(newest.locked_until.is_none());

        fx.clock.advance(Duration::minutes(31));
        fx.workflow.start_verification("carl").await.unwrap();
    }

    #[tokio::test]
    async fn verified_during_lookup_reports_success() {
        let fx = fixture().await;
        fx.identity.add("frank", "nothing here");
        let session = fx.workflow.start_verification("frank").await.unwrap();
        fx.identity.verify_on_next_lookup(fx.storage.clone(), &session.id);

        let verified = fx.workflow.check_verification(&session.id).await.unwrap();
        assert!(verified.verified);
        assert_eq!(verified.attempts, 0);
    }

    #[tokio::test]
    async fn expiry_wins_over_everything() {
        let fx = fixture().await;
        fx.identity.add("carol", "");
        let session = fx.workflow.start_verification("carol").await.unwrap();
        fx.clock.advance(Duration::minutes(11));

        let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
        assert!(matches!(err, FlareError::SessionExpired { .. }));
        let err = fx.workflow.get_session(&session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Expired);
    }

    #[tokio::test]
    async fn upstream_outage_does_not_count_an_attempt() {
        let fx = fixture().await;
        fx.identity.add("dave", "");
        let session = fx.workflow.start_verification("dave").await.unwrap();
        fx.identity.set_down(true);

        let err = fx.workflow.check_verification(&session.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
        let stored = fx.workflow.get_session(&session.id).await.unwrap();
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let fx = fixture().await;
        let err = fx.workflow.check_verification("nope").await.unwrap_err();
        assert!(matches!(err, FlareError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn check_user_reports_password_state() {
        let fx = fixture().await;
        fx.identity.add("erin", "");
        let check = fx.workflow.check_user("erin").await.unwrap();
        assert!(!check.has_password);
        assert!(!check.requires_login);

        let err = fx.workflow.check_user("ghost").await.unwrap_err();
        assert!(matches!(err, FlareError::AccountNotFound { .. }));

        let check = fx.workflow.check_user("ERIN").await.unwrap();
        assert!(!check.has_password);
    }
}
