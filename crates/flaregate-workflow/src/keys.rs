// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key issuance and approval.
//!
//! ```text
//! pending --link--> link_provided --match--> accepted --approve--> granted --time--> expired
//!    \__________________\--mismatch--> rejected (retryable)
//! ```
//!
//! Every write is a compare-and-set on the stored status, so two racing
//! requests cannot both move the same submission.

use flaregate_core::FlareError;
use flaregate_core::token;
use flaregate_core::types::{BotStatus, KeyStatus, KeySubmission};
use flaregate_prometheus::record_key_submission;
use tracing::{info, warn};

use crate::admin::ActiveAdmin;
use crate::{Workflow, new_id};

/// Bot parameters that may accompany an access request.
#[derive(Debug, Clone, Default)]
pub struct ConfigRequest {
    pub game: String,
    pub mode: String,
    pub additional_settings: Option<String>,
}

fn submission_not_found(id: &str) -> FlareError {
    FlareError::SubmissionNotFound { id: id.to_string() }
}

fn invalid(status: KeyStatus, action: &'static str) -> FlareError {
    FlareError::InvalidTransition {
        status: status.to_string(),
        action,
    }
}

impl Workflow {
    /// Issues an access key for a verified session.
    ///
    /// Idempotent: while the session's latest submission has not expired,
    /// that submission is returned instead of a new one.
    pub async fn issue_key(&self, session_id: &str) -> Result<KeySubmission, FlareError> {
        let session = self.find_session(session_id).await?;
        if !session.verified {
            return Err(FlareError::SessionNotVerified {
                session_id: session_id.to_string(),
            });
        }

        if let Some(existing) = self
            .storage
            .latest_key_submission_for_session(session_id)
            .await?
            .filter(|sub| sub.status != KeyStatus::Expired)
        {
            return Ok(existing);
        }

        let now = self.now();
        let submission = KeySubmission {
            id: new_id(),
            session_id: session.id,
            bot_name: self.settings.default_bot.clone(),
            access_key: token::access_key(),
            access_link: Some(self.settings.access_link.clone()),
            submitted_key: None,
            status: KeyStatus::Pending,
            admin_approval_time: None,
            game_access_time: None,
            next_intent_time: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_key_submission(&submission).await?;

        record_key_submission("issued");
        info!(
            submission_id = %submission.id,
            session_id,
            bot = %submission.bot_name,
            "access key issued"
        );
        Ok(submission)
    }

    /// Records an optional bot configuration, then issues the key.
    pub async fn request_access(
        &self,
        session_id: &str,
        config: Option<ConfigRequest>,
    ) -> Result<KeySubmission, FlareError> {
        if let Some(config) = config {
            self.record_config(
                session_id,
                &config.game,
                &config.mode,
                config.additional_settings.as_deref(),
            )
            .await?;
        }
        self.issue_key(session_id).await
    }

    pub async fn get_submission(&self, submission_id: &str) -> Result<KeySubmission, FlareError> {
        self.storage
            .get_key_submission(submission_id)
            .await?
            .ok_or_else(|| submission_not_found(submission_id))
    }

    /// Attaches an operator-provided access link.
    pub async fn provide_link(
        &self,
        admin: &ActiveAdmin,
        submission_id: &str,
        link: &str,
    ) -> Result<KeySubmission, FlareError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(FlareError::Validation("accessLink is required".into()));
        }

        let current = self.get_submission(submission_id).await?;
        if !current.status.accepts_submission() {
            return Err(invalid(current.status, "provide a link for"));
        }

        let updated = KeySubmission {
            access_link: Some(link.to_string()),
            status: KeyStatus::LinkProvided,
            updated_at: self.now(),
            ..current.clone()
        };
        self.transition(&updated, current.status, "provide a link for")
            .await?;

        record_key_submission("link_provided");
        info!(submission_id, admin = admin.username(), "access link provided");
        Ok(updated)
    }

    /// Compares the user's echoed key with the issued key.
    ///
    /// A mismatch moves the submission to `rejected` and fails with
    /// `KeyMismatch`; the user may retry. A match while another user holds
    /// the bot fails with `BotBusy` and leaves the submission untouched.
    pub async fn submit_key(
        &self,
        session_id: &str,
        submitted_key: &str,
    ) -> Result<KeySubmission, FlareError> {
        let current = self
            .storage
            .latest_key_submission_for_session(session_id)
            .await?
            .ok_or_else(|| submission_not_found(session_id))?;

        let matches = submitted_key == current.access_key;
        match current.status {
            KeyStatus::Accepted | KeyStatus::Granted if matches => return Ok(current),
            status if !status.accepts_submission() => {
                return Err(invalid(status, "submit a key for"));
            }
            _ => {}
        }

        let now = self.now();
        if !matches {
            let rejected = KeySubmission {
                submitted_key: Some(submitted_key.to_string()),
                status: KeyStatus::Rejected,
                updated_at: now,
                ..current.clone()
            };
            self.transition(&rejected, current.status, "submit a key for")
                .await?;
            record_key_submission("rejected");
            warn!(submission_id = %current.id, "submitted key does not match");
            return Err(FlareError::KeyMismatch);
        }

        let session = self.find_session(&current.session_id).await?;
        if let Some(holder) = self
            .lock
            .held_by_other(&current.bot_name, &session.external_account_name)
            .await?
        {
            record_key_submission("bot_busy");
            return Err(FlareError::BotBusy {
                bot_name: holder.bot_name,
                session_end: holder.session_end,
            });
        }

        let accepted = KeySubmission {
            submitted_key: Some(submitted_key.to_string()),
            status: KeyStatus::Accepted,
            updated_at: now,
            ..current.clone()
        };
        self.transition(&accepted, current.status, "submit a key for")
            .await?;

        record_key_submission("accepted");
        info!(submission_id = %accepted.id, "key accepted, awaiting admin approval");
        Ok(accepted)
    }

    /// Grants an accepted submission and claims the bot for its user.
    ///
    /// The bot is acquired first; if the status write then loses a race the
    /// bot is released again.
    pub async fn approve_key(
        &self,
        admin: &ActiveAdmin,
        submission_id: &str,
    ) -> Result<KeySubmission, FlareError> {
        let current = self.get_submission(submission_id).await?;
        if current.status != KeyStatus::Accepted {
            return Err(FlareError::NotAccepted {
                status: current.status.to_string(),
            });
        }

        let session = self.find_session(&current.session_id).await?;
        let held = self
            .lock
            .acquire(&current.bot_name, &session.external_account_name)
            .await?;

        let now = self.now();
        let granted = KeySubmission {
            status: KeyStatus::Granted,
            admin_approval_time: Some(now),
            game_access_time: held.session_start.or(Some(now)),
            next_intent_time: held.session_end.or(Some(now + self.settings.bot_session)),
            updated_at: now,
            ..current.clone()
        };

        let written = match self
            .storage
            .transition_key_submission(&granted, KeyStatus::Accepted)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                self.release_after_failed_grant(&current.bot_name).await;
                return Err(e);
            }
        };
        if !written {
            self.release_after_failed_grant(&current.bot_name).await;
            let status = self.get_submission(submission_id).await?.status;
            return Err(FlareError::NotAccepted {
                status: status.to_string(),
            });
        }

        record_key_submission("granted");
        info!(
            submission_id,
            admin = admin.username(),
            user = %session.external_account_name,
            bot = %current.bot_name,
            "key approved, bot session started"
        );
        Ok(granted)
    }

    /// Read-only status for polling clients. A granted submission whose
    /// window has passed is reported, and stored, as `expired`.
    pub async fn poll_status(&self, submission_id: &str) -> Result<KeySubmission, FlareError> {
        let current = self.get_submission(submission_id).await?;
        let now = self.now();
        let lapsed = current.status == KeyStatus::Granted
            && current.next_intent_time.is_some_and(|end| end <= now);
        if !lapsed {
            return Ok(current);
        }

        let expired = KeySubmission {
            status: KeyStatus::Expired,
            updated_at: now,
            ..current
        };
        if self
            .storage
            .transition_key_submission(&expired, KeyStatus::Granted)
            .await?
        {
            record_key_submission("expired");
            return Ok(expired);
        }
        self.get_submission(submission_id).await
    }

    /// Deletes a verification session with its configurations and keys.
    ///
    /// If the session's latest key is granted and its user still holds the
    /// bot, the bot is released too.
    pub async fn delete_submission(
        &self,
        admin: &ActiveAdmin,
        session_id: &str,
    ) -> Result<(), FlareError> {
        let session = self.find_session(session_id).await?;
        let granted_bot = self
            .storage
            .latest_key_submission_for_session(session_id)
            .await?
            .filter(|key| key.status == KeyStatus::Granted)
            .map(|key| key.bot_name);

        if !self.storage.delete_session_cascade(session_id).await? {
            return Err(FlareError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }
        info!(session_id, admin = admin.username(), "submission deleted");

        if let Some(bot_name) = granted_bot {
            let status = self.lock.status(&bot_name).await?;
            let user = &session.external_account_name;
            let held_by_user = status.is_held(self.now())
                && status
                    .current_user
                    .as_deref()
                    .is_some_and(|holder| holder.eq_ignore_ascii_case(user));
            if held_by_user {
                self.lock.release(&bot_name).await?;
                info!(session_id, bot = %bot_name, "bot released with deleted submission");
            }
        }
        Ok(())
    }

    /// Frees a bot on an operator's request.
    pub async fn release_bot(
        &self,
        admin: &ActiveAdmin,
        bot_name: &str,
    ) -> Result<BotStatus, FlareError> {
        let status = self.lock.release(bot_name).await?;
        info!(bot = bot_name, admin = admin.username(), "bot released by admin");
        Ok(status)
    }

    async fn transition(
        &self,
        updated: &KeySubmission,
        expected: KeyStatus,
        action: &'static str,
    ) -> Result<(), FlareError> {
        if self
            .storage
            .transition_key_submission(updated, expected)
            .await?
        {
            return Ok(());
        }
        let status = self.get_submission(&updated.id).await?.status;
        Err(invalid(status, action))
    }

    async fn release_after_failed_grant(&self, bot_name: &str) {
        if let Err(e) = self.lock.release(bot_name).await {
            warn!(bot = bot_name, error = %e, "failed to release bot after lost grant");
        }
    }
}
