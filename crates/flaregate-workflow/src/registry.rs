// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Submission registry behind the admin dashboard.

use chrono::{DateTime, Utc};
use flaregate_core::FlareError;
use flaregate_core::types::{
    DashboardStats, KeyStatus, SubmissionRecord, SubmissionStatus, SubmissionSummary,
};
use serde::Serialize;

use crate::Workflow;
use crate::admin::ActiveAdmin;

/// Number of submissions returned with the dashboard.
pub const DASHBOARD_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub submissions: Vec<SubmissionSummary>,
}

/// Verified sessions are verified; unverified ones fail once expired or
/// locked and are pending otherwise.
pub fn submission_status(record: &SubmissionRecord, now: DateTime<Utc>) -> SubmissionStatus {
    let session = &record.session;
    if session.verified {
        SubmissionStatus::Verified
    } else if session.is_expired(now) || session.is_locked(now) {
        SubmissionStatus::Failed
    } else {
        SubmissionStatus::Pending
    }
}

fn summarize(record: SubmissionRecord, now: DateTime<Utc>) -> SubmissionSummary {
    let status = submission_status(&record, now);
    let SubmissionRecord {
        session,
        latest_config,
        latest_key,
    } = record;
    let (game, mode, additional_settings) = match latest_config {
        Some(c) => (Some(c.game), Some(c.mode), c.additional_settings),
        None => (None, None, None),
    };

    SubmissionSummary {
        id: session.id,
        roblox_username: session.external_account_name,
        verification_code: session.code,
        is_verified: session.verified,
        game,
        mode,
        additional_settings,
        key_submission_id: latest_key.as_ref().map(|k| k.id.clone()),
        submitted_key: latest_key.as_ref().and_then(|k| k.submitted_key.clone()),
        access_key: latest_key.as_ref().map(|k| k.access_key.clone()),
        key_status: latest_key.as_ref().map(|k| k.status),
        session_start_time: latest_key.as_ref().and_then(|k| k.game_access_time),
        session_end_time: latest_key.as_ref().and_then(|k| k.next_intent_time),
        created_at: session.created_at,
        status,
    }
}

/// Derives the counters over every record and keeps the newest `limit` rows.
pub fn build_dashboard(
    records: Vec<SubmissionRecord>,
    now: DateTime<Utc>,
    limit: usize,
) -> Dashboard {
    let mut stats = DashboardStats {
        total_submissions: records.len(),
        ..DashboardStats::default()
    };
    for record in &records {
        match submission_status(record, now) {
            SubmissionStatus::Verified => stats.active_users += 1,
            SubmissionStatus::Pending => stats.pending_verifications += 1,
            SubmissionStatus::Failed => stats.failed_verifications += 1,
        }
        if record.latest_config.is_some() {
            stats.bot_configs += 1;
        }
        if record
            .latest_key
            .as_ref()
            .is_some_and(|k| k.status == KeyStatus::Accepted)
        {
            stats.awaiting_approval += 1;
        }
    }

    let submissions = records
        .into_iter()
        .take(limit)
        .map(|r| summarize(r, now))
        .collect();
    Dashboard { stats, submissions }
}

impl Workflow {
    /// Newest submissions first, with aggregate counters over all of them.
    pub async fn dashboard(&self, _admin: &ActiveAdmin) -> Result<Dashboard, FlareError> {
        let records = self.storage.list_submission_records().await?;
        Ok(build_dashboard(records, self.now(), DASHBOARD_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use flaregate_core::types::VerificationSession;

    use super::*;
    use crate::test_support::{fixture, t0, verified_session};

    fn record(id: &str, verified: bool, expires_in: Duration) -> SubmissionRecord {
        SubmissionRecord {
            session: VerificationSession {
                id: id.into(),
                external_account_name: format!("user-{id}"),
                code: "Verify_AAAAAAAA".into(),
                verified,
                attempts: 0,
                locked_until: None,
                expires_at: t0() + expires_in,
                created_at: t0(),
            },
            latest_config: None,
            latest_key: None,
        }
    }

    #[test]
    fn status_is_derived_from_session() {
        let now = t0();
        assert_eq!(
            submission_status(&record("a", true, Duration::minutes(-1)), now),
            SubmissionStatus::Verified
        );
        assert_eq!(
            submission_status(&record("b", false, Duration::minutes(5)), now),
            SubmissionStatus::Pending
        );
        assert_eq!(
            submission_status(&record("c", false, Duration::minutes(-5)), now),
            SubmissionStatus::Failed
        );
    }

    #[test]
    fn stats_cover_all_rows_but_list_is_limited() {
        let records = (0..25)
            .map(|i| record(&i.to_string(), i % 2 == 0, Duration::minutes(5)))
            .collect();
        let dashboard = build_dashboard(records, t0(), DASHBOARD_LIMIT);
        assert_eq!(dashboard.stats.total_submissions, 25);
        assert_eq!(dashboard.stats.active_users, 13);
        assert_eq!(dashboard.stats.pending_verifications, 12);
        assert_eq!(dashboard.submissions.len(), 20);
        assert_eq!(dashboard.submissions[0].id, "0");
    }

    #[tokio::test]
    async fn dashboard_reflects_key_progress() {
        let fx = fixture().await;
        let login = fx.workflow.admin().login("root", "hunter2").await.unwrap();
        let admin = fx
            .workflow
            .admin()
            .require_active_admin(&login.id)
            .await
            .unwrap();

        let session_id = verified_session(&fx, "alice").await;
        fx.workflow
            .record_config(&session_id, "Arsenal", "Aim", None)
            .await
            .unwrap();
        let issued = fx.workflow.issue_key(&session_id).await.unwrap();
        fx.workflow
            .submit_key(&session_id, &issued.access_key)
            .await
            .unwrap();

        let dashboard = fx.workflow.dashboard(&admin).await.unwrap();
        assert_eq!(dashboard.stats.awaiting_approval, 1);
        assert_eq!(dashboard.stats.bot_configs, 1);
        let row = &dashboard.submissions[0];
        assert_eq!(row.roblox_username, "alice");
        assert_eq!(row.game.as_deref(), Some("Arsenal"));
        assert_eq!(row.key_status, Some(KeyStatus::Accepted));
        assert_eq!(row.access_key.as_deref(), Some(issued.access_key.as_str()));
    }
}
