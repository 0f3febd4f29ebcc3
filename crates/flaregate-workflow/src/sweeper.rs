// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic expiry sweep.
//!
//! Lazy expiry on read already keeps answers correct; the sweep makes sure
//! storage catches up even when nobody reads. Each pass releases lapsed bot
//! holds, expires granted submissions past their window, and purges stale
//! unverified sessions.

use std::sync::Arc;
use std::time::Duration;

use flaregate_core::FlareError;
use flaregate_core::types::SweepReport;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::Workflow;

pub struct Sweeper {
    workflow: Arc<Workflow>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(workflow: Arc<Workflow>, interval: Duration) -> Self {
        Self { workflow, interval }
    }

    /// Runs one pass.
    pub async fn sweep_once(&self) -> Result<SweepReport, FlareError> {
        let workflow = &self.workflow;
        let now = workflow.now();

        let released_bots = workflow.lock().release_expired().await?.len();
        let expired_submissions = workflow.storage.expire_granted_submissions(now).await?;
        let purged_sessions = workflow
            .storage
            .purge_stale_sessions(now - workflow.settings.session_retention)
            .await?;

        let report = SweepReport {
            released_bots,
            expired_submissions,
            purged_sessions,
        };
        if report != SweepReport::default() {
            info!(released_bots, expired_submissions, purged_sessions, "expiry sweep");
        }
        Ok(report)
    }

    /// Sweeps every interval until `cancel` fires. A failed pass is logged
    /// and retried on the next tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper running");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!(error = %e, "expiry sweep failed");
                    }
                }
                _ = cancel.cancelled() => {
                    debug!("expiry sweeper stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use flaregate_core::StorageAdapter;
    use flaregate_core::types::KeyStatus;

    use super::*;
    use crate::test_support::{fixture, verified_session};

    #[tokio::test]
    async fn sweep_releases_expires_and_purges() {
        let fx = fixture().await;
        let login = fx.workflow.admin().login("root", "hunter2").await.unwrap();
        let admin = fx
            .workflow
            .admin()
            .require_active_admin(&login.id)
            .await
            .unwrap();

        let session_id = verified_session(&fx, "alice").await;
        let issued = fx.workflow.issue_key(&session_id).await.unwrap();
        fx.workflow
            .submit_key(&session_id, &issued.access_key)
            .await
            .unwrap();
        fx.workflow.approve_key(&admin, &issued.id).await.unwrap();

        fx.identity.add("bob", "");
        let abandoned = fx.workflow.start_verification("bob").await.unwrap();

        let sweeper = Sweeper::new(fx.workflow.clone(), Duration::from_secs(30));
        assert_eq!(sweeper.sweep_once().await.unwrap(), SweepReport::default());

        fx.clock.advance(ChronoDuration::days(2));
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                released_bots: 1,
                expired_submissions: 1,
                purged_sessions: 1,
            }
        );

        let bot = fx.storage.get_bot_status("FlareBot_V1").await.unwrap().unwrap();
        assert!(!bot.in_use);
        let sub = fx.storage.get_key_submission(&issued.id).await.unwrap().unwrap();
        assert_eq!(sub.status, KeyStatus::Expired);
        assert!(
            fx.storage
                .get_verification_session(&abandoned.id)
                .await
                .unwrap()
                .is_none()
        );
        // Verified sessions with follow-up are kept.
        assert!(
            fx.storage
                .get_verification_session(&session_id)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let fx = fixture().await;
        let sweeper = Sweeper::new(fx.workflow.clone(), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sweeper.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(30)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
