// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot exclusivity lock.
//!
//! Each named bot is free or held by exactly one user until its session
//! end. Acquire is a single conditional update in storage, so concurrent
//! callers are linearized there: one wins, the rest observe the holder.
//! A hold whose session end has passed counts as free, both for acquire
//! and for status reads.

use std::sync::Arc;

use chrono::Duration;
use flaregate_core::types::{AcquireOutcome, BotStatus};
use flaregate_core::{Clock, FlareError, StorageAdapter};
use flaregate_prometheus::{record_bot_lock, set_bots_in_use};
use tracing::{debug, info, warn};

pub struct BotLock {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    session_len: Duration,
}

fn not_found(bot_name: &str) -> FlareError {
    FlareError::BotNotFound {
        bot_name: bot_name.to_string(),
    }
}

impl BotLock {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        session_len: Duration,
    ) -> Self {
        Self {
            storage,
            clock,
            session_len,
        }
    }

    /// Current status. A lapsed hold is released in storage before returning.
    pub async fn status(&self, bot_name: &str) -> Result<BotStatus, FlareError> {
        let now = self.clock.now();
        let status = self
            .storage
            .get_bot_status(bot_name)
            .await?
            .ok_or_else(|| not_found(bot_name))?;

        if status.in_use && !status.is_held(now) {
            self.release_expired().await?;
            let refreshed = self
                .storage
                .get_bot_status(bot_name)
                .await?
                .ok_or_else(|| not_found(bot_name))?;
            return Ok(refreshed.observed_at(now));
        }
        Ok(status)
    }

    /// All bots, lapsed holds released first.
    pub async fn list(&self) -> Result<Vec<BotStatus>, FlareError> {
        let now = self.clock.now();
        let statuses = self.storage.list_bot_statuses().await?;
        if statuses.iter().any(|s| s.in_use && !s.is_held(now)) {
            self.release_expired().await?;
            let refreshed = self.storage.list_bot_statuses().await?;
            return Ok(refreshed.into_iter().map(|s| s.observed_at(now)).collect());
        }
        Ok(statuses)
    }

    /// Claims `bot_name` for `user` for one session window.
    ///
    /// Fails with `BotBusy` while anyone holds it, the same user included.
    pub async fn acquire(&self, bot_name: &str, user: &str) -> Result<BotStatus, FlareError> {
        let now = self.clock.now();
        let until = now + self.session_len;
        match self
            .storage
            .try_acquire_bot(bot_name, user, now, until)
            .await?
        {
            AcquireOutcome::Acquired(status) => {
                record_bot_lock("acquired");
                info!(bot = bot_name, user, session_end = %until, "bot acquired");
                self.refresh_gauge().await;
                Ok(status)
            }
            AcquireOutcome::Busy(status) => {
                record_bot_lock("busy");
                debug!(
                    bot = bot_name,
                    holder = status.current_user.as_deref().unwrap_or_default(),
                    "bot busy"
                );
                Err(FlareError::BotBusy {
                    bot_name: bot_name.to_string(),
                    session_end: status.session_end,
                })
            }
            AcquireOutcome::UnknownBot => Err(not_found(bot_name)),
        }
    }

    /// Frees the bot. Releasing a free bot is a no-op.
    pub async fn release(&self, bot_name: &str) -> Result<BotStatus, FlareError> {
        let status = self
            .storage
            .release_bot(bot_name, self.clock.now())
            .await?
            .ok_or_else(|| not_found(bot_name))?;
        record_bot_lock("released");
        info!(bot = bot_name, "bot released");
        self.refresh_gauge().await;
        Ok(status)
    }

    /// Releases every hold whose session has ended. Returns the freed names.
    pub async fn release_expired(&self) -> Result<Vec<String>, FlareError> {
        let released = self.storage.release_expired_bots(self.clock.now()).await?;
        for name in &released {
            record_bot_lock("expired");
            info!(bot = %name, "bot session expired, released");
        }
        if !released.is_empty() {
            self.refresh_gauge().await;
        }
        Ok(released)
    }

    /// The status of `bot_name` if someone other than `user` holds it right now.
    /// Holder names compare case-insensitively.
    pub async fn held_by_other(
        &self,
        bot_name: &str,
        user: &str,
    ) -> Result<Option<BotStatus>, FlareError> {
        let status = self.status(bot_name).await?;
        let own = status
            .current_user
            .as_deref()
            .is_some_and(|holder| holder.eq_ignore_ascii_case(user));
        let other = status.is_held(self.clock.now()) && !own;
        Ok(other.then_some(status))
    }

    async fn refresh_gauge(&self) {
        let now = self.clock.now();
        match self.storage.list_bot_statuses().await {
            Ok(statuses) => set_bots_in_use(statuses.iter().filter(|s| s.is_held(now)).count()),
            Err(e) => warn!(error = %e, "failed to refresh bots-in-use gauge"),
        }
    }
}
