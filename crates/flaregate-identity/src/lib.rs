// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External identity provider adapter for Flaregate.
//!
//! [`RobloxIdentity`] implements [`IdentityProvider`] over the Roblox users
//! API. Existence answers are cached, and outbound calls are limited to a
//! per-minute budget. When the budget is spent and no cached answer exists
//! the lookup fails with `UpstreamUnavailable`; it never guesses.

pub mod client;
pub mod types;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use flaregate_config::model::IdentityConfig;
use flaregate_core::error::FlareError;
use flaregate_core::traits::{IdentityProvider, PluginAdapter};
use flaregate_core::types::{AdapterType, HealthStatus};
use tracing::{debug, info, warn};

use crate::client::RobloxClient;

const BUDGET_WINDOW: Duration = Duration::from_secs(60);

/// Roblox-backed identity provider.
pub struct RobloxIdentity {
    client: RobloxClient,
    cache: DashMap<String, CachedExistence>,
    cache_ttl: Duration,
    budget: CallBudget,
}

#[derive(Debug, Clone, Copy)]
struct CachedExistence {
    exists: bool,
    at: Instant,
}

/// Sliding one-minute window of outbound call timestamps.
struct CallBudget {
    max_calls: usize,
    calls: Mutex<VecDeque<Instant>>,
}

impl CallBudget {
    fn new(max_calls: u32) -> Self {
        Self {
            max_calls: max_calls as usize,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Reserves `n` calls if they fit in the current window.
    fn try_take(&self, n: usize) -> bool {
        let now = Instant::now();
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        while calls
            .front()
            .is_some_and(|t| now.duration_since(*t) >= BUDGET_WINDOW)
        {
            calls.pop_front();
        }
        if calls.len() + n > self.max_calls {
            return false;
        }
        calls.extend(std::iter::repeat_n(now, n));
        true
    }

    fn remaining(&self) -> usize {
        let now = Instant::now();
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        let used = calls
            .iter()
            .filter(|t| now.duration_since(**t) < BUDGET_WINDOW)
            .count();
        self.max_calls.saturating_sub(used)
    }
}

fn budget_exhausted() -> FlareError {
    FlareError::UpstreamUnavailable {
        message: "identity provider call budget exhausted, retry shortly".into(),
        source: None,
    }
}

impl RobloxIdentity {
    pub fn new(config: &IdentityConfig) -> Result<Self, FlareError> {
        let client = RobloxClient::new(
            &config.users_base_url,
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %config.users_base_url, "identity provider initialized");
        Ok(Self::with_client(
            client,
            Duration::from_secs(config.cache_ttl_secs),
            config.max_calls_per_minute,
        ))
    }

    fn with_client(client: RobloxClient, cache_ttl: Duration, max_calls_per_minute: u32) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            cache_ttl,
            budget: CallBudget::new(max_calls_per_minute),
        }
    }

    fn cache_key(name: &str) -> String {
        name.to_lowercase()
    }

    fn cached(&self, name: &str) -> Option<bool> {
        let key = Self::cache_key(name);
        let entry = *self.cache.get(&key)?;
        if entry.at.elapsed() < self.cache_ttl {
            Some(entry.exists)
        } else {
            self.cache.remove(&key);
            None
        }
    }

    fn remember(&self, name: &str, exists: bool) {
        self.cache.insert(
            Self::cache_key(name),
            CachedExistence {
                exists,
                at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl PluginAdapter for RobloxIdentity {
    fn name(&self) -> &str {
        "roblox"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, FlareError> {
        // No upstream request here: it would spend the call budget.
        if self.budget.remaining() == 0 {
            Ok(HealthStatus::Degraded("call budget exhausted".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), FlareError> {
        self.cache.clear();
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for RobloxIdentity {
    async fn account_exists(&self, name: &str) -> Result<bool, FlareError> {
        if let Some(exists) = self.cached(name) {
            debug!(username = name, exists, "identity cache hit");
            return Ok(exists);
        }
        if !self.budget.try_take(1) {
            warn!(username = name, "identity call budget exhausted");
            return Err(budget_exhausted());
        }

        let exists = self.client.lookup_user_id(name, true).await?.is_some();
        self.remember(name, exists);
        Ok(exists)
    }

    async fn profile_text(&self, name: &str) -> Result<Option<String>, FlareError> {
        // lookup + profile fetch
        if !self.budget.try_take(2) {
            warn!(username = name, "identity call budget exhausted");
            return Err(budget_exhausted());
        }

        let Some(user_id) = self.client.lookup_user_id(name, false).await? else {
            return Ok(None);
        };
        let description = self.client.profile_description(user_id).await?;
        Ok(Some(description))
    }
}
