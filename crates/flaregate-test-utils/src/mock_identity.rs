// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock identity provider for deterministic testing.
//!
//! `MockIdentityProvider` implements `IdentityProvider` over an in-memory
//! map of account names to profile text, enabling verification tests
//! without calls to the real users API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use flaregate_core::types::{AdapterType, HealthStatus};
use flaregate_core::{FlareError, IdentityProvider, PluginAdapter};

/// An identity provider backed by a map of account name to profile text.
///
/// Lookups are case-insensitive, like the real provider. While
/// [`set_unavailable`](Self::set_unavailable) is on, every call fails with
/// `UpstreamUnavailable`.
#[derive(Default)]
pub struct MockIdentityProvider {
    profiles: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with an empty profile.
    pub async fn add_account(&self, name: &str) {
        self.profiles
            .lock()
            .await
            .entry(name.to_lowercase())
            .or_default();
    }

    /// Replaces the profile text of an account, registering it if needed.
    pub async fn set_profile(&self, name: &str, text: &str) {
        self.profiles
            .lock()
            .await
            .insert(name.to_lowercase(), text.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of lookups served so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), FlareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FlareError::UpstreamUnavailable {
                message: "mock identity provider unavailable".to_string(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockIdentityProvider {
    fn name(&self) -> &str {
        "mock-identity"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, FlareError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("mock outage".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), FlareError> {
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn account_exists(&self, name: &str) -> Result<bool, FlareError> {
        self.enter()?;
        Ok(self
            .profiles
            .lock()
            .await
            .contains_key(&name.to_lowercase()))
    }

    async fn profile_text(&self, name: &str) -> Result<Option<String>, FlareError> {
        self.enter()?;
        Ok(self.profiles.lock().await.get(&name.to_lowercase()).cloned())
    }
}
