// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use flaregate_config::model::StorageConfig;
use flaregate_core::types::{AdapterType, HealthStatus};
use flaregate_core::{
    Clock, FlareError, IdentityProvider, OperatorCredentials, PluginAdapter, StorageAdapter,
};
use flaregate_storage::SqliteStorage;

use crate::{Workflow, WorkflowSettings};

pub struct FakeClock(Mutex<DateTime<Utc>>);

impl FakeClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Accounts that exist, with their profile text. Lookups ignore case.
#[derive(Default)]
pub struct FakeIdentity {
    profiles: Mutex<HashMap<String, String>>,
    down: Mutex<bool>,
    verify_on_lookup: Mutex<Option<(Arc<SqliteStorage>, String)>>,
}

impl FakeIdentity {
    pub fn add(&self, name: &str, profile: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(name.to_lowercase(), profile.to_string());
    }

    /// Marks `session_id` verified during the next profile lookup, as a
    /// concurrent successful check would.
    pub fn verify_on_next_lookup(&self, storage: Arc<SqliteStorage>, session_id: &str) {
        *self.verify_on_lookup.lock().unwrap() = Some((storage, session_id.to_string()));
    }

    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    fn check_up(&self) -> Result<(), FlareError> {
        if *self.down.lock().unwrap() {
            return Err(FlareError::UpstreamUnavailable {
                message: "fake outage".into(),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FakeIdentity {
    fn name(&self) -> &str {
        "fake-identity"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Identity
    }

    async fn health_check(&self) -> Result<HealthStatus, FlareError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FlareError> {
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn account_exists(&self, name: &str) -> Result<bool, FlareError> {
        self.check_up()?;
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .contains_key(&name.to_lowercase()))
    }

    async fn profile_text(&self, name: &str) -> Result<Option<String>, FlareError> {
        self.check_up()?;
        let pending = self.verify_on_lookup.lock().unwrap().take();
        if let Some((storage, session_id)) = pending {
            storage.mark_session_verified(&session_id).await?;
        }
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .get(&name.to_lowercase())
            .cloned())
    }
}

/// Accepts exactly `root` / `hunter2`.
pub struct FakeOperators;

impl OperatorCredentials for FakeOperators {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == "root" && password == "hunter2"
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub struct Fixture {
    pub workflow: Arc<Workflow>,
    pub clock: Arc<FakeClock>,
    pub identity: Arc<FakeIdentity>,
    pub storage: Arc<SqliteStorage>,
    _dir: tempfile::TempDir,
}

pub async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: dir.path().join("wf.db").to_string_lossy().to_string(),
        wal_mode: true,
    }));
    storage.initialize().await.unwrap();
    storage
        .seed_bots(&["FlareBot_V1".to_string()], t0())
        .await
        .unwrap();

    let clock = Arc::new(FakeClock(Mutex::new(t0())));
    let identity = Arc::new(FakeIdentity::default());
    let workflow = Arc::new(Workflow::new(
        storage.clone(),
        identity.clone(),
        Arc::new(FakeOperators),
        clock.clone(),
        WorkflowSettings::default(),
    ));

    Fixture {
        workflow,
        clock,
        identity,
        storage,
        _dir: dir,
    }
}

/// Runs the user path up to a verified session for `name`. Returns the session id.
pub async fn verified_session(fx: &Fixture, name: &str) -> String {
    fx.identity.add(name, "");
    let session = fx.workflow.start_verification(name).await.unwrap();
    fx.identity.add(name, &format!("my profile {}", session.code));
    fx.workflow.check_verification(&session.id).await.unwrap();
    session.id
}
