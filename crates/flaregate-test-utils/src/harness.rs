// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete workflow stack with a mock identity
//! provider, a manual clock, a temp SQLite database, and one configured
//! operator. Helpers drive the common paths (verify a user, log in as
//! admin) so tests can start from the state they care about.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use flaregate_config::model::{AdminConfig, OperatorConfig, StorageConfig};
use flaregate_core::types::{AdminSession, VerificationSession};
use flaregate_core::{Clock, FlareError, StorageAdapter};
use flaregate_storage::SqliteStorage;
use flaregate_workflow::credentials::hash_password;
use flaregate_workflow::{ActiveAdmin, OperatorAllowlist, Workflow, WorkflowSettings};

use crate::clock::ManualClock;
use crate::mock_identity::MockIdentityProvider;

/// Username of the operator every harness is configured with.
pub const ADMIN_USERNAME: &str = "operator";
/// Password of [`ADMIN_USERNAME`].
pub const ADMIN_PASSWORD: &str = "Operator-Passw0rd";

/// Hashing is slow in debug builds; one hash serves every harness in the process.
fn admin_hash() -> Result<String, FlareError> {
    static HASH: OnceLock<String> = OnceLock::new();
    if let Some(hash) = HASH.get() {
        return Ok(hash.clone());
    }
    let hash = hash_password(ADMIN_PASSWORD)?;
    Ok(HASH.get_or_init(|| hash).clone())
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    bots: Vec<String>,
    settings: WorkflowSettings,
    start: Option<DateTime<Utc>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let settings = WorkflowSettings::default();
        Self {
            bots: vec![settings.default_bot.clone()],
            settings,
            start: None,
        }
    }

    /// Bots seeded into storage. The first becomes the default bot.
    pub fn with_bots(mut self, bots: &[&str]) -> Self {
        self.bots = bots.iter().map(|b| b.to_string()).collect();
        if let Some(first) = self.bots.first() {
            self.settings.default_bot = first.clone();
        }
        self
    }

    /// Override workflow timings and names.
    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start the manual clock at `at` instead of the default instant.
    pub fn starting_at(mut self, at: DateTime<Utc>) -> Self {
        self.start = Some(at);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, FlareError> {
        // Create temp directory for SQLite
        let temp_dir = tempfile::TempDir::new().map_err(FlareError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        storage.initialize().await?;

        let clock = Arc::new(match self.start {
            Some(at) => ManualClock::new(at),
            None => ManualClock::default(),
        });
        storage.seed_bots(&self.bots, clock.now()).await?;

        let operators = OperatorAllowlist::from_config(&AdminConfig {
            operators: vec![OperatorConfig {
                username: ADMIN_USERNAME.to_string(),
                password_hash: admin_hash()?,
            }],
        });

        let identity = Arc::new(MockIdentityProvider::new());
        let workflow = Arc::new(Workflow::new(
            storage.clone(),
            identity.clone(),
            Arc::new(operators),
            clock.clone(),
            self.settings,
        ));

        Ok(TestHarness {
            workflow,
            storage,
            clock,
            identity,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The workflow under test.
    pub workflow: Arc<Workflow>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    /// Clock read by every time decision in the workflow.
    pub clock: Arc<ManualClock>,
    /// The mock identity provider.
    pub identity: Arc<MockIdentityProvider>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings and the default bot.
    pub async fn new() -> Result<Self, FlareError> {
        Self::builder().build().await
    }

    /// Registers `name`, opens a session, publishes its code on the mock
    /// profile, and checks it. Returns the verified session.
    pub async fn verified_session(&self, name: &str) -> Result<VerificationSession, FlareError> {
        self.identity.add_account(name).await;
        let session = self.workflow.start_verification(name).await?;
        self.publish_code(&session).await;
        self.workflow.check_verification(&session.id).await
    }

    /// Puts the session's code into the account's mock profile.
    pub async fn publish_code(&self, session: &VerificationSession) {
        self.identity
            .set_profile(
                &session.external_account_name,
                &format!("Hi! {} :)", session.code),
            )
            .await;
    }

    /// Logs the configured operator in and returns the session with its proof.
    pub async fn admin_login(&self) -> Result<(AdminSession, ActiveAdmin), FlareError> {
        let admin = self.workflow.admin();
        let session = admin.login(ADMIN_USERNAME, ADMIN_PASSWORD).await?;
        let active = admin.require_active_admin(&session.id).await?;
        Ok((session, active))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::new().await.unwrap();
        let bots = harness.storage.list_bot_statuses().await.unwrap();
        assert_eq!(bots.len(), 1);
        assert_eq!(bots[0].bot_name, "FlareBot_V1");
        assert!(!bots[0].in_use);
    }

    #[tokio::test]
    async fn with_bots_seeds_each_and_sets_default() {
        let harness = TestHarness::builder()
            .with_bots(&["Alpha", "Beta"])
            .build()
            .await
            .unwrap();
        let bots = harness.storage.list_bot_statuses().await.unwrap();
        assert_eq!(bots.len(), 2);
        assert_eq!(harness.workflow.settings().default_bot, "Alpha");
    }

    #[tokio::test]
    async fn verified_session_helper_verifies() {
        let harness = TestHarness::new().await.unwrap();
        let session = harness.verified_session("alice").await.unwrap();
        assert!(session.verified);
        assert_eq!(session.attempts, 0);
    }

    #[tokio::test]
    async fn admin_login_helper_yields_active_admin() {
        let harness = TestHarness::new().await.unwrap();
        let (session, active) = harness.admin_login().await.unwrap();
        assert_eq!(session.username, ADMIN_USERNAME);
        assert_eq!(active.session_id(), session.id);
    }

    #[tokio::test]
    async fn clock_drives_workflow_time() {
        let harness = TestHarness::new().await.unwrap();
        harness.identity.add_account("alice").await;
        let session = harness.workflow.start_verification("alice").await.unwrap();

        harness.clock.advance(Duration::minutes(11));
        let err = harness.workflow.get_session(&session.id).await.unwrap_err();
        assert!(matches!(err, FlareError::SessionExpired { .. }));
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::new().await.unwrap();
        let h2 = TestHarness::new().await.unwrap();

        h1.verified_session("alice").await.unwrap();
        let s1 = h1.storage.list_submission_records().await.unwrap();
        let s2 = h2.storage.list_submission_records().await.unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(s2.len(), 0);
    }
}
