// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verification and access workflow for Flaregate.
//!
//! The [`Workflow`] is the central coordinator that:
//! - Issues verification codes and checks them against external profiles
//! - Attaches passwords to verified accounts
//! - Records bot configurations
//! - Issues access keys and walks them through admin approval
//! - Owns the [`BotLock`] and [`AdminGuard`]
//!
//! Every time decision reads the injected [`Clock`], never the wall clock.

pub mod admin;
pub mod bot_config;
pub mod bot_lock;
pub mod credentials;
pub mod keys;
pub mod operators;
pub mod registry;
pub mod settings;
pub mod shutdown;
pub mod sweeper;
pub mod verification;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flaregate_core::{Clock, IdentityProvider, OperatorCredentials, StorageAdapter};

pub use admin::{ActiveAdmin, AdminGuard};
pub use bot_lock::BotLock;
pub use keys::ConfigRequest;
pub use operators::OperatorAllowlist;
pub use registry::Dashboard;
pub use settings::WorkflowSettings;
pub use sweeper::Sweeper;
pub use verification::AccountCheck;

/// Coordinates every user-facing and admin-facing operation.
///
/// Cheap to share behind an `Arc`; all state lives in storage.
pub struct Workflow {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    identity: Arc<dyn IdentityProvider + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
    settings: WorkflowSettings,
    lock: BotLock,
    admin: AdminGuard,
}

impl Workflow {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        identity: Arc<dyn IdentityProvider + Send + Sync>,
        operators: Arc<dyn OperatorCredentials + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
        settings: WorkflowSettings,
    ) -> Self {
        let lock = BotLock::new(storage.clone(), clock.clone(), settings.bot_session);
        let admin = AdminGuard::new(storage.clone(), operators, clock.clone());
        Self {
            storage,
            identity,
            clock,
            settings,
            lock,
            admin,
        }
    }

    pub fn lock(&self) -> &BotLock {
        &self.lock
    }

    pub fn admin(&self) -> &AdminGuard {
        &self.admin
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter + Send + Sync> {
        &self.storage
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider + Send + Sync> {
        &self.identity
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
