// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin session guard.
//!
//! At most one admin session is active at a time: logging in deactivates
//! every earlier session. Admin-only workflow operations take an
//! [`ActiveAdmin`], which can only be obtained from
//! [`AdminGuard::require_active_admin`].

use std::sync::Arc;

use flaregate_core::types::AdminSession;
use flaregate_core::{Clock, FlareError, OperatorCredentials, StorageAdapter};
use tracing::{info, warn};

use crate::credentials::blocking;
use crate::new_id;

/// Proof that a request carried an active admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAdmin {
    session_id: String,
    username: String,
}

impl ActiveAdmin {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

pub struct AdminGuard {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    operators: Arc<dyn OperatorCredentials + Send + Sync>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AdminGuard {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        operators: Arc<dyn OperatorCredentials + Send + Sync>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            storage,
            operators,
            clock,
        }
    }

    /// Checks operator credentials and opens the single active admin session.
    pub async fn login(&self, username: &str, password: &str) -> Result<AdminSession, FlareError> {
        let operators = self.operators.clone();
        let (user, pass) = (username.to_string(), password.to_string());
        if !blocking(move || operators.verify(&user, &pass)).await? {
            warn!(username, "admin login rejected");
            return Err(FlareError::Unauthorized("invalid credentials".into()));
        }

        let session = AdminSession {
            id: new_id(),
            username: username.to_string(),
            active: true,
            created_at: self.clock.now(),
        };
        self.storage.create_admin_session(&session).await?;

        info!(username, "admin logged in, earlier sessions deactivated");
        Ok(session)
    }

    /// Deactivates the session. Unknown or already inactive ids are a no-op.
    pub async fn logout(&self, session_id: &str) -> Result<(), FlareError> {
        if self.storage.deactivate_admin_session(session_id).await? {
            info!("admin logged out");
        }
        Ok(())
    }

    /// Fails with `Unauthorized` unless `session_id` names an active admin session.
    pub async fn require_active_admin(&self, session_id: &str) -> Result<ActiveAdmin, FlareError> {
        match self.storage.get_admin_session(session_id).await? {
            Some(session) if session.active => Ok(ActiveAdmin {
                session_id: session.id,
                username: session.username,
            }),
            Some(_) => Err(FlareError::Unauthorized("admin session is no longer active".into())),
            None => Err(FlareError::Unauthorized("unknown admin session".into())),
        }
    }
}
