// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator allowlist from `[admin].operators`.

use std::collections::HashMap;

use flaregate_config::model::AdminConfig;
use flaregate_core::OperatorCredentials;

use crate::credentials::verify_password;

/// Usernames mapped to Argon2 PHC hashes.
pub struct OperatorAllowlist {
    operators: HashMap<String, String>,
}

impl OperatorAllowlist {
    pub fn from_config(config: &AdminConfig) -> Self {
        Self {
            operators: config
                .operators
                .iter()
                .map(|op| (op.username.clone(), op.password_hash.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl OperatorCredentials for OperatorAllowlist {
    fn verify(&self, username: &str, password: &str) -> bool {
        self.operators
            .get(username)
            .is_some_and(|hash| verify_password(password, hash))
    }
}
