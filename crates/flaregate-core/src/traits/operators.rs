// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator allowlist used by admin login.

/// Decides whether a username/password pair belongs to an operator.
pub trait OperatorCredentials: Send + Sync + 'static {
    fn verify(&self, username: &str, password: &str) -> bool;
}
