// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External identity provider whose public profiles carry verification codes.

use async_trait::async_trait;

use crate::error::FlareError;
use crate::traits::adapter::PluginAdapter;

/// Looks up external accounts and their public profile text.
///
/// Implementations must return [`FlareError::UpstreamUnavailable`] when the
/// provider cannot answer. An unreachable provider is never reported as
/// "account exists" or "account missing".
#[async_trait]
pub trait IdentityProvider: PluginAdapter {
    /// Returns whether an account with this name exists.
    async fn account_exists(&self, name: &str) -> Result<bool, FlareError>;

    /// Returns the public profile text of the account, or `None` if the
    /// account does not exist.
    async fn profile_text(&self, name: &str) -> Result<Option<String>, FlareError>;
}
