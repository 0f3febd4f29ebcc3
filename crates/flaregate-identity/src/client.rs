// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Roblox users API.
//!
//! Every non-success status, transport failure, or unparseable body is an
//! [`FlareError::UpstreamUnavailable`]. Only an explicit empty match list
//! means "no such account".

use std::time::Duration;

use flaregate_core::FlareError;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{UserProfile, UsernamesRequest, UsernamesResponse};

/// Thin client over the two endpoints the verification gate needs.
#[derive(Debug, Clone)]
pub struct RobloxClient {
    client: reqwest::Client,
    base_url: String,
}

impl RobloxClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, FlareError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| FlareError::Config(format!("invalid identity.user_agent: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FlareError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolves a username to a user id. `Ok(None)` when the API reports no match.
    pub async fn lookup_user_id(
        &self,
        username: &str,
        exclude_banned: bool,
    ) -> Result<Option<u64>, FlareError> {
        let url = format!("{}/v1/usernames/users", self.base_url);
        let request = self.client.post(&url).json(&UsernamesRequest {
            usernames: [username],
            exclude_banned_users: exclude_banned,
        });
        let response: UsernamesResponse = send_json(request, "username lookup").await?;
        let id = response.data.first().map(|m| m.id);
        debug!(username, found = id.is_some(), "username lookup complete");
        Ok(id)
    }

    /// Public profile description of a user id. A missing description reads as empty.
    pub async fn profile_description(&self, user_id: u64) -> Result<String, FlareError> {
        let url = format!("{}/v1/users/{user_id}", self.base_url);
        let profile: UserProfile = send_json(self.client.get(&url), "profile fetch").await?;
        Ok(profile.description.unwrap_or_default())
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    what: &str,
) -> Result<T, FlareError> {
    let response = request.send().await.map_err(|e| {
        warn!(error = %e, "{what} request failed");
        FlareError::UpstreamUnavailable {
            message: format!("{what} request failed: {e}"),
            source: Some(Box::new(e)),
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(status = %status, "{what} returned an error status");
        return Err(FlareError::UpstreamUnavailable {
            message: format!("{what} returned {status}"),
            source: None,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| FlareError::UpstreamUnavailable {
            message: format!("failed to read {what} response: {e}"),
            source: Some(Box::new(e)),
        })?;
    serde_json::from_str(&body).map_err(|e| FlareError::UpstreamUnavailable {
        message: format!("failed to parse {what} response: {e}"),
        source: Some(Box::new(e)),
    })
}
