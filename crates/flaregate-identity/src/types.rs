// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the users API.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/usernames/users`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernamesRequest<'a> {
    pub usernames: [&'a str; 1],
    pub exclude_banned_users: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsernamesResponse {
    #[serde(default)]
    pub data: Vec<UsernameMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameMatch {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub requested_username: Option<String>,
}

/// Subset of `GET /v1/users/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
}
