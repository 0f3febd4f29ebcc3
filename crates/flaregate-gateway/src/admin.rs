// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin endpoints.
//!
//! Login and logout are open; every other handler here runs behind
//! [`require_admin`](crate::auth::require_admin) and receives the
//! [`ActiveAdmin`] it resolved.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use flaregate_core::FlareError;
use flaregate_core::types::{BotStatus, KeySubmission};
use flaregate_workflow::{ActiveAdmin, Dashboard};
use serde::{Deserialize, Serialize};

use crate::auth::bearer_token;
use crate::handlers::{ApiResult, SuccessResponse, required};
use crate::server::GatewayState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogoutRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvideLinkRequest {
    #[serde(default)]
    pub access_link: String,
}

/// Response body for POST /api/admin/login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    pub session_id: String,
    pub username: String,
}

/// Response body for GET /api/admin/check-auth.
#[derive(Debug, Serialize)]
pub struct CheckAuthResponse {
    pub valid: bool,
    pub username: String,
}

/// POST /api/admin/login
///
/// A successful login deactivates every earlier admin session.
pub async fn login(
    State(state): State<GatewayState>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> ApiResult<AdminLoginResponse> {
    let Json(body) = payload?;
    let username = required("username", &body.username)?;
    required("password", &body.password)?;
    let session = state.workflow.admin().login(username, &body.password).await?;
    Ok(Json(AdminLoginResponse {
        session_id: session.id,
        username: session.username,
    }))
}

/// POST /api/admin/logout
///
/// Takes the session id from the body, falling back to the bearer token.
/// Logging out an unknown or inactive session succeeds.
pub async fn logout(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    payload: Result<Json<AdminLogoutRequest>, JsonRejection>,
) -> ApiResult<SuccessResponse> {
    let from_body = payload
        .ok()
        .and_then(|Json(body)| body.session_id)
        .filter(|id| !id.trim().is_empty());
    let session_id = from_body
        .or_else(|| bearer_token(&headers).map(str::to_owned))
        .ok_or_else(|| FlareError::Validation("sessionId is required".to_string()))?;

    state.workflow.admin().logout(&session_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/admin/check-auth
pub async fn check_auth(Extension(admin): Extension<ActiveAdmin>) -> Json<CheckAuthResponse> {
    Json(CheckAuthResponse {
        valid: true,
        username: admin.username().to_string(),
    })
}

/// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<GatewayState>,
    Extension(admin): Extension<ActiveAdmin>,
) -> ApiResult<Dashboard> {
    Ok(Json(state.workflow.dashboard(&admin).await?))
}

/// POST /api/admin/provide-link/:keySubmissionId
pub async fn provide_link(
    State(state): State<GatewayState>,
    Extension(admin): Extension<ActiveAdmin>,
    Path(id): Path<String>,
    payload: Result<Json<ProvideLinkRequest>, JsonRejection>,
) -> ApiResult<SuccessResponse> {
    let Json(body) = payload?;
    let link = required("accessLink", &body.access_link)?;
    state.workflow.provide_link(&admin, &id, link).await?;
    Ok(Json(SuccessResponse::with_message("Access link provided to user")))
}

/// POST /api/admin/approve-key/:keySubmissionId
pub async fn approve_key(
    State(state): State<GatewayState>,
    Extension(admin): Extension<ActiveAdmin>,
    Path(id): Path<String>,
) -> ApiResult<KeySubmission> {
    Ok(Json(state.workflow.approve_key(&admin, &id).await?))
}

/// POST /api/admin/release-bot/:botName
pub async fn release_bot(
    State(state): State<GatewayState>,
    Extension(admin): Extension<ActiveAdmin>,
    Path(bot_name): Path<String>,
) -> ApiResult<BotStatus> {
    Ok(Json(state.workflow.release_bot(&admin, &bot_name).await?))
}

/// DELETE /api/admin/submission/:id
pub async fn delete_submission(
    State(state): State<GatewayState>,
    Extension(admin): Extension<ActiveAdmin>,
    Path(id): Path<String>,
) -> ApiResult<SuccessResponse> {
    state.workflow.delete_submission(&admin, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}
