// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the user-facing REST API.
//!
//! Handles the verification flow, password login, bot configuration, bot
//! status, and key issuance endpoints, plus the unauthenticated health,
//! ping, and metrics routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use flaregate_core::FlareError;
use flaregate_core::types::{
    BotConfiguration, BotStatus, HealthStatus, KeyStatus, KeySubmission, VerificationSession,
};
use flaregate_workflow::{AccountCheck, ConfigRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Rejects a missing or blank request field.
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FlareError::Validation(format!("{field} is required")).into());
    }
    Ok(value)
}

/// Request body carrying only an account name.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameRequest {
    #[serde(default)]
    pub roblox_username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub roblox_username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfigRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub game: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub additional_settings: Option<String>,
}

/// Access request; the configuration fields are optional and recorded
/// only when both `game` and `mode` are present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub game: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub additional_settings: Option<String>,
}

impl AccessRequest {
    fn config(&self) -> Option<ConfigRequest> {
        match (self.game.as_deref(), self.mode.as_deref()) {
            (Some(game), Some(mode)) => Some(ConfigRequest {
                game: game.to_string(),
                mode: mode.to_string(),
                additional_settings: self.additional_settings.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitKeyRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub submitted_key: String,
}

/// Response body for POST /api/verify-username.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStarted {
    pub session_id: String,
    pub verification_code: String,
    pub expires_at: DateTime<Utc>,
    pub roblox_username: String,
}

impl From<VerificationSession> for VerificationStarted {
    fn from(session: VerificationSession) -> Self {
        Self {
            session_id: session.id,
            verification_code: session.code,
            expires_at: session.expires_at,
            roblox_username: session.external_account_name,
        }
    }
}

/// Response body for POST /api/login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub session: VerificationStarted,
    pub is_verified: bool,
    pub skip_verification: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
        }
    }
}

/// Response body for POST /api/request-access.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub success: bool,
    pub message: String,
    pub key_submission_id: String,
    pub status: KeyStatus,
}

/// Response body for POST /api/generate-link/:sessionId.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLink {
    pub access_link: Option<String>,
    pub access_key: String,
    pub key_submission_id: String,
}

/// Response body for POST /api/submit-key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitKeyResponse {
    pub success: bool,
    pub status: KeyStatus,
    pub message: String,
    pub key_submission_id: String,
}

/// Response body for GET /api/key-status/:keySubmissionId.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusResponse {
    pub status: KeyStatus,
    pub game_access_time: Option<DateTime<Utc>>,
    pub next_intent_time: Option<DateTime<Utc>>,
}

impl From<KeySubmission> for KeyStatusResponse {
    fn from(sub: KeySubmission) -> Self {
        Self {
            status: sub.status,
            game_access_time: sub.game_access_time,
            next_intent_time: sub.next_intent_time,
        }
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` when every adapter is healthy, `degraded` otherwise.
    pub status: String,
    /// Binary version.
    pub version: String,
    pub uptime_secs: u64,
    /// Adapter name to reported health.
    pub adapters: BTreeMap<String, String>,
}

/// POST /api/check-user
pub async fn check_user(
    State(state): State<GatewayState>,
    payload: Result<Json<UsernameRequest>, JsonRejection>,
) -> ApiResult<AccountCheck> {
    let Json(body) = payload?;
    let check = state.workflow.check_user(&body.roblox_username).await?;
    Ok(Json(check))
}

/// POST /api/login
pub async fn login(
    State(state): State<GatewayState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(body) = payload?;
    required("password", &body.password)?;
    let session = state
        .workflow
        .login_with_password(&body.roblox_username, &body.password)
        .await?;
    Ok(Json(LoginResponse {
        is_verified: session.verified,
        skip_verification: true,
        session: session.into(),
    }))
}

/// POST /api/verify-username
pub async fn verify_username(
    State(state): State<GatewayState>,
    payload: Result<Json<UsernameRequest>, JsonRejection>,
) -> ApiResult<VerificationStarted> {
    let Json(body) = payload?;
    let session = state
        .workflow
        .start_verification(&body.roblox_username)
        .await?;
    Ok(Json(session.into()))
}

/// GET /api/verification-session/:id
pub async fn get_verification_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<VerificationSession> {
    Ok(Json(state.workflow.get_session(&id).await?))
}

/// POST /api/verify-about/:sessionId
pub async fn verify_about(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> ApiResult<VerificationSession> {
    Ok(Json(state.workflow.check_verification(&session_id).await?))
}

/// POST /api/set-password
pub async fn set_password(
    State(state): State<GatewayState>,
    payload: Result<Json<SetPasswordRequest>, JsonRejection>,
) -> ApiResult<SuccessResponse> {
    let Json(body) = payload?;
    let session_id = required("sessionId", &body.session_id)?;
    required("password", &body.password)?;
    state
        .workflow
        .set_password(session_id, &body.password)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/bot-config
pub async fn create_bot_config(
    State(state): State<GatewayState>,
    payload: Result<Json<BotConfigRequest>, JsonRejection>,
) -> ApiResult<BotConfiguration> {
    let Json(body) = payload?;
    let session_id = required("sessionId", &body.session_id)?;
    let config = state
        .workflow
        .record_config(
            session_id,
            &body.game,
            &body.mode,
            body.additional_settings.as_deref(),
        )
        .await?;
    Ok(Json(config))
}

/// PUT /api/bot-config/:id/complete
pub async fn complete_bot_config(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<BotConfiguration> {
    Ok(Json(state.workflow.complete_config(&id).await?))
}

/// GET /api/bot-status/:botName
pub async fn get_bot_status(
    State(state): State<GatewayState>,
    Path(bot_name): Path<String>,
) -> ApiResult<BotStatus> {
    Ok(Json(state.workflow.lock().status(&bot_name).await?))
}

/// GET /api/bot-statuses
pub async fn list_bot_statuses(State(state): State<GatewayState>) -> ApiResult<Vec<BotStatus>> {
    Ok(Json(state.workflow.lock().list().await?))
}

/// POST /api/request-access
pub async fn request_access(
    State(state): State<GatewayState>,
    payload: Result<Json<AccessRequest>, JsonRejection>,
) -> ApiResult<AccessResponse> {
    let Json(body) = payload?;
    let session_id = required("sessionId", &body.session_id)?;
    let submission = state
        .workflow
        .request_access(session_id, body.config())
        .await?;
    let message = match submission.status {
        KeyStatus::Pending => "Access requested. Open the access link to get your key.",
        KeyStatus::LinkProvided => "Access link provided.",
        _ => "Access already requested.",
    };
    Ok(Json(AccessResponse {
        success: true,
        message: message.to_string(),
        key_submission_id: submission.id,
        status: submission.status,
    }))
}

/// POST /api/generate-link/:sessionId
pub async fn generate_link(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> ApiResult<GeneratedLink> {
    let submission = state.workflow.issue_key(&session_id).await?;
    Ok(Json(GeneratedLink {
        access_link: submission.access_link,
        access_key: submission.access_key,
        key_submission_id: submission.id,
    }))
}

/// POST /api/submit-key
pub async fn submit_key(
    State(state): State<GatewayState>,
    payload: Result<Json<SubmitKeyRequest>, JsonRejection>,
) -> ApiResult<SubmitKeyResponse> {
    let Json(body) = payload?;
    let session_id = required("sessionId", &body.session_id)?;
    let submitted_key = required("submittedKey", &body.submitted_key)?;
    let submission = state.workflow.submit_key(session_id, submitted_key).await?;
    let message = match submission.status {
        KeyStatus::Granted => "Key approved. Your bot session is active.",
        _ => "Key accepted! Waiting for admin approval.",
    };
    Ok(Json(SubmitKeyResponse {
        success: true,
        status: submission.status,
        message: message.to_string(),
        key_submission_id: submission.id,
    }))
}

/// GET /api/key-status/:keySubmissionId
pub async fn get_key_status(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<KeyStatusResponse> {
    Ok(Json(state.workflow.poll_status(&id).await?.into()))
}

/// GET /api/key-submission/:keySubmissionId
pub async fn get_key_submission(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<KeySubmission> {
    Ok(Json(state.workflow.get_submission(&id).await?))
}

/// GET /health
///
/// Unauthenticated. Always 200 so keep-alive pingers see the process is up;
/// adapter problems show in the body.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let mut adapters = BTreeMap::new();
    let mut all_healthy = true;
    for adapter in &state.health.adapters {
        let status = match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => "healthy".to_string(),
            Ok(HealthStatus::Degraded(reason)) => {
                all_healthy = false;
                format!("degraded: {reason}")
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                all_healthy = false;
                format!("unhealthy: {reason}")
            }
            Err(e) => {
                all_healthy = false;
                format!("unhealthy: {e}")
            }
        };
        adapters.insert(adapter.name().to_string(), status);
    }

    Json(HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        adapters,
    })
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /metrics
///
/// Prometheus text exposition, or 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
