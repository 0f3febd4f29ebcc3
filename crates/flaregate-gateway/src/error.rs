// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-response mapping for the gateway.
//!
//! Every [`FlareError`] becomes a JSON body
//! `{error, code, attemptsRemaining?, lockedUntil?, sessionEndTime?}` with
//! the status implied by its [`ErrorKind`].

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use flaregate_core::{ErrorKind, FlareError};
use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Short human-readable description.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_end_time: Option<DateTime<Utc>>,
}

/// A [`FlareError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub FlareError);

impl From<FlareError> for ApiError {
    fn from(err: FlareError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(FlareError::Validation(rejection.body_text()))
    }
}

/// HTTP status for an error kind.
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Expired => StatusCode::GONE,
        ErrorKind::LockedOut => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn body(&self) -> ErrorResponse {
        let err = &self.0;
        let error = match err.kind() {
            // Storage and config details stay in the logs.
            ErrorKind::Internal => "internal server error".to_string(),
            _ => err.to_string(),
        };
        let mut body = ErrorResponse {
            error,
            code: err.code(),
            attempts_remaining: None,
            locked_until: None,
            session_end_time: None,
        };
        match err {
            FlareError::CodeNotFound { attempts_remaining } => {
                body.attempts_remaining = Some(*attempts_remaining);
            }
            FlareError::TooManyAttempts { locked_until }
            | FlareError::AccountLocked { locked_until } => {
                body.attempts_remaining = Some(0);
                body.locked_until = Some(*locked_until);
            }
            FlareError::BotBusy { session_end, .. } => body.session_end_time = *session_end,
            _ => {}
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        match self.0.kind() {
            ErrorKind::Internal => {
                tracing::error!(error = %self.0, code = self.0.code(), "request failed");
            }
            ErrorKind::UpstreamUnavailable => {
                tracing::warn!(error = %self.0, "identity provider unavailable");
            }
            _ => tracing::debug!(code = self.0.code(), "request rejected"),
        }
        (status, Json(self.body())).into_response()
    }
}
