// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin session middleware.
//!
//! Every admin-scoped route sits behind [`require_admin`]. The request must
//! carry `Authorization: Bearer <admin session id>` naming the single active
//! admin session; the resulting [`ActiveAdmin`] is placed in the request
//! extensions for handlers to extract. Missing, unknown, and superseded
//! sessions are all rejected with 401 (fail-closed).

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use flaregate_core::FlareError;
use flaregate_workflow::ActiveAdmin;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware that resolves the bearer token to an [`ActiveAdmin`].
pub async fn require_admin(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        tracing::debug!("admin route called without a session");
        return Err(FlareError::Unauthorized("no admin session provided".to_string()).into());
    };

    let admin: ActiveAdmin = state.workflow.admin().require_active_admin(&token).await?;
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}
