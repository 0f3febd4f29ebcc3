// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Flaregate.
//!
//! Exposes the verification and access workflow as a JSON API under `/api`,
//! guards admin routes with the single-active-admin session check, and maps
//! every workflow error to a structured response.

pub mod admin;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, HealthState, ServerConfig, router, serve};
