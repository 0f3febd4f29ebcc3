// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Flaregate.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Flaregate workspace. Storage and the
//! identity provider implement traits defined here.

pub mod error;
pub mod token;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, FlareError};
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    Clock, IdentityProvider, OperatorCredentials, PluginAdapter, StorageAdapter, SystemClock,
};
