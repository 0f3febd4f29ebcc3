// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Storage and the identity provider extend the [`PluginAdapter`] base trait
//! and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod identity;
pub mod operators;
pub mod storage;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use identity::IdentityProvider;
pub use operators::OperatorCredentials;
pub use storage::StorageAdapter;
