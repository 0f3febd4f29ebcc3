// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Flaregate integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`TestHarness`] - Temp SQLite storage, seeded bots, and a ready [`Workflow`](flaregate_workflow::Workflow)
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`MockIdentityProvider`] - In-memory identity provider with scriptable outages

pub mod clock;
pub mod harness;
pub mod mock_identity;

pub use clock::ManualClock;
pub use harness::{ADMIN_PASSWORD, ADMIN_USERNAME, TestHarness, TestHarnessBuilder};
pub use mock_identity::MockIdentityProvider;
