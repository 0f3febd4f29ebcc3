// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Flaregate.
//!
//! WAL-mode SQLite with embedded migrations. Every statement runs on the
//! single background thread owned by `tokio-rusqlite`, which makes each
//! query function an atomic read-modify-write with respect to the others.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
