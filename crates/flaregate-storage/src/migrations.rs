// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded refinery migrations, applied on every [`Database::open`](crate::Database::open).

use refinery::Report;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies pending migrations. History lives in `refinery_schema_history`.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<Report, refinery::Error> {
    embedded::migrations::runner().run(conn)
}
