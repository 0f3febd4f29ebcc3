// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flaregate - account verification and shared bot access gateway.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flaregate_config::FlaregateConfig;
use flaregate_core::FlareError;

/// Flaregate - account verification and shared bot access gateway.
#[derive(Parser, Debug)]
#[command(name = "flaregate", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the search hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway (default).
    Serve,
    /// Run diagnostic checks against the configured environment.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Prompt for a password and print an Argon2 hash for `[admin].operators`.
    HashPassword,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::HashPassword) => hash_password_interactive(),
        Some(Commands::Doctor { plain }) => {
            let config = load_config_or_exit(cli.config.as_deref());
            doctor::run_doctor(&config, cli.config.as_deref(), plain).await
        }
        Some(Commands::Serve) | None => {
            let config = load_config_or_exit(cli.config.as_deref());
            serve::run_serve(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("flaregate: {e}");
        std::process::exit(1);
    }
}

/// Loads and validates configuration, rendering diagnostics and exiting on failure.
fn load_config_or_exit(path: Option<&std::path::Path>) -> FlaregateConfig {
    let loaded = match path {
        Some(path) => flaregate_config::load_and_validate_path(path),
        None => flaregate_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            flaregate_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Reads a password twice from the terminal and prints its PHC hash.
fn hash_password_interactive() -> Result<(), FlareError> {
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| FlareError::Internal(format!("failed to read password: {e}")))?;
    let confirm = rpassword::prompt_password("Confirm password: ")
        .map_err(|e| FlareError::Internal(format!("failed to read password: {e}")))?;

    let hash = hash_confirmed(&password, &confirm)?;
    println!("{hash}");
    Ok(())
}

fn hash_confirmed(password: &str, confirm: &str) -> Result<String, FlareError> {
    if password.is_empty() {
        return Err(FlareError::Validation("password must not be empty".into()));
    }
    if password != confirm {
        return Err(FlareError::Validation("passwords do not match".into()));
    }
    flaregate_workflow::credentials::hash_password(password)
}
