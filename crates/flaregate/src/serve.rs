// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `flaregate serve` command implementation.
//!
//! Opens SQLite storage, seeds the configured bots, wires the identity
//! client, operator allowlist, and metrics exporter into the workflow, then
//! runs the HTTP gateway alongside the expiry sweeper until a shutdown
//! signal arrives.

use std::sync::Arc;
use std::time::Duration;

use flaregate_config::FlaregateConfig;
use flaregate_core::{Clock, FlareError, PluginAdapter, StorageAdapter, SystemClock};
use flaregate_gateway::{GatewayState, HealthState, ServerConfig};
use flaregate_identity::RobloxIdentity;
use flaregate_prometheus::PrometheusAdapter;
use flaregate_storage::SqliteStorage;
use flaregate_workflow::{OperatorAllowlist, Sweeper, Workflow, WorkflowSettings, shutdown};
use tracing::{error, info, warn};

/// Runs the `flaregate serve` command.
pub async fn run_serve(config: FlaregateConfig) -> Result<(), FlareError> {
    init_tracing(&config.server.log_level);

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    storage.seed_bots(&config.bot.names, clock.now()).await?;
    info!(
        database = %config.storage.database_path,
        bots = config.bot.names.len(),
        "storage ready"
    );

    let identity = Arc::new(RobloxIdentity::new(&config.identity)?);

    let operators = OperatorAllowlist::from_config(&config.admin);
    if operators.is_empty() {
        warn!("no admin operators configured; admin routes will reject every login");
    }

    let prometheus = match PrometheusAdapter::new() {
        Ok(adapter) => Some(adapter),
        Err(e) => {
            warn!(error = %e, "metrics exporter unavailable; /metrics disabled");
            None
        }
    };

    let workflow = Arc::new(Workflow::new(
        storage.clone(),
        identity.clone(),
        Arc::new(operators),
        clock,
        WorkflowSettings::from_config(&config),
    ));

    let cancel = shutdown::install_signal_handler();

    let sweeper = Sweeper::new(
        workflow.clone(),
        Duration::from_secs(config.sweep.interval_secs),
    );
    let sweeper_handle = tokio::spawn(sweeper.run(cancel.clone()));

    let mut adapters: Vec<Arc<dyn PluginAdapter>> = vec![storage.clone(), identity.clone()];
    let mut health = HealthState::new();
    if let Some(prometheus) = prometheus {
        let render_handle = prometheus.clone();
        health.prometheus_render = Some(Arc::new(move || render_handle.render()));
        adapters.push(Arc::new(prometheus));
    }
    health.adapters = adapters.clone();

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = flaregate_gateway::serve(
        &server_config,
        GatewayState::new(workflow, health),
        cancel.clone(),
    )
    .await;

    // The gateway may also stop on a bind failure; make sure the sweeper follows.
    cancel.cancel();
    if let Err(e) = sweeper_handle.await {
        error!(error = %e, "sweeper task panicked");
    }

    // Storage goes last so the final WAL checkpoint sees every write.
    for adapter in adapters.iter().rev() {
        if let Err(e) = adapter.shutdown().await {
            warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
        }
    }

    served?;
    info!("flaregate stopped");
    Ok(())
}

/// Builds the tracing filter: `RUST_LOG` wins, otherwise
/// `flaregate=<log_level>,warn`.
fn env_filter(log_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("flaregate={log_level},warn"))
        })
}

/// Initializes the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_uses_configured_level() {
        // RUST_LOG is unset under the test runner unless a developer exports it.
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = env_filter("debug").to_string();
        assert!(filter.contains("flaregate=debug"), "got {filter}");
        assert!(filter.contains("warn"));
    }
}
