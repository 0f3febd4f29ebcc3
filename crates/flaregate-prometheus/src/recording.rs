// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is
//! a no-op.

use metrics::{describe_counter, describe_gauge};

/// Register all Flaregate metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "flaregate_verifications_total",
        "Verification checks by outcome"
    );
    describe_counter!(
        "flaregate_bot_lock_total",
        "Bot lock acquire and release events by outcome"
    );
    describe_counter!(
        "flaregate_key_submissions_total",
        "Key submission transitions by outcome"
    );
    describe_gauge!("flaregate_bots_in_use", "Bots currently held by a user");
}

/// Record a verification check (`verified`, `code_not_found`, `locked`, ...).
pub fn record_verification(outcome: &'static str) {
    metrics::counter!("flaregate_verifications_total", "outcome" => outcome).increment(1);
}

/// Record a bot lock event (`acquired`, `busy`, `released`, `expired`).
pub fn record_bot_lock(outcome: &'static str) {
    metrics::counter!("flaregate_bot_lock_total", "outcome" => outcome).increment(1);
}

/// Record a key submission transition.
pub fn record_key_submission(outcome: &'static str) {
    metrics::counter!("flaregate_key_submissions_total", "outcome" => outcome).increment(1);
}

pub fn set_bots_in_use(count: usize) {
    metrics::gauge!("flaregate_bots_in_use").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn counters_render_with_outcome_label() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_verification("verified");
            record_verification("verified");
            record_bot_lock("busy");
            set_bots_in_use(1);
        });

        let text = handle.render();
        assert!(text.contains("flaregate_verifications_total{outcome=\"verified\"} 2"));
        assert!(text.contains("flaregate_bot_lock_total{outcome=\"busy\"} 1"));
        assert!(text.contains("flaregate_bots_in_use 1"));
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_key_submission("accepted");
        set_bots_in_use(0);
    }
}
