// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for zonesync runs.
//!
//! All metrics carry the `zonesync_` prefix and live in a process-wide
//! registry. A one-shot `sync` can dump them with `--metrics-file` for a
//! node exporter textfile collector to pick up.
//!
//! # Example
//!
//! ```rust,no_run
//! use zonesync::metrics::{gather_metrics, record_sync};
//!
//! record_sync("success", std::time::Duration::from_secs(1));
//! let text = gather_metrics().unwrap();
//! ```

use prometheus::{
    core::Collector, CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::warn;

use crate::records::Action;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all zonesync metrics
const METRICS_NAMESPACE: &str = "zonesync";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    if let Err(e) = METRICS_REGISTRY.register(Box::new(collector.clone())) {
        warn!(error = %e, "failed to register metric");
    }
    collector
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Changes planned by the reconciler
///
/// Labels:
/// - `action`: `CREATE` or `DELETE`
pub static CHANGES_PLANNED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_changes_planned_total"),
        "Total number of record set changes planned by action",
    );
    register(CounterVec::new(opts, &["action"]).expect("valid metric definition"))
});

/// Batches submitted to the zone
///
/// Labels:
/// - `outcome`: `applied`, `failed` or `dry_run`
pub static CHUNKS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_chunks_total"),
        "Total number of change batches by outcome",
    );
    register(CounterVec::new(opts, &["outcome"]).expect("valid metric definition"))
});

/// Changes excluded from submission because they exceed a quota alone
pub static OVERSIZED_CHANGES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register(
        IntCounter::new(
            format!("{METRICS_NAMESPACE}_oversized_changes_total"),
            "Total number of changes exceeding a per-request quota on their own",
        )
        .expect("valid metric definition"),
    )
});

/// Duration of sync runs in seconds
///
/// Labels:
/// - `status`: `success` or `error`
pub static SYNC_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_sync_duration_seconds"),
        "Duration of sync runs in seconds by status",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 300.0]);
    register(HistogramVec::new(opts, &["status"]).expect("valid metric definition"))
});

// ============================================================================
// Resolver Metrics
// ============================================================================

/// Queries issued by the resolver
pub static RESOLVER_HOPS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register(
        IntCounter::new(
            format!("{METRICS_NAMESPACE}_resolver_hops_total"),
            "Total number of resolver queries",
        )
        .expect("valid metric definition"),
    )
});

// ============================================================================
// Recording helpers
// ============================================================================

/// Record one planned change.
pub fn record_change_planned(action: Action) {
    CHANGES_PLANNED_TOTAL
        .with_label_values(&[action.as_str()])
        .inc();
}

/// Record the outcome of one batch (`applied`, `failed`, `dry_run`).
pub fn record_chunk(outcome: &str) {
    CHUNKS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a change rejected by the batcher.
pub fn record_oversized_change() {
    OVERSIZED_CHANGES_TOTAL.inc();
}

/// Record a finished sync run.
pub fn record_sync(status: &str, duration: Duration) {
    SYNC_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration.as_secs_f64());
}

/// Record one resolver query.
pub fn record_resolver_hop() {
    RESOLVER_HOPS_TOTAL.inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
