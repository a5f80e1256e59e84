// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Sync engine: wires discovery, the pure pipeline and the zone together.
//!
//! One run is a full-state comparison:
//!
//! 1. Discover instances and load balancers
//! 2. Build, qualify, normalize and map the desired tree
//! 3. Select the hosted zone covering the root and read its records
//! 4. Diff, chunk and submit each chunk independently
//!
//! Nothing is cached between runs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::batch::{chunk, Batch};
use crate::config::Config;
use crate::diff::diff;
use crate::errors::SyncError;
use crate::mapping::rewrite;
use crate::metrics;
use crate::names::{dot_terminate, root_suffix};
use crate::provider::{ChangeSink, Discovery, HostedZone, ZoneReader};
use crate::records::{Action, Change, Instance, LoadBalancer};
use crate::retry::retry_with_backoff;
use crate::tree::{normalize, tree, zone_tree, RecordTree};
use crate::zone::{build_zone, qualify};

/// Compute the desired tree for a topology snapshot.
///
/// Builder output is qualified under the root, normalized and then
/// published under every mapped name.
#[must_use]
pub fn desired_tree(
    instances: &BTreeMap<String, Instance>,
    load_balancers: &[LoadBalancer],
    config: &Config,
) -> RecordTree {
    let records = qualify(
        &build_zone(instances, load_balancers, &config.suffixes),
        &config.root,
    );
    let normalized = normalize(&tree(&records), config.normalize_options());
    rewrite(&normalized, &config.mappings)
}

/// Pick the most specific hosted zone containing `root`.
///
/// # Errors
///
/// Returns [`SyncError::NoMatchingZone`] when no zone contains the root.
pub fn select_zone(zones: &[HostedZone], root: &str) -> Result<HostedZone, SyncError> {
    let root = dot_terminate(root);
    zones
        .iter()
        .filter(|zone| in_domain(&root, &dot_terminate(&zone.name)))
        .max_by_key(|zone| dot_terminate(&zone.name).len())
        .cloned()
        .ok_or_else(|| SyncError::NoMatchingZone {
            root: root.clone(),
            available: zones
                .iter()
                .map(|zone| zone.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

fn in_domain(name: &str, domain: &str) -> bool {
    name == domain || below(name, domain)
}

fn below(name: &str, domain: &str) -> bool {
    name.ends_with(&root_suffix(domain))
}

/// Names whose records a run owns.
///
/// Everything strictly below the root and strictly below every mapping
/// replacement. A replacement apex is owned only when its rule's suffix is
/// itself a name below the root, since only then can a record be published
/// there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    root: String,
    mapped: Vec<String>,
    mapped_apexes: Vec<String>,
}

impl Scope {
    /// Scope of a configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let root = dot_terminate(&config.root);
        let mut mapped: Vec<String> = Vec::new();
        let mut mapped_apexes: Vec<String> = Vec::new();
        for rule in &config.mappings {
            let publishable = below(&dot_terminate(&rule.suffix), &root);
            for replacement in &rule.replacements {
                let domain = dot_terminate(replacement);
                if publishable && !mapped_apexes.contains(&domain) {
                    mapped_apexes.push(domain.clone());
                }
                if !mapped.contains(&domain) {
                    mapped.push(domain);
                }
            }
        }
        Self {
            root,
            mapped,
            mapped_apexes,
        }
    }

    /// Whether records at `name` are managed by this run.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        below(name, &self.root)
            || self.mapped.iter().any(|domain| below(name, domain))
            || self.mapped_apexes.iter().any(|apex| apex == name)
    }
}

/// A reconciliation plan for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Zone the plan applies to
    pub zone: HostedZone,
    /// Ordered changes
    pub changes: Vec<Change>,
    /// SHA-256 of the serialized change list
    pub fingerprint: String,
}

impl Plan {
    /// Wrap a change list, computing its fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Fingerprint`] if the changes cannot be serialized.
    pub fn new(zone: HostedZone, changes: Vec<Change>) -> Result<Self, SyncError> {
        let fingerprint = fingerprint(&changes)?;
        Ok(Self {
            zone,
            changes,
            fingerprint,
        })
    }

    /// Whether the zone is already in sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes with the given action.
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }

    /// Batch comment: the configured text, a short fingerprint and a timestamp.
    #[must_use]
    pub fn comment(&self, base: &str, at: DateTime<Utc>) -> String {
        let short = self.fingerprint.get(..12).unwrap_or(&self.fingerprint);
        format!(
            "{base} (plan {short} at {})",
            at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// SHA-256 hex digest of a serializable value's JSON form.
///
/// # Errors
///
/// Returns [`SyncError::Fingerprint`] if the value has no JSON form.
pub fn fingerprint<T: Serialize>(data: &T) -> Result<String, SyncError> {
    let json = serde_json::to_string(data)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Outcome of submitting a plan.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Changes accepted by the zone (or that would be, on a dry run)
    pub applied: usize,
    /// Number of chunks accepted
    pub chunks_applied: usize,
    /// Per-chunk and per-change failures; the run continued past each
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    /// Whether every change was submitted successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives reconciliation runs against one set of collaborators.
pub struct SyncEngine<'a> {
    discovery: &'a dyn Discovery,
    reader: &'a dyn ZoneReader,
    sink: &'a dyn ChangeSink,
    config: &'a Config,
}

impl<'a> SyncEngine<'a> {
    /// Create an engine.
    #[must_use]
    pub fn new(
        discovery: &'a dyn Discovery,
        reader: &'a dyn ZoneReader,
        sink: &'a dyn ChangeSink,
        config: &'a Config,
    ) -> Self {
        Self {
            discovery,
            reader,
            sink,
            config,
        }
    }

    /// Compute the plan without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery or the zone read fails, or if no hosted
    /// zone covers the root domain.
    pub async fn plan(&self) -> Result<Plan, SyncError> {
        let instances = self
            .discovery
            .instances()
            .await
            .map_err(SyncError::Discovery)?;
        let load_balancers = self
            .discovery
            .load_balancers()
            .await
            .map_err(SyncError::Discovery)?;

        let zones = self.reader.hosted_zones().await.map_err(SyncError::ZoneRead)?;
        let zone = select_zone(&zones, &self.config.root)?;
        let apex = dot_terminate(&zone.name);
        let scope = Scope::new(self.config);

        let desired = desired_tree(&instances, &load_balancers, self.config).filter_names(|name| {
            let inside = in_domain(name, &apex);
            if !inside {
                warn!(name, zone = %apex, "desired name outside hosted zone, skipping");
            }
            inside
        });
        let actual = zone_tree(
            &self
                .reader
                .records(&zone.id)
                .await
                .map_err(SyncError::ZoneRead)?,
        )
        .filter_names(|name| scope.contains(name));

        let changes = diff(&desired, &actual, &self.config.diff_options());
        for change in &changes {
            metrics::record_change_planned(change.action);
        }

        let plan = Plan::new(zone, changes)?;
        info!(
            zone = %plan.zone.name,
            instances = instances.len(),
            desired = desired.len(),
            actual = actual.len(),
            creates = plan.count(Action::Create),
            deletes = plan.count(Action::Delete),
            fingerprint = %plan.fingerprint,
            "computed plan"
        );
        Ok(plan)
    }

    /// Submit a plan chunk by chunk.
    ///
    /// Oversized changes and rejected chunks are recorded in the report and
    /// never stop later chunks. With `dry_run` nothing is sent.
    pub async fn apply(&self, plan: &Plan, dry_run: bool) -> SyncReport {
        let comment = plan.comment(&self.config.comment, Utc::now());
        let batches = chunk(plan.changes.clone(), &self.config.quotas);
        let mut report = SyncReport::default();

        for (index, batch) in batches.iter().enumerate() {
            let changes = match batch {
                Batch::Oversized(change) => {
                    metrics::record_oversized_change();
                    report.failures.push(SyncError::oversized(change));
                    continue;
                }
                Batch::Fits(changes) => changes,
            };

            if dry_run {
                for change in changes {
                    info!(chunk = index, "{change}");
                }
                metrics::record_chunk("dry_run");
                report.applied += changes.len();
                report.chunks_applied += 1;
                continue;
            }

            let operation = format!("apply chunk {index} to {}", plan.zone.id);
            let result = retry_with_backoff(
                &self.config.retry,
                || self.sink.apply(&plan.zone.id, changes, &comment),
                &operation,
            )
            .await;

            match result {
                Ok(()) => {
                    debug!(chunk = index, changes = changes.len(), "chunk applied");
                    metrics::record_chunk("applied");
                    report.applied += changes.len();
                    report.chunks_applied += 1;
                }
                Err(e) => {
                    error!(chunk = index, changes = changes.len(), error = %e, "chunk rejected");
                    metrics::record_chunk("failed");
                    report.failures.push(SyncError::ApplyChunk {
                        zone_id: plan.zone.id.clone(),
                        index,
                        chunk: changes.clone(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }
        report
    }

    /// Plan and apply in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails; submission failures are reported
    /// in the returned [`SyncReport`].
    pub async fn sync(&self, dry_run: bool) -> Result<(Plan, SyncReport), SyncError> {
        let start = Instant::now();
        let plan = match self.plan().await {
            Ok(plan) => plan,
            Err(e) => {
                metrics::record_sync("error", start.elapsed());
                return Err(e);
            }
        };
        let report = self.apply(&plan, dry_run).await;

        let status = if report.is_success() { "success" } else { "error" };
        metrics::record_sync(status, start.elapsed());
        info!(
            zone = %plan.zone.name,
            applied = report.applied,
            chunks = report.chunks_applied,
            failures = report.failures.len(),
            dry_run,
            elapsed = ?start.elapsed(),
            "sync finished"
        );
        Ok((plan, report))
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod sync_tests;
