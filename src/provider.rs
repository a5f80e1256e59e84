// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider capabilities and their file-backed and in-memory implementations.
//!
//! The sync engine never talks to a cloud SDK directly. It is handed three
//! capabilities:
//!
//! - [`Discovery`] enumerates instances and load balancers
//! - [`ZoneReader`] lists hosted zones and reads their record sets
//! - [`ChangeSink`] submits one batch of changes atomically
//!
//! [`TopologyFile`] reads a fleet description from YAML and [`MemoryZone`]
//! is an authoritative zone with provider semantics, persisted as a
//! [`Snapshot`]. Both are used by the CLI and by tests.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::diff::compare_records;
use crate::errors::RejectedChange;
use crate::names::{dot_terminate, encode_octal};
use crate::records::{Action, Change, Instance, LoadBalancer, ZoneRecord};
use crate::snapshot::Snapshot;
use crate::tree::{Leaf, RecordSet, RecordTree};

// ============================================================================
// Capabilities
// ============================================================================

/// An authoritative zone as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Provider identifier used for reads and writes
    pub id: String,
    /// Zone apex (dot-terminated)
    pub name: String,
}

/// Enumerates the fleet.
#[async_trait::async_trait]
pub trait Discovery: Send + Sync {
    /// All instances, keyed by instance id.
    ///
    /// # Errors
    ///
    /// Returns an error if the fleet cannot be enumerated.
    async fn instances(&self) -> Result<BTreeMap<String, Instance>>;

    /// All load balancers with their member instance ids.
    ///
    /// # Errors
    ///
    /// Returns an error if load balancers cannot be enumerated.
    async fn load_balancers(&self) -> Result<Vec<LoadBalancer>>;
}

/// Reads authoritative zones.
#[async_trait::async_trait]
pub trait ZoneReader: Send + Sync {
    /// Zones hosted by the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if zones cannot be listed.
    async fn hosted_zones(&self) -> Result<Vec<HostedZone>>;

    /// Every record set of one zone. Names may carry `\DDD` escapes.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone cannot be read.
    async fn records(&self, zone_id: &str) -> Result<Vec<ZoneRecord>>;
}

/// Writes changes to a zone.
#[async_trait::async_trait]
pub trait ChangeSink: Send + Sync {
    /// Submit one batch. The batch either applies completely or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the batch.
    async fn apply(&self, zone_id: &str, changes: &[Change], comment: &str) -> Result<()>;
}

// ============================================================================
// Topology file
// ============================================================================

/// Fleet description as stored in a topology file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topology {
    /// Instances (order irrelevant)
    pub instances: Vec<Instance>,
    /// Load balancers
    pub load_balancers: Vec<LoadBalancer>,
}

/// [`Discovery`] backed by a YAML topology document.
#[derive(Debug, Clone, Default)]
pub struct TopologyFile {
    topology: Topology,
}

impl TopologyFile {
    /// Wrap an already parsed topology.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    /// Read a topology file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read topology file {}", path.display()))?;
        let topology: Topology = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse topology file {}", path.display()))?;
        debug!(
            path = %path.display(),
            instances = topology.instances.len(),
            load_balancers = topology.load_balancers.len(),
            "loaded topology"
        );
        Ok(Self { topology })
    }
}

#[async_trait::async_trait]
impl Discovery for TopologyFile {
    async fn instances(&self) -> Result<BTreeMap<String, Instance>> {
        Ok(self
            .topology
            .instances
            .iter()
            .map(|instance| (instance.id.clone(), instance.clone()))
            .collect())
    }

    async fn load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        Ok(self.topology.load_balancers.clone())
    }
}

// ============================================================================
// In-memory zone
// ============================================================================

#[derive(Debug, Default)]
struct ZoneState {
    records: RecordTree,
    comments: Vec<String>,
}

/// A single authoritative zone held in memory.
///
/// Enforces the same rules a managed DNS provider does: creating a record
/// set that already exists fails, deleting a record set that does not match
/// the current one exactly fails, and a rejected batch leaves the zone
/// untouched.
#[derive(Debug)]
pub struct MemoryZone {
    zone: HostedZone,
    state: RwLock<ZoneState>,
}

impl MemoryZone {
    /// Create an empty zone.
    #[must_use]
    pub fn new(id: impl Into<String>, name: &str) -> Self {
        Self::with_records(id, name, RecordTree::new())
    }

    /// Create a zone pre-populated with record sets.
    #[must_use]
    pub fn with_records(id: impl Into<String>, name: &str, records: RecordTree) -> Self {
        Self {
            zone: HostedZone {
                id: id.into(),
                name: dot_terminate(name),
            },
            state: RwLock::new(ZoneState {
                records,
                comments: Vec::new(),
            }),
        }
    }

    /// Load a zone from a snapshot file; the zone apex is the snapshot suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded.
    pub async fn load(id: impl Into<String>, path: &Path) -> Result<Self> {
        let snapshot = Snapshot::load(path).await?;
        Ok(Self::with_records(id, &snapshot.suffix, snapshot.records))
    }

    /// Persist the zone as a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        self.snapshot().await.save(path).await?;
        Ok(())
    }

    /// The zone as listed by [`ZoneReader::hosted_zones`].
    #[must_use]
    pub fn hosted_zone(&self) -> &HostedZone {
        &self.zone
    }

    /// Current contents as a snapshot.
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.zone.name.clone(), &self.state.read().await.records)
    }

    /// Comments of every accepted batch, oldest first.
    pub async fn comments(&self) -> Vec<String> {
        self.state.read().await.comments.clone()
    }

    fn check_zone(&self, zone_id: &str) -> Result<()> {
        if zone_id == self.zone.id {
            Ok(())
        } else {
            Err(RejectedChange::UnknownZone(zone_id.to_string()).into())
        }
    }
}

/// Apply one change to `records`, enforcing provider semantics.
fn apply_change(records: &mut RecordTree, change: &Change) -> Result<()> {
    let leaf = Leaf {
        ttl: change.ttl,
        values: change.values.clone(),
        weight: change.weight,
        health_check_id: change.health_check_id.clone(),
    };
    let existing = records.get(&change.name, change.record_type).cloned();

    match change.action {
        Action::Create => {
            let taken = match (&existing, &change.set_identifier) {
                (None, _) => false,
                (Some(RecordSet::Weighted(entries)), Some(set_id)) => entries.contains_key(set_id),
                (Some(_), _) => true,
            };
            if taken {
                return Err(RejectedChange::AlreadyExists(change.to_string()).into());
            }
            let set = match &change.set_identifier {
                Some(set_id) => RecordSet::Weighted(BTreeMap::from([(set_id.clone(), leaf)])),
                None => RecordSet::Simple(leaf),
            };
            records.insert_set(&change.name, change.record_type, set);
        }
        Action::Delete => {
            let remaining = match (existing, &change.set_identifier) {
                (Some(RecordSet::Simple(current)), None)
                    if compare_records(Some(&current), Some(&leaf)) =>
                {
                    None
                }
                (Some(RecordSet::Weighted(mut entries)), Some(set_id))
                    if compare_records(entries.get(set_id), Some(&leaf))
                        && entries.contains_key(set_id) =>
                {
                    entries.remove(set_id);
                    (!entries.is_empty()).then_some(RecordSet::Weighted(entries))
                }
                _ => return Err(RejectedChange::DeleteMismatch(change.to_string()).into()),
            };
            records.remove(&change.name, change.record_type);
            if let Some(set) = remaining {
                records.insert_set(&change.name, change.record_type, set);
            }
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl ZoneReader for MemoryZone {
    async fn hosted_zones(&self) -> Result<Vec<HostedZone>> {
        Ok(vec![self.zone.clone()])
    }

    async fn records(&self, zone_id: &str) -> Result<Vec<ZoneRecord>> {
        self.check_zone(zone_id)?;
        let state = self.state.read().await;
        Ok(state
            .records
            .entries()
            .into_iter()
            .map(|entry| ZoneRecord {
                name: encode_octal(entry.name),
                record_type: entry.record_type,
                ttl: entry.leaf.ttl,
                values: entry.leaf.values.clone(),
                weight: entry.leaf.weight,
                set_identifier: entry.set_identifier.map(str::to_string),
                health_check_id: entry.leaf.health_check_id.clone(),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ChangeSink for MemoryZone {
    async fn apply(&self, zone_id: &str, changes: &[Change], comment: &str) -> Result<()> {
        self.check_zone(zone_id)?;
        let mut state = self.state.write().await;

        let mut staged = state.records.clone();
        for change in changes {
            apply_change(&mut staged, change)?;
        }
        state.records = staged;
        state.comments.push(comment.to_string());

        info!(
            zone = %self.zone.name,
            changes = changes.len(),
            comment,
            "applied change batch"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod provider_tests;
