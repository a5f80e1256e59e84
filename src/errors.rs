// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zonesync.
//!
//! This module provides specialized error types for:
//! - Reconciliation runs against the authoritative zone
//! - Persisted snapshot loading
//! - Recursive resolution of published records
//!
//! The pure pipeline (builder, normalizer, reconciler, batcher) never fails;
//! every error here originates at an I/O boundary.

use std::time::Duration;
use thiserror::Error;

use crate::records::Change;

/// Errors that can occur during a reconciliation run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No hosted zone covers the root domain
    ///
    /// Fatal to the run: there is nothing to reconcile against.
    #[error("No hosted zone covers root domain '{root}' (zones: {available})")]
    NoMatchingZone {
        /// The root domain being synced
        root: String,
        /// Comma-separated names of the zones that were considered
        available: String,
    },

    /// A single change exceeds a per-request quota on its own
    ///
    /// Reported to the caller and excluded from submission; the run continues.
    #[error("Change for '{name}' exceeds per-request quota ({values} values, {chars} characters)")]
    OversizedChange {
        /// The record name of the change
        name: String,
        /// Number of values carried by the change
        values: usize,
        /// Summed value characters of the change
        chars: usize,
    },

    /// The zone rejected one batch of changes
    ///
    /// Carries the rejected chunk so it can be reported; later chunks are
    /// still submitted.
    #[error("Zone '{zone_id}' rejected chunk {index} ({} changes): {reason}", .chunk.len())]
    ApplyChunk {
        /// Provider identifier of the zone
        zone_id: String,
        /// Position of the chunk in submission order
        index: usize,
        /// The rejected changes
        chunk: Vec<Change>,
        /// Rejection reason from the zone
        reason: String,
    },

    /// Instance or load balancer discovery failed
    #[error("Discovery failed: {0}")]
    Discovery(#[source] anyhow::Error),

    /// Reading the authoritative zone failed
    #[error("Reading zone failed: {0}")]
    ZoneRead(#[source] anyhow::Error),

    /// The change list could not be serialized for its fingerprint
    #[error("Failed to fingerprint plan: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

impl SyncError {
    /// Build an [`SyncError::OversizedChange`] for a change.
    #[must_use]
    pub fn oversized(change: &Change) -> Self {
        SyncError::OversizedChange {
            name: change.name.clone(),
            values: change.value_count(),
            chars: change.value_chars(),
        }
    }
}

/// A batch refused by the zone because of its contents.
///
/// Resubmitting the same batch fails the same way, so these are never
/// retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectedChange {
    /// The zone has no hosted zone with this id
    #[error("No such hosted zone: {0}")]
    UnknownZone(String),

    /// A CREATE targets a record set that already exists
    #[error("Record set already exists: {0}")]
    AlreadyExists(String),

    /// A DELETE does not match the record set currently served
    #[error("Record set to delete does not match current state: {0}")]
    DeleteMismatch(String),
}

/// Errors that can occur while loading or saving a persisted snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// A required field is missing from the snapshot
    #[error("Malformed snapshot {path}: missing field '{field}'")]
    MalformedSnapshot {
        /// Path (or description) of the snapshot source
        path: String,
        /// The missing field
        field: &'static str,
    },

    /// The snapshot is not valid YAML or does not have the snapshot shape
    #[error("Cannot parse snapshot {path}: {source}")]
    Parse {
        /// Path (or description) of the snapshot source
        path: String,
        /// Underlying parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// Reading or writing the snapshot file failed
    #[error("Snapshot I/O on {path}: {source}")]
    Io {
        /// Path of the snapshot file
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while resolving published records.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A query did not complete before its deadline
    ///
    /// Aborts a recursive chase unless best-effort mode is enabled.
    #[error("Query for '{name}' {record_type} timed out after {timeout:?}")]
    ResolutionTimeout {
        /// The queried name
        name: String,
        /// The queried record type
        record_type: String,
        /// The per-query deadline
        timeout: Duration,
    },

    /// A recursive chase needed more rounds of marker chasing than allowed
    #[error("Resolution of '{name}' exceeded {max_hops} hops")]
    HopLimitExceeded {
        /// The marker target that would have been chased next
        name: String,
        /// The configured hop ceiling
        max_hops: usize,
    },

    /// The transport failed for a reason other than a timeout
    #[error("Query for '{name}' via {server} failed: {reason}")]
    Transport {
        /// The queried name
        name: String,
        /// The nameserver queried
        server: String,
        /// Failure description
        reason: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
