// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Persisted record tree snapshots.
//!
//! A snapshot is a YAML document scoped to one domain suffix:
//!
//! ```yaml
//! suffix: zs.example.com.
//! records:
//!   i-1.inst.zs.example.com.:
//!     CNAME:
//!       ttl: 86400
//!       value:
//!         - ec2-1.example.net.
//! ```
//!
//! Snapshots are used for offline diffing and auditing, and as the backing
//! store of [`crate::provider::MemoryZone`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::errors::SnapshotError;
use crate::tree::{merge, RecordTree};

/// A record tree scoped to a domain suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Domain suffix the snapshot covers (dot-terminated)
    pub suffix: String,
    /// Record sets under the suffix
    pub records: RecordTree,
}

/// On-disk shape before required fields are checked.
#[derive(Deserialize)]
struct RawSnapshot {
    suffix: Option<String>,
    records: Option<RecordTree>,
}

impl Snapshot {
    /// Build a snapshot, canonicalizing the tree.
    #[must_use]
    pub fn new(suffix: impl Into<String>, records: &RecordTree) -> Self {
        Self {
            suffix: suffix.into(),
            records: merge([records]),
        }
    }

    /// Parse a snapshot document.
    ///
    /// `source` names the document in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::MalformedSnapshot`] when `suffix` or `records`
    /// is missing and [`SnapshotError::Parse`] when the document is not a
    /// snapshot at all.
    pub fn from_yaml(text: &str, source: &str) -> Result<Self, SnapshotError> {
        let raw: RawSnapshot =
            serde_yaml::from_str(text).map_err(|e| SnapshotError::Parse {
                path: source.to_string(),
                source: e,
            })?;

        let suffix = raw.suffix.ok_or_else(|| SnapshotError::MalformedSnapshot {
            path: source.to_string(),
            field: "suffix",
        })?;
        let records = raw.records.ok_or_else(|| SnapshotError::MalformedSnapshot {
            path: source.to_string(),
            field: "records",
        })?;

        Ok(Self::new(suffix, &records))
    }

    /// Render the snapshot as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Parse`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, SnapshotError> {
        serde_yaml::to_string(self).map_err(|e| SnapshotError::Parse {
            path: self.suffix.clone(),
            source: e,
        })
    }

    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub async fn load(path: &Path) -> Result<Self, SnapshotError> {
        let shown = path.display().to_string();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SnapshotError::Io {
                path: shown.clone(),
                source: e,
            })?;
        let snapshot = Self::from_yaml(&text, &shown)?;
        debug!(path = %shown, names = snapshot.records.len(), "loaded snapshot");
        Ok(snapshot)
    }

    /// Write the snapshot to a file, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let text = self.to_yaml()?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| SnapshotError::Io {
                path: path.display().to_string(),
                source: e,
            })?;
        debug!(path = %path.display(), names = self.records.len(), "saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod snapshot_tests;
