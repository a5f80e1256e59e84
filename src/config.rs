// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Run configuration.
//!
//! Read from a YAML file; every field has a default so an empty document is
//! a valid configuration (apart from `root`, which the command line can also
//! supply).
//!
//! ```yaml
//! root: zs.example.com
//! weighted_cnames: true
//! managed_types: [CNAME, SRV]
//! mappings:
//!   - suffix: inst.zs.example.com.
//!     replacements: [inst.prod.example.com.]
//! quotas:
//!   max_value_chars: 25000
//! resolver:
//!   nameserver: 10.0.0.2:53
//!   best_effort: true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use crate::batch::Quotas;
use crate::constants::{
    DEFAULT_CHANGE_COMMENT, DEFAULT_MAX_RESOLVE_HOPS, DEFAULT_QUERY_TIMEOUT_SECS,
};
use crate::diff::DiffOptions;
use crate::mapping::MappingRule;
use crate::records::RecordType;
use crate::retry::RetryPolicy;
use crate::tree::NormalizeOptions;
use crate::zone::Suffixes;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Nameserver as `host:port` or `host`; the system resolver when unset
    pub nameserver: Option<String>,
    /// Per-query deadline in seconds
    pub timeout_secs: u64,
    /// Maximum number of queries in one recursive chase
    pub max_hops: usize,
    /// Return partial answers instead of failing on a timeout
    pub best_effort: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nameserver: None,
            timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            max_hops: DEFAULT_MAX_RESOLVE_HOPS,
            best_effort: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root domain records are published under
    pub root: String,
    /// Labels for each record family
    pub suffixes: Suffixes,
    /// Ordered suffix mapping rules
    pub mappings: Vec<MappingRule>,
    /// Record types to reconcile; all types when unset
    pub managed_types: Option<BTreeSet<RecordType>>,
    /// Expand multi-target SRV records into weighted CNAME sets
    pub weighted_cnames: bool,
    /// Per-request provider quotas
    pub quotas: Quotas,
    /// Retry policy for each batch submission
    pub retry: RetryPolicy,
    /// Comment attached to every submitted batch
    pub comment: String,
    /// Resolver settings
    pub resolver: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: String::new(),
            suffixes: Suffixes::default(),
            mappings: Vec::new(),
            managed_types: None,
            weighted_cnames: false,
            quotas: Quotas::default(),
            retry: RetryPolicy::default(),
            comment: DEFAULT_CHANGE_COMMENT.to_string(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), root = %config.root, "loaded configuration");
        Ok(config)
    }

    /// Parse a configuration document. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Normalizer options derived from this configuration.
    #[must_use]
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            weighted_cnames: self.weighted_cnames,
        }
    }

    /// Reconciler options derived from this configuration.
    #[must_use]
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            managed_types: self.managed_types.clone(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
