// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for zonesync.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Record Layout Constants
// ============================================================================

/// Label under which instance identity CNAMEs live (`<id>.inst.`)
pub const DEFAULT_HOST_SUFFIX: &str = "inst";

/// Label under which private-name CNAMEs live (`<private>.priv.`)
pub const DEFAULT_PRIVATE_SUFFIX: &str = "priv";

/// Label under which load balancer membership SRVs live (`<prefix>.elb.`)
pub const DEFAULT_ELB_SUFFIX: &str = "elb";

/// Label under which security group membership SRVs live (`<group>.sg.`)
pub const DEFAULT_SG_SUFFIX: &str = "sg";

/// Label under which tag SRVs live (`<value>.<key>.tag.`)
pub const DEFAULT_TAG_SUFFIX: &str = "tag";

/// Reserved label pair marking a name as an SRV indirection record
pub const SRV_PREFIX: &str = "_*._*.";

/// Priority, weight and port of every published SRV value. Only the target is used.
pub const SRV_PLACEHOLDER_FIELDS: &str = "0 0 0";

// ============================================================================
// TTL Constants
// ============================================================================

/// TTL for identity CNAMEs (1 day); instance identity rarely changes
pub const IDENTITY_TTL_SECS: u32 = 86_400;

/// TTL for membership SRV records and everything derived from them
pub const MEMBERSHIP_TTL_SECS: u32 = 100;

// ============================================================================
// Weighted Round-Robin Constants
// ============================================================================

/// Weight carried by each weighted CNAME produced from a multi-target SRV
pub const WRR_CNAME_WEIGHT: u32 = 16;

// ============================================================================
// Batch Quota Constants
// ============================================================================

/// Maximum number of changes in a single change request
pub const DEFAULT_MAX_CHANGES_PER_BATCH: usize = 100;

/// Maximum number of record values in a single change request
pub const DEFAULT_MAX_VALUES_PER_BATCH: usize = 1000;

/// Provider limit on the summed length of all values in a change request
pub const PROVIDER_MAX_VALUE_CHARS: usize = 32_000;

/// Margin kept below `PROVIDER_MAX_VALUE_CHARS`
pub const VALUE_CHARS_SAFETY_MARGIN: usize = 2_000;

/// Effective default for the summed value length of a change request
pub const DEFAULT_MAX_VALUE_CHARS_PER_BATCH: usize =
    PROVIDER_MAX_VALUE_CHARS - VALUE_CHARS_SAFETY_MARGIN;

// ============================================================================
// Apply Retry Constants
// ============================================================================

/// Attempts made for each chunk before it is reported as failed
pub const DEFAULT_APPLY_MAX_ATTEMPTS: u32 = 3;

/// Initial delay between chunk submission attempts (milliseconds)
pub const DEFAULT_APPLY_INITIAL_BACKOFF_MILLIS: u64 = 500;

/// Upper bound on the delay between chunk submission attempts (seconds)
pub const DEFAULT_APPLY_MAX_BACKOFF_SECS: u64 = 10;

/// Backoff multiplier (exponential growth factor)
pub const APPLY_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default comment attached to every change batch
pub const DEFAULT_CHANGE_COMMENT: &str = "Synced with zonesync";

// ============================================================================
// Resolver Constants
// ============================================================================

/// Prefix of a TXT record that points discovery at another name
pub const TXT_MARKER_PREFIX: &str = "zonesync // ";

/// Standard DNS port for queries
pub const DNS_PORT: u16 = 53;

/// Per-query deadline for the TCP resolver transport
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;

/// Maximum number of marker indirections followed in recursive mode
pub const DEFAULT_MAX_RESOLVE_HOPS: usize = 16;

/// Nameserver used when none is configured and `/etc/resolv.conf` has none
pub const FALLBACK_NAMESERVER: &str = "127.0.0.1:53";

/// Location of the system resolver configuration
pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

// ============================================================================
// Name Constants
// ============================================================================

/// Maximum length of a single DNS label
pub const MAX_LABEL_LEN: usize = 63;

/// Default path of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "zonesync.yaml";

/// Hosted zone id given to a zone file when none is supplied
pub const DEFAULT_ZONE_ID: &str = "local";
