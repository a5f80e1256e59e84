// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # zonesync - DNS records derived from fleet topology
//!
//! zonesync turns a snapshot of running instances and load balancers into a
//! canonical tree of DNS records, compares it with what a hosted zone
//! currently serves and submits the difference in quota-sized batches. A
//! small resolver follows the TXT indirection markers it publishes.
//!
//! ## Modules
//!
//! - [`names`] - Domain name helpers (dot handling, LDH sanitizing, escapes)
//! - [`records`] - Record, instance and change types
//! - [`zone`] - Derives records from topology
//! - [`tree`] - Record trees and normalization
//! - [`mapping`] - Suffix rewriting onto additional domains
//! - [`diff`] - Desired vs. actual reconciliation
//! - [`batch`] - Chunking changes under provider quotas
//! - [`snapshot`] - YAML persistence of record trees
//! - [`provider`] - Discovery and zone provider seams
//! - [`sync`] - Orchestrates one reconciliation run
//! - [`resolve`] - Marker-aware recursive resolver
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use zonesync::records::{Instance, RecordType};
//! use zonesync::tree::{normalize, tree, NormalizeOptions};
//! use zonesync::zone::{build_zone, qualify, Suffixes};
//!
//! let web = Instance {
//!     id: "i-1".to_string(),
//!     dns_name: "ec2-1.example.net".to_string(),
//!     private_dns_name: None,
//!     security_groups: vec!["web".to_string()],
//!     tags: Vec::new(),
//! };
//! let instances = BTreeMap::from([(web.id.clone(), web)]);
//!
//! let records = qualify(&build_zone(&instances, &[], &Suffixes::default()), "zs.example.com");
//! let desired = normalize(&tree(&records), NormalizeOptions::default());
//!
//! assert!(desired.contains("i-1.inst.zs.example.com.", RecordType::CNAME));
//! ```

pub mod batch;
pub mod config;
pub mod constants;
pub mod diff;
pub mod errors;
pub mod mapping;
pub mod metrics;
pub mod names;
pub mod provider;
pub mod records;
pub mod resolve;
pub mod retry;
pub mod snapshot;
pub mod sync;
pub mod tree;
pub mod zone;
