// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone builder: fleet topology to flat resource records.
//!
//! The builder is a pure function of the discovered instances and load
//! balancers. Its output is unqualified (relative to the root domain); use
//! [`qualify`] to place it under a root.
//!
//! # Layout
//!
//! ```text
//! <id>.inst.                     CNAME  <instance dns name>
//! <private>.priv.                CNAME  <instance dns name>
//! _*._*.inst.                    SRV    0 0 0 <id>.inst.
//! _*._*.<value>.<key>.tag.       SRV    0 0 0 <id>.inst.
//! _*._*.<prefix>.elb.            SRV    0 0 0 <id>.inst.
//! _*._*.<group>.sg.              SRV    0 0 0 <id>.inst.
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_ELB_SUFFIX, DEFAULT_HOST_SUFFIX, DEFAULT_PRIVATE_SUFFIX, DEFAULT_SG_SUFFIX,
    DEFAULT_TAG_SUFFIX, IDENTITY_TTL_SECS, MEMBERSHIP_TTL_SECS,
};
use crate::names::{dot_terminate, ldh, qualify as qualify_name, srv_name};
use crate::records::{Instance, LoadBalancer, RecordType, ResourceRecord};
use crate::tree::{srv_target, srv_value};

/// Labels under which each record family is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suffixes {
    /// Instance identity label
    pub host: String,
    /// Private-name label
    pub private: String,
    /// Load balancer label
    pub elb: String,
    /// Security group label
    pub sg: String,
    /// Tag label
    pub tag: String,
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST_SUFFIX.to_string(),
            private: DEFAULT_PRIVATE_SUFFIX.to_string(),
            elb: DEFAULT_ELB_SUFFIX.to_string(),
            sg: DEFAULT_SG_SUFFIX.to_string(),
            tag: DEFAULT_TAG_SUFFIX.to_string(),
        }
    }
}

/// Build the flat, unqualified record list for a topology snapshot.
///
/// Instances without a DNS name are skipped, load balancer members that are
/// no longer present are dropped, and incomplete tags are ignored.
#[must_use]
pub fn build_zone(
    instances: &BTreeMap<String, Instance>,
    load_balancers: &[LoadBalancer],
    suffixes: &Suffixes,
) -> Vec<ResourceRecord> {
    let live: BTreeMap<&str, &Instance> = instances
        .iter()
        .filter(|(id, instance)| {
            let usable = !instance.dns_name.is_empty();
            if !usable {
                debug!(instance_id = %id, "skipping instance without DNS name");
            }
            usable
        })
        .map(|(id, instance)| (id.as_str(), instance))
        .collect();

    let mut records = Vec::new();
    records.extend(host_records(&live, suffixes));
    records.extend(tag_records(&live, suffixes));
    records.extend(elb_records(&live, load_balancers, suffixes));
    records.extend(sg_records(&live, suffixes));

    debug!(
        instances = live.len(),
        load_balancers = load_balancers.len(),
        records = records.len(),
        "built zone records"
    );
    records
}

fn instance_target(id: &str, suffixes: &Suffixes) -> String {
    format!("{id}.{}.", suffixes.host)
}

fn membership(name: &str, id: &str, suffixes: &Suffixes) -> ResourceRecord {
    ResourceRecord::new(
        srv_name(name),
        RecordType::SRV,
        MEMBERSHIP_TTL_SECS,
        srv_value(&instance_target(id, suffixes)),
    )
}

fn host_records(live: &BTreeMap<&str, &Instance>, suffixes: &Suffixes) -> Vec<ResourceRecord> {
    let mut records = Vec::new();
    let service = format!("{}.", suffixes.host);

    for (id, instance) in live {
        let target = dot_terminate(&instance.dns_name);
        records.push(ResourceRecord::new(
            instance_target(id, suffixes),
            RecordType::CNAME,
            IDENTITY_TTL_SECS,
            target.clone(),
        ));
        if let Some(private) = instance.private_name() {
            records.push(ResourceRecord::new(
                format!("{private}.{}.", suffixes.private),
                RecordType::CNAME,
                IDENTITY_TTL_SECS,
                target,
            ));
        }
        records.push(membership(&service, id, suffixes));
    }
    records
}

fn tag_records(live: &BTreeMap<&str, &Instance>, suffixes: &Suffixes) -> Vec<ResourceRecord> {
    let mut records = Vec::new();
    for (id, instance) in live {
        for (key, value) in instance.tags.iter().filter_map(|tag| tag.pair()) {
            let name = format!("{}.{}.{}.", ldh(value), ldh(key), suffixes.tag);
            records.push(membership(&name, id, suffixes));
        }
    }
    records
}

fn elb_records(
    live: &BTreeMap<&str, &Instance>,
    load_balancers: &[LoadBalancer],
    suffixes: &Suffixes,
) -> Vec<ResourceRecord> {
    let mut records = Vec::new();
    for elb in load_balancers {
        let Some(prefix) = elb.prefix() else {
            warn!(dns_name = %elb.dns_name, "cannot derive load balancer prefix, skipping");
            continue;
        };
        let name = format!("{prefix}.{}.", suffixes.elb);
        for member in &elb.members {
            if live.contains_key(member.as_str()) {
                records.push(membership(&name, member, suffixes));
            } else {
                debug!(load_balancer = %prefix, instance_id = %member, "dropping stale member");
            }
        }
    }
    records
}

fn sg_records(live: &BTreeMap<&str, &Instance>, suffixes: &Suffixes) -> Vec<ResourceRecord> {
    let mut groups: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for (id, instance) in live {
        for group in &instance.security_groups {
            groups.entry(ldh(group)).or_default().insert(*id);
        }
    }

    groups
        .iter()
        .filter(|(label, _)| !label.is_empty())
        .flat_map(|(label, members)| {
            let name = format!("{label}.{}.", suffixes.sg);
            members
                .iter()
                .map(move |id| membership(&name, id, suffixes))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Place builder output under the root domain.
///
/// Record names and SRV targets (always relative in builder output) are
/// qualified; CNAME targets are external names and stay as they are.
#[must_use]
pub fn qualify(records: &[ResourceRecord], root: &str) -> Vec<ResourceRecord> {
    records
        .iter()
        .map(|record| {
            let mut qualified = record.clone();
            qualified.name = qualify_name(&record.name, root);
            if record.record_type == RecordType::SRV {
                if let Some(target) = srv_target(&record.value) {
                    qualified.value = srv_value(&qualify_name(target, root));
                }
            }
            qualified
        })
        .collect()
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod zone_tests;
