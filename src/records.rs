// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record and topology data model.
//!
//! Everything here is a transient, per-run snapshot: instances and load
//! balancers come from discovery, zone records come from the authoritative
//! zone, and changes are what the reconciler hands to the apply sink.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::names::{elb_prefix, first_label};

/// DNS record types managed by zonesync.
///
/// Ordering follows the textual names, which keeps sorted change lists
/// identical whether keyed by enum or by string.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    AAAA,
    /// Canonical name (alias) record
    CNAME,
    /// Service locator record
    SRV,
    /// Text record
    TXT,
}

impl RecordType {
    /// All managed record types, in order.
    pub const ALL: [RecordType; 5] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::CNAME,
        RecordType::SRV,
        RecordType::TXT,
    ];

    /// Textual name as used on the wire and in snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::SRV => "SRV",
            RecordType::TXT => "TXT",
        }
    }

    /// The equivalent `hickory_client` record type.
    #[must_use]
    pub fn hickory_record_type(self) -> hickory_client::rr::RecordType {
        use hickory_client::rr::RecordType as Hickory;
        match self {
            RecordType::A => Hickory::A,
            RecordType::AAAA => Hickory::AAAA,
            RecordType::CNAME => Hickory::CNAME,
            RecordType::SRV => Hickory::SRV,
            RecordType::TXT => Hickory::TXT,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported record type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported record type '{0}'")]
pub struct UnsupportedRecordType(pub String);

impl FromStr for RecordType {
    type Err = UnsupportedRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            "SRV" => Ok(RecordType::SRV),
            "TXT" => Ok(RecordType::TXT),
            _ => Err(UnsupportedRecordType(s.to_string())),
        }
    }
}

/// A compute instance as reported by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Provider-assigned instance id (e.g., `i-0abc123`)
    pub id: String,
    /// Public DNS name of the instance
    pub dns_name: String,
    /// Private DNS name, if the instance has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_dns_name: Option<String>,
    /// Names of the security groups the instance belongs to
    #[serde(default)]
    pub security_groups: Vec<String>,
    /// Instance tags in provider order
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Instance {
    /// Short private name: the first label of the private DNS name.
    #[must_use]
    pub fn private_name(&self) -> Option<&str> {
        self.private_dns_name
            .as_deref()
            .map(first_label)
            .filter(|label| !label.is_empty())
    }
}

/// A single instance tag. Either side may be missing in provider data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    #[serde(default)]
    pub key: Option<String>,
    /// Tag value
    #[serde(default)]
    pub value: Option<String>,
}

impl Tag {
    /// Build a tag from a key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// The (key, value) pair when both sides are present and non-empty.
    #[must_use]
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.key.as_deref(), self.value.as_deref()) {
            (Some(k), Some(v)) if !k.is_empty() && !v.is_empty() => Some((k, v)),
            _ => None,
        }
    }
}

/// A load balancer and the instances registered with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// DNS name of the load balancer
    pub dns_name: String,
    /// Ids of the member instances
    #[serde(default, alias = "member_instance_ids")]
    pub members: Vec<String>,
}

impl LoadBalancer {
    /// Short prefix name derived from the DNS name.
    #[must_use]
    pub fn prefix(&self) -> Option<String> {
        elb_prefix(&self.dns_name)
    }
}

/// A single DNS fact with one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Record name (dot-terminated)
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record value
    pub value: String,
    /// Weight for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Set identifier for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Health check attached to the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
}

impl ResourceRecord {
    /// Build a plain (unweighted) record.
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ttl: u32,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            value: value.into(),
            weight: None,
            set_identifier: None,
            health_check_id: None,
        }
    }
}

/// A record set as read from the authoritative zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Record name, possibly containing `\DDD` escapes
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record values
    #[serde(default)]
    pub values: Vec<String>,
    /// Weight for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Set identifier for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Health check attached to the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
}

/// Change action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Remove a record set that exists exactly as described
    Delete,
    /// Create a record set that does not exist yet
    Create,
}

impl Action {
    /// Textual name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Delete => "DELETE",
            Action::Create => "CREATE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CREATE or DELETE operation against the zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What to do with the record set
    pub action: Action,
    /// Record name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Sorted record values
    pub values: Vec<String>,
    /// Weight for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Set identifier for weighted round-robin variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
    /// Health check attached to the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
}

impl Change {
    /// Number of values carried by this change.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Summed length of all values carried by this change.
    #[must_use]
    pub fn value_chars(&self) -> usize {
        self.values.iter().map(String::len).sum()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} [{}]",
            self.action,
            self.name,
            self.ttl,
            self.record_type,
            self.values.join(", ")
        )?;
        if let Some(set_id) = &self.set_identifier {
            write!(f, " set={set_id}")?;
        }
        if let Some(weight) = self.weight {
            write!(f, " weight={weight}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod records_tests;
