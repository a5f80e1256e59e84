// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Canonical hierarchical record model and its normalization.
//!
//! A [`RecordTree`] maps `name → type → record set`, where a record set is
//! either a single [`Leaf`] or a weighted collection of leaves keyed by set
//! identifier. Value lists are kept sorted and deduplicated at all times, so
//! two trees built from the same records in any order compare equal.
//!
//! # Normalization
//!
//! SRV and CNAME records are two encodings of "this name resolves to one or
//! more targets". [`normalize`] converges both shapes:
//!
//! 1. An SRV at `_*._*.<name>` with exactly one value is mirrored as a CNAME
//!    at `<name>` pointing to the SRV target.
//! 2. A CNAME with more than one value becomes an SRV at `_*._*.<name>` with
//!    one `0 0 0 <target>` value per original value, and the CNAME is dropped.
//! 3. Both outputs are merged into the tree and the demoted CNAMEs removed.
//!
//! When enabled, a fourth phase expands every multi-target SRV into a
//! weighted CNAME set so that plain CNAME-following clients get weighted
//! round-robin resolution.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::constants::{SRV_PLACEHOLDER_FIELDS, WRR_CNAME_WEIGHT};
use crate::names::{decode_octal, first_label, srv_name, strip_srv_prefix};
use crate::records::{RecordType, ResourceRecord, ZoneRecord};

/// Leaf of a record tree: everything about one record set except its name,
/// type and set identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Leaf {
    /// Time to live in seconds
    pub ttl: u32,
    /// Sorted, deduplicated values
    #[serde(rename = "value", default)]
    pub values: Vec<String>,
    /// Weight of a weighted round-robin entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    /// Health check attached to the record set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
}

impl Leaf {
    /// Build a leaf, canonicalizing the value list.
    #[must_use]
    pub fn new(ttl: u32, values: Vec<String>) -> Self {
        let mut leaf = Self {
            ttl,
            values,
            weight: None,
            health_check_id: None,
        };
        leaf.canonicalize();
        leaf
    }

    /// Sort and deduplicate the value list.
    pub fn canonicalize(&mut self) {
        self.values.sort();
        self.values.dedup();
    }

    /// Absorb another leaf: values are unioned, scalar fields stay as they
    /// are unless this leaf leaves them undefined.
    pub fn absorb(&mut self, other: &Leaf) {
        self.values.extend(other.values.iter().cloned());
        self.canonicalize();
        if self.weight.is_none() {
            self.weight = other.weight;
        }
        if self.health_check_id.is_none() {
            self.health_check_id.clone_from(&other.health_check_id);
        }
    }
}

/// The record set stored under one name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordSet {
    /// A single record set
    Simple(Leaf),
    /// Weighted round-robin entries keyed by set identifier
    Weighted(BTreeMap<String, Leaf>),
}

impl RecordSet {
    /// Absorb another record set. A shape mismatch keeps this set's shape.
    pub fn absorb(&mut self, other: &RecordSet) {
        match (self, other) {
            (RecordSet::Simple(mine), RecordSet::Simple(theirs)) => mine.absorb(theirs),
            (RecordSet::Weighted(mine), RecordSet::Weighted(theirs)) => {
                for (set_id, leaf) in theirs {
                    mine.entry(set_id.clone())
                        .and_modify(|existing| existing.absorb(leaf))
                        .or_insert_with(|| leaf.clone());
                }
            }
            (mine, _) => {
                let kept = match mine {
                    RecordSet::Simple(_) => "simple",
                    RecordSet::Weighted(_) => "weighted",
                };
                debug!(kept, "record set shape conflict while merging, keeping first shape");
            }
        }
    }

    /// The leaf of a simple set.
    #[must_use]
    pub fn simple(&self) -> Option<&Leaf> {
        match self {
            RecordSet::Simple(leaf) => Some(leaf),
            RecordSet::Weighted(_) => None,
        }
    }

    fn canonicalize(&mut self) {
        match self {
            RecordSet::Simple(leaf) => leaf.canonicalize(),
            RecordSet::Weighted(entries) => entries.values_mut().for_each(Leaf::canonicalize),
        }
    }
}

/// One flattened record set: a leaf addressed by name, type and optional set id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<'a> {
    /// Record name
    pub name: &'a str,
    /// Record type
    pub record_type: RecordType,
    /// Set identifier of a weighted entry
    pub set_identifier: Option<&'a str>,
    /// Record data
    pub leaf: &'a Leaf,
}

/// Canonical `name → type → record set` structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTree {
    names: BTreeMap<String, BTreeMap<RecordType, RecordSet>>,
}

impl RecordTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the tree holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Record set stored under a name and type.
    #[must_use]
    pub fn get(&self, name: &str, record_type: RecordType) -> Option<&RecordSet> {
        self.names.get(name).and_then(|types| types.get(&record_type))
    }

    /// Whether any record set exists under a name and type.
    #[must_use]
    pub fn contains(&self, name: &str, record_type: RecordType) -> bool {
        self.get(name, record_type).is_some()
    }

    /// Iterate names with their typed record sets.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<RecordType, RecordSet>)> {
        self.names.iter()
    }

    /// Merge a record set into the tree under a name and type.
    pub fn insert_set(&mut self, name: &str, record_type: RecordType, set: RecordSet) {
        let types = self.names.entry(name.to_string()).or_default();
        match types.get_mut(&record_type) {
            Some(existing) => existing.absorb(&set),
            None => {
                let mut set = set;
                set.canonicalize();
                types.insert(record_type, set);
            }
        }
    }

    /// Fold a single resource record into the tree.
    pub fn insert(&mut self, record: &ResourceRecord) {
        let leaf = Leaf {
            ttl: record.ttl,
            values: vec![record.value.clone()],
            weight: record.weight,
            health_check_id: record.health_check_id.clone(),
        };
        let set = match &record.set_identifier {
            Some(set_id) => RecordSet::Weighted(BTreeMap::from([(set_id.clone(), leaf)])),
            None => RecordSet::Simple(leaf),
        };
        self.insert_set(&record.name, record.record_type, set);
    }

    /// Remove a record set, dropping the name once it holds nothing.
    pub fn remove(&mut self, name: &str, record_type: RecordType) -> Option<RecordSet> {
        let types = self.names.get_mut(name)?;
        let removed = types.remove(&record_type);
        if types.is_empty() {
            self.names.remove(name);
        }
        removed
    }

    /// Flatten the tree into addressable entries, in canonical order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry<'_>> {
        let mut entries = Vec::new();
        for (name, types) in &self.names {
            for (record_type, set) in types {
                match set {
                    RecordSet::Simple(leaf) => entries.push(Entry {
                        name,
                        record_type: *record_type,
                        set_identifier: None,
                        leaf,
                    }),
                    RecordSet::Weighted(weighted) => {
                        entries.extend(weighted.iter().map(|(set_id, leaf)| Entry {
                            name,
                            record_type: *record_type,
                            set_identifier: Some(set_id.as_str()),
                            leaf,
                        }));
                    }
                }
            }
        }
        entries
    }

    /// Keep only names ending with `suffix`.
    #[must_use]
    pub fn filter_suffix(&self, suffix: &str) -> RecordTree {
        self.filter_names(|name| name.ends_with(suffix))
    }

    /// Keep only names accepted by `keep`.
    #[must_use]
    pub fn filter_names(&self, keep: impl Fn(&str) -> bool) -> RecordTree {
        RecordTree {
            names: self
                .names
                .iter()
                .filter(|(name, _)| keep(name))
                .map(|(name, types)| (name.clone(), types.clone()))
                .collect(),
        }
    }

    /// Keep only record sets of the given types.
    #[must_use]
    pub fn filter_types(&self, types: &BTreeSet<RecordType>) -> RecordTree {
        let mut filtered = RecordTree::new();
        for (name, sets) in &self.names {
            for (record_type, set) in sets {
                if types.contains(record_type) {
                    filtered.insert_set(name, *record_type, set.clone());
                }
            }
        }
        filtered
    }
}

/// Fold a flat record list into a tree.
///
/// The result depends only on the set of records, never on their order.
/// When records of one set disagree on TTL, weight or health check, the
/// lowest TTL wins, then the lowest weight, then the lowest health check id.
#[must_use]
pub fn tree(records: &[ResourceRecord]) -> RecordTree {
    let mut ordered: Vec<&ResourceRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        (
            &a.name,
            a.record_type,
            &a.set_identifier,
            a.ttl,
            a.weight,
            &a.health_check_id,
            &a.value,
        )
            .cmp(&(
                &b.name,
                b.record_type,
                &b.set_identifier,
                b.ttl,
                b.weight,
                &b.health_check_id,
                &b.value,
            ))
    });

    let mut tree = RecordTree::new();
    for record in ordered {
        tree.insert(record);
    }
    tree
}

/// Fold record sets read from the authoritative zone into a tree, decoding
/// `\DDD` escapes in their names.
#[must_use]
pub fn zone_tree(records: &[ZoneRecord]) -> RecordTree {
    let mut tree = RecordTree::new();
    for record in records {
        let leaf = Leaf {
            ttl: record.ttl,
            values: record.values.clone(),
            weight: record.weight,
            health_check_id: record.health_check_id.clone(),
        };
        let set = match &record.set_identifier {
            Some(set_id) => RecordSet::Weighted(BTreeMap::from([(set_id.clone(), leaf)])),
            None => RecordSet::Simple(leaf),
        };
        tree.insert_set(&decode_octal(&record.name), record.record_type, set);
    }
    tree
}

/// Left-biased union of any number of trees.
///
/// Scalar leaf fields come from the first tree that defines the record set;
/// value lists are unioned. Applied to a single tree this canonicalizes it.
#[must_use]
pub fn merge<'a>(trees: impl IntoIterator<Item = &'a RecordTree>) -> RecordTree {
    let mut merged = RecordTree::new();
    for tree in trees {
        for (name, types) in &tree.names {
            for (record_type, set) in types {
                merged.insert_set(name, *record_type, set.clone());
            }
        }
    }
    merged
}

/// Options controlling [`normalize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Expand multi-target SRV records into weighted CNAME sets
    pub weighted_cnames: bool,
}

/// Target host of an SRV value (`priority weight port target`).
#[must_use]
pub fn srv_target(value: &str) -> Option<&str> {
    value.split_whitespace().nth(3)
}

/// SRV value pointing at `target` with placeholder numeric fields.
#[must_use]
pub fn srv_value(target: &str) -> String {
    format!("{SRV_PLACEHOLDER_FIELDS} {target}")
}

/// Converge SRV and CNAME encodings of the same relationship.
///
/// The output never holds a simple CNAME with more than one value, and
/// `normalize(normalize(t)) == normalize(t)`.
#[must_use]
pub fn normalize(tree: &RecordTree, options: NormalizeOptions) -> RecordTree {
    let mut current = merge([tree]);
    loop {
        current = normalize_pass(&current);
        if !has_multi_value_cname(&current) {
            break;
        }
    }
    if options.weighted_cnames {
        let weighted = weighted_cnames(&current);
        current = merge([&current, &weighted]);
    }
    current
}

fn normalize_pass(tree: &RecordTree) -> RecordTree {
    let promoted = promote_singletons(tree);
    let (demoted, demoted_names) = demote_multi_value_cnames(tree);

    let mut merged = merge([tree, &promoted, &demoted]);
    for name in &demoted_names {
        merged.remove(name, RecordType::CNAME);
    }
    merged
}

/// Phase 1: single-valued SRVs gain a convenience CNAME at the stripped name.
fn promote_singletons(tree: &RecordTree) -> RecordTree {
    let mut promoted = RecordTree::new();
    for (name, types) in &tree.names {
        let Some(stripped) = strip_srv_prefix(name) else {
            continue;
        };
        let Some(leaf) = types.get(&RecordType::SRV).and_then(RecordSet::simple) else {
            continue;
        };
        if let [only] = leaf.values.as_slice() {
            if let Some(target) = srv_target(only) {
                promoted.insert_set(
                    stripped,
                    RecordType::CNAME,
                    RecordSet::Simple(Leaf::new(leaf.ttl, vec![target.to_string()])),
                );
            }
        }
    }
    promoted
}

/// Phase 2: multi-valued CNAMEs become SRVs under the indirection prefix.
fn demote_multi_value_cnames(tree: &RecordTree) -> (RecordTree, Vec<String>) {
    let mut demoted = RecordTree::new();
    let mut names = Vec::new();
    for (name, types) in &tree.names {
        let Some(leaf) = types.get(&RecordType::CNAME).and_then(RecordSet::simple) else {
            continue;
        };
        if leaf.values.len() > 1 {
            let values = leaf.values.iter().map(|v| srv_value(v)).collect();
            demoted.insert_set(
                &srv_name(name),
                RecordType::SRV,
                RecordSet::Simple(Leaf::new(leaf.ttl, values)),
            );
            names.push(name.clone());
        }
    }
    (demoted, names)
}

/// Phase 4: multi-target SRVs become weighted CNAME sets, one entry per target.
fn weighted_cnames(tree: &RecordTree) -> RecordTree {
    let mut weighted = RecordTree::new();
    for (name, types) in &tree.names {
        let Some(stripped) = strip_srv_prefix(name) else {
            continue;
        };
        let Some(leaf) = types.get(&RecordType::SRV).and_then(RecordSet::simple) else {
            continue;
        };
        if leaf.values.len() < 2 {
            continue;
        }
        let entries: BTreeMap<String, Leaf> = leaf
            .values
            .iter()
            .filter_map(|value| srv_target(value))
            .map(|target| {
                let entry = Leaf {
                    ttl: leaf.ttl,
                    values: vec![target.to_string()],
                    weight: Some(WRR_CNAME_WEIGHT),
                    health_check_id: None,
                };
                (first_label(target).to_string(), entry)
            })
            .collect();
        weighted.insert_set(stripped, RecordType::CNAME, RecordSet::Weighted(entries));
    }
    weighted
}

fn has_multi_value_cname(tree: &RecordTree) -> bool {
    tree.names.values().any(|types| {
        types
            .get(&RecordType::CNAME)
            .and_then(RecordSet::simple)
            .is_some_and(|leaf| leaf.values.len() > 1)
    })
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
