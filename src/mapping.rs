// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Suffix mapping rules.
//!
//! A mapping rule publishes names ending in one suffix under one or more
//! other suffixes, e.g. `inst.zs.example.com.` → `inst.prod.example.com.`.
//! Rules are applied in order; a name matching several rules fans out to the
//! union of their replacements. The first resulting name is the canonical
//! one, used wherever a single reference is required (SRV targets).

use serde::{Deserialize, Serialize};

use crate::names::strip_srv_prefix;
use crate::records::RecordType;
use crate::tree::{srv_target, srv_value, Leaf, RecordSet, RecordTree};

/// One ordered suffix rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Suffix to match (dot-terminated)
    pub suffix: String,
    /// Suffixes substituted for the matched one
    pub replacements: Vec<String>,
}

impl MappingRule {
    /// Build a rule.
    pub fn new(suffix: impl Into<String>, replacements: &[&str]) -> Self {
        Self {
            suffix: suffix.into(),
            replacements: replacements.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

/// All names a record name is published under, canonical name first.
///
/// A name matching no rule maps to itself.
///
/// ```
/// use zonesync::mapping::{mapped_names, MappingRule};
///
/// let rules = vec![MappingRule::new("zs.example.com.", &["a.example.com.", "b.example.com."])];
/// assert_eq!(
///     mapped_names("web.sg.zs.example.com.", &rules),
///     vec!["web.sg.a.example.com.", "web.sg.b.example.com."]
/// );
/// ```
#[must_use]
pub fn mapped_names(name: &str, rules: &[MappingRule]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for rule in rules {
        let Some(stem) = name.strip_suffix(rule.suffix.as_str()) else {
            continue;
        };
        for replacement in &rule.replacements {
            let mapped = format!("{stem}{replacement}");
            if !names.contains(&mapped) {
                names.push(mapped);
            }
        }
    }
    if names.is_empty() {
        names.push(name.to_string());
    }
    names
}

/// Canonical (first) name for a record name.
#[must_use]
pub fn canonical_name(name: &str, rules: &[MappingRule]) -> String {
    mapped_names(name, rules)
        .into_iter()
        .next()
        .unwrap_or_else(|| name.to_string())
}

/// Publish every record set of `tree` under all of its mapped names.
///
/// SRV values under the indirection prefix have their targets rewritten to
/// the target's canonical name. Colliding destinations merge.
#[must_use]
pub fn rewrite(tree: &RecordTree, rules: &[MappingRule]) -> RecordTree {
    if rules.is_empty() {
        return tree.clone();
    }

    let mut rewritten = RecordTree::new();
    for (name, types) in tree.iter() {
        let indirection = strip_srv_prefix(name).is_some();
        for mapped in mapped_names(name, rules) {
            for (record_type, set) in types {
                let set = if indirection && *record_type == RecordType::SRV {
                    rewrite_srv_targets(set, rules)
                } else {
                    set.clone()
                };
                rewritten.insert_set(&mapped, *record_type, set);
            }
        }
    }
    rewritten
}

fn rewrite_srv_targets(set: &RecordSet, rules: &[MappingRule]) -> RecordSet {
    let rewrite_leaf = |leaf: &Leaf| {
        let mut leaf = leaf.clone();
        leaf.values = leaf
            .values
            .iter()
            .map(|value| match srv_target(value) {
                Some(target) => srv_value(&canonical_name(target, rules)),
                None => value.clone(),
            })
            .collect();
        leaf.canonicalize();
        leaf
    };

    match set {
        RecordSet::Simple(leaf) => RecordSet::Simple(rewrite_leaf(leaf)),
        RecordSet::Weighted(entries) => RecordSet::Weighted(
            entries
                .iter()
                .map(|(set_id, leaf)| (set_id.clone(), rewrite_leaf(leaf)))
                .collect(),
        ),
    }
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod mapping_tests;
