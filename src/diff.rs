// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciler: desired tree vs. actual tree to an ordered change list.
//!
//! Record sets are addressed by `(name, type, set identifier)`. A record set
//! present in `desired` that differs from its `actual` counterpart (or has
//! none) yields a CREATE; a record set present in `actual` that differs from
//! its `desired` counterpart (or has none) yields a DELETE.
//!
//! Changes are sorted by `(name, type, delete-before-create, set id)` so a
//! replaced record set is always deleted immediately before it is recreated.
//! Providers reject creating a record set that exists and deleting one that
//! does not match exactly; keeping each pair adjacent keeps per-name state
//! consistent across batch boundaries.

use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::records::{Action, Change, RecordType};
use crate::tree::{Leaf, RecordTree};

/// Options controlling [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Restrict reconciliation to these record types; `None` manages all
    pub managed_types: Option<BTreeSet<RecordType>>,
}

impl DiffOptions {
    fn manages(&self, record_type: RecordType) -> bool {
        self.managed_types
            .as_ref()
            .map_or(true, |types| types.contains(&record_type))
    }
}

type Key<'a> = (&'a str, RecordType, Option<&'a str>);

/// Compare two leaves for reconciliation purposes.
///
/// Every non-value field must match exactly and the sorted value lists must
/// be equal. A missing leaf compares as an all-empty leaf.
#[must_use]
pub fn compare_records(a: Option<&Leaf>, b: Option<&Leaf>) -> bool {
    let empty = Leaf::default();
    let a = a.unwrap_or(&empty);
    let b = b.unwrap_or(&empty);

    if a.ttl != b.ttl || a.weight != b.weight || a.health_check_id != b.health_check_id {
        return false;
    }
    let mut a_values = a.values.clone();
    let mut b_values = b.values.clone();
    a_values.sort();
    b_values.sort();
    a_values == b_values
}

fn index<'a>(tree: &'a RecordTree, options: &DiffOptions) -> BTreeMap<Key<'a>, &'a Leaf> {
    tree.entries()
        .into_iter()
        .filter(|entry| options.manages(entry.record_type))
        .map(|entry| ((entry.name, entry.record_type, entry.set_identifier), entry.leaf))
        .collect()
}

fn change(action: Action, key: &Key<'_>, leaf: &Leaf) -> Change {
    let mut values = leaf.values.clone();
    values.sort();
    Change {
        action,
        name: key.0.to_string(),
        record_type: key.1,
        ttl: leaf.ttl,
        values,
        weight: leaf.weight,
        set_identifier: key.2.map(str::to_string),
        health_check_id: leaf.health_check_id.clone(),
    }
}

/// Compute the ordered change list turning `actual` into `desired`.
///
/// Pure and deterministic: no I/O, the same inputs always give the same list.
#[must_use]
pub fn diff(desired: &RecordTree, actual: &RecordTree, options: &DiffOptions) -> Vec<Change> {
    let wanted = index(desired, options);
    let existing = index(actual, options);
    let guard_a_records = !options.manages(RecordType::A);

    let mut changes = Vec::new();

    for (key, leaf) in &wanted {
        if compare_records(Some(*leaf), existing.get(key).copied()) {
            continue;
        }
        if guard_a_records && key.1 == RecordType::CNAME && actual.contains(key.0, RecordType::A)
        {
            warn!(
                name = key.0,
                "not creating CNAME that would shadow an unmanaged A record"
            );
            continue;
        }
        changes.push(change(Action::Create, key, leaf));
    }

    for (key, leaf) in &existing {
        if !compare_records(Some(*leaf), wanted.get(key).copied()) {
            changes.push(change(Action::Delete, key, leaf));
        }
    }

    changes.sort_by(|a, b| {
        (&a.name, a.record_type, a.action, &a.set_identifier).cmp(&(
            &b.name,
            b.record_type,
            b.action,
            &b.set_identifier,
        ))
    });
    changes
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod diff_tests;
