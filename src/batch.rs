// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Batcher: split an ordered change list into request-sized chunks.
//!
//! Packing is greedy and never reorders changes, so the delete-before-create
//! adjacency produced by [`crate::diff::diff`] survives chunking. A change that
//! alone exceeds a quota is returned as [`Batch::Oversized`] instead of being
//! dropped.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    DEFAULT_MAX_CHANGES_PER_BATCH, DEFAULT_MAX_VALUES_PER_BATCH, DEFAULT_MAX_VALUE_CHARS_PER_BATCH,
};
use crate::records::Change;

/// Per-request provider quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quotas {
    /// Maximum changes per request
    pub max_changes: usize,
    /// Maximum total values per request
    pub max_values: usize,
    /// Maximum total value characters per request
    pub max_value_chars: usize,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            max_changes: DEFAULT_MAX_CHANGES_PER_BATCH,
            max_values: DEFAULT_MAX_VALUES_PER_BATCH,
            max_value_chars: DEFAULT_MAX_VALUE_CHARS_PER_BATCH,
        }
    }
}

impl Quotas {
    fn allows(&self, changes: usize, values: usize, chars: usize) -> bool {
        changes <= self.max_changes && values <= self.max_values && chars <= self.max_value_chars
    }

    /// Whether a single change fits in a request on its own.
    #[must_use]
    pub fn admits(&self, change: &Change) -> bool {
        self.allows(1, change.value_count(), change.value_chars())
    }
}

/// One unit of submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Changes that together respect every quota
    Fits(Vec<Change>),
    /// A single change that alone exceeds a quota
    Oversized(Change),
}

impl Batch {
    /// Changes carried by this batch, in order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        match self {
            Batch::Fits(changes) => changes,
            Batch::Oversized(change) => std::slice::from_ref(change),
        }
    }
}

#[derive(Default)]
struct Chunk {
    changes: Vec<Change>,
    values: usize,
    chars: usize,
}

impl Chunk {
    fn push(&mut self, change: Change) {
        self.values += change.value_count();
        self.chars += change.value_chars();
        self.changes.push(change);
    }

    fn close(&mut self, out: &mut Vec<Batch>) {
        if !self.changes.is_empty() {
            out.push(Batch::Fits(std::mem::take(&mut self.changes)));
        }
        self.values = 0;
        self.chars = 0;
    }
}

/// Greedily pack `changes` into batches.
///
/// Concatenating the changes of every returned batch reproduces the input
/// exactly, and every [`Batch::Fits`] satisfies all of `quotas`.
#[must_use]
pub fn chunk(changes: Vec<Change>, quotas: &Quotas) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Chunk::default();

    for change in changes {
        if !quotas.admits(&change) {
            warn!(
                change = %change,
                values = change.value_count(),
                chars = change.value_chars(),
                "change exceeds per-request quota on its own"
            );
            current.close(&mut batches);
            batches.push(Batch::Oversized(change));
            continue;
        }

        let fits = quotas.allows(
            current.changes.len() + 1,
            current.values + change.value_count(),
            current.chars + change.value_chars(),
        );
        if !fits {
            current.close(&mut batches);
        }
        current.push(change);
    }
    current.close(&mut batches);
    batches
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod batch_tests;
