//! Tree-wide merge of per-document results.
//!
//! Fragments are unioned per category, so the same fragment found in many
//! documents appears once. Occurrences are summed: each merged document adds
//! the size of its own set for that category. Both operations are commutative
//! and associative, which is what makes the result independent of cache
//! hit/miss interleaving and worker completion order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::Fragments;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    fragments: Fragments,
    occurrences: BTreeMap<String, u64>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one document's results in.
    pub fn merge(&mut self, partial: &Fragments) {
        self.fragments.merge(partial);
        for (category, set) in partial.iter() {
            *self.occurrences.entry(category.to_string()).or_default() += set.len() as u64;
        }
    }

    /// Folds another aggregate in.
    pub fn absorb(&mut self, other: Aggregate) {
        self.fragments.merge(&other.fragments);
        for (category, n) in other.occurrences {
            *self.occurrences.entry(category).or_default() += n;
        }
    }

    pub fn fragments(&self) -> &Fragments {
        &self.fragments
    }

    /// Categories in sorted order with their deduplicated fragment sets.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.fragments.iter()
    }

    pub fn occurrences(&self, category: &str) -> u64 {
        self.occurrences.get(category).copied().unwrap_or(0)
    }

    pub fn category_count(&self) -> usize {
        self.fragments.category_count()
    }

    /// Number of unique fragments across all categories.
    pub fn total_fragments(&self) -> usize {
        self.fragments.fragment_count()
    }
}
