use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frequency::FrequencyTable;

/// A FrequencyTable per condition (e.g. n-gram length).
///
/// Conditions are created lazily on first use and kept in ascending order.
/// Every nested table keeps its own `sum(counts) == total` invariant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConditionalFrequencyTable<C = usize>
where
    C: Ord,
{
    tables: BTreeMap<C, FrequencyTable>,
}

impl<C> Default for ConditionalFrequencyTable<C>
where
    C: Ord,
{
    fn default() -> Self {
        Self { tables: BTreeMap::new() }
    }
}

impl<C> ConditionalFrequencyTable<C>
where
    C: Ord + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Increase the count of `term` under `condition` by `delta`
    #[inline]
    pub fn increment(&mut self, condition: C, term: &str, delta: u64) -> &mut Self {
        self.tables.entry(condition).or_default().increment(term, delta);
        self
    }

    /// Tally every term in `sequence` under `condition`, one per occurrence
    /// (multiset semantics: repeats are counted).
    pub fn add_sequence<I, T>(&mut self, condition: C, sequence: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let table = self.tables.entry(condition).or_default();
        for term in sequence {
            table.add_term(term.as_ref());
        }
        self
    }

    /// Count of `term` under `condition`, 0 if either is absent
    #[inline]
    pub fn get(&self, condition: &C, term: &str) -> u64 {
        self.tables.get(condition).map_or(0, |t| t.get(term))
    }

    /// Table for a condition, if anything was tallied under it
    #[inline]
    pub fn table(&self, condition: &C) -> Option<&FrequencyTable> {
        self.tables.get(condition)
    }

    /// Conditions in ascending order
    pub fn conditions(&self) -> impl Iterator<Item = &C> {
        self.tables.keys()
    }

    /// Sum of the totals of every nested table
    pub fn total_count(&self) -> u64 {
        self.tables.values().map(FrequencyTable::total_count).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(FrequencyTable::is_empty)
    }

    /// Merge per condition, creating conditions missing from self
    pub fn merge(&mut self, other: &ConditionalFrequencyTable<C>) -> &mut Self {
        for (condition, table) in &other.tables {
            self.tables.entry(condition.clone()).or_default().merge(table);
        }
        self
    }

    /// Iterate (condition, table) pairs in ascending condition order
    pub fn iter(&self) -> impl Iterator<Item = (&C, &FrequencyTable)> {
        self.tables.iter()
    }

    /// Drain into (condition, table) pairs
    pub fn into_tables(self) -> impl Iterator<Item = (C, FrequencyTable)> {
        self.tables.into_iter()
    }
}
