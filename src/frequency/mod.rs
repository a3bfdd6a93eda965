pub mod conditional;

use std::collections::HashSet;

use ahash::RandomState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// FrequencyTable struct
/// Counts occurrences of discrete terms.
///
/// Terms are kept in first-insertion order, so enumerating the distinct
/// terms of two tables built from the same input yields the same sequence.
/// Counts never decrease; the only mutations are increments and merges.
///
/// # Examples
/// ```
/// use corpus_stats::FrequencyTable;
/// let mut freq = FrequencyTable::new();
/// freq.add_term("term1");
/// freq.add_term("term2");
/// freq.add_term("term1");
///
/// assert_eq!(freq.get("term1"), 2);
/// assert_eq!(freq.total_count(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FrequencyTable {
    term_count: IndexMap<String, u64, RandomState>,
    total_count: u64,
}

#[inline]
fn add_count(lhs: u64, rhs: u64) -> u64 {
    lhs.checked_add(rhs)
        .unwrap_or_else(|| panic!("frequency counter overflow: {lhs} + {rhs} exceeds u64"))
}

/// Implementation for tallying terms
impl FrequencyTable {
    /// Create an empty FrequencyTable
    pub fn new() -> Self {
        FrequencyTable {
            term_count: IndexMap::with_hasher(RandomState::new()),
            total_count: 0,
        }
    }

    /// Increase the count of `term` by `delta`
    ///
    /// A zero delta is a no-op, so no entry ever holds a count of 0.
    ///
    /// # Panics
    /// On u64 overflow, which is treated as fatal.
    #[inline]
    pub fn increment(&mut self, term: &str, delta: u64) -> &mut Self {
        if delta == 0 {
            return self;
        }
        match self.term_count.get_mut(term) {
            Some(count) => *count = add_count(*count, delta),
            None => {
                self.term_count.insert(term.to_string(), delta);
            }
        }
        self.total_count = add_count(self.total_count, delta);
        self
    }

    /// Add one occurrence of a term
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        self.increment(term, 1)
    }

    /// Add one occurrence of every term in the slice
    ///
    /// # Arguments
    /// * `terms` - Slice of terms to add
    #[inline]
    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for term in terms {
            self.add_term(term.as_ref());
        }
        self
    }

    /// Merge another table into self by summing counts per term
    ///
    /// Commutative and associative, which is what makes shard-local
    /// tables safe to reduce in any order.
    pub fn merge(&mut self, other: &FrequencyTable) -> &mut Self {
        for (term, &count) in &other.term_count {
            self.increment(term, count);
        }
        self
    }

    /// Reset all counts
    #[inline]
    pub fn clear(&mut self) {
        self.term_count.clear();
        self.total_count = 0;
    }
}

impl<T> FromIterator<T> for FrequencyTable
where
    T: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        table.extend(iter);
        table
    }
}

impl<T> Extend<T> for FrequencyTable
where
    T: AsRef<str>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for term in iter {
            self.add_term(term.as_ref());
        }
    }
}

/// Implementation for reading from a FrequencyTable
impl FrequencyTable {
    /// Count for a term, 0 if absent
    #[inline]
    pub fn get(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    /// Check if a term has been tallied
    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }

    /// Sum of all counts
    #[inline]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Number of distinct terms
    #[inline]
    pub fn distinct_count(&self) -> usize {
        self.term_count.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }

    /// Iterator over distinct terms, in first-insertion order
    #[inline]
    pub fn distinct_terms(&self) -> impl Iterator<Item = &str> {
        self.term_count.keys().map(|s| s.as_str())
    }

    /// Distinct terms as a HashSet
    #[inline]
    pub fn distinct_term_set(&self) -> HashSet<&str, RandomState> {
        self.term_count.keys().map(|s| s.as_str()).collect()
    }

    /// Iterator over terms and their counts, in first-insertion order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_count.iter().map(|(term, &count)| (term.as_str(), count))
    }

    /// Terms sorted by dictionary order (ascending, byte-wise)
    ///
    /// # Returns
    /// * `Vec<(String, u64)>` - terms and counts
    #[inline]
    pub fn sorted_dict_order_vector(&self) -> Vec<(String, u64)> {
        let mut term_list: Vec<(String, u64)> = self
            .term_count
            .iter()
            .map(|(term, &count)| (term.clone(), count))
            .collect();

        term_list.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        term_list
    }

    /// The `n` most frequent terms, descending by count,
    /// ties broken by ascending term
    pub fn most_frequent(&self, n: usize) -> Vec<(&str, u64)> {
        let mut term_list: Vec<(&str, u64)> = self.iter().collect();
        term_list.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        term_list.truncate(n);
        term_list
    }

    /// Consume the table, yielding owned terms and counts
    pub fn into_counts(self) -> impl Iterator<Item = (String, u64)> {
        self.term_count.into_iter()
    }
}

impl PartialEq for FrequencyTable {
    /// Two tables are equal when they hold the same counts,
    /// regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.total_count == other.total_count
            && self.term_count.len() == other.term_count.len()
            && self.iter().all(|(term, count)| other.get(term) == count)
    }
}

impl Eq for FrequencyTable {}
