pub mod persist;

use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{StatsError, StatsResult};
use crate::source::Document;

/// Frozen document frequency statistics of a corpus.
///
/// Holds, for every term seen in training, the number of documents that
/// contain it, plus the total number of documents `N`. A term contributes
/// at most once per document, so `df(term) <= N` always holds.
///
/// A model is read-only once built; share it behind an `Arc` for
/// concurrent scoring.
///
/// Models only come from a frozen builder or from [`load`](Self::load);
/// there is no public constructor for an empty one.
///
/// ```compile_fail
/// let model = corpus_stats::DocumentFrequencyModel::default();
/// ```
#[derive(Debug, Clone)]
pub struct DocumentFrequencyModel {
    /// number of documents seen in training
    doc_num: u64,
    /// term -> number of documents containing it
    term_counts: HashMap<Box<str>, u64, RandomState>,
}

impl PartialEq for DocumentFrequencyModel {
    fn eq(&self, other: &Self) -> bool {
        self.doc_num == other.doc_num && self.term_counts == other.term_counts
    }
}

impl Eq for DocumentFrequencyModel {}

impl DocumentFrequencyModel {
    pub(crate) fn empty() -> Self {
        Self {
            doc_num: 0,
            term_counts: HashMap::with_hasher(RandomState::new()),
        }
    }

    pub(crate) fn from_parts<I>(doc_num: u64, terms: I) -> Self
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut model = Self::empty();
        model.doc_num = doc_num;
        model.term_counts.extend(terms.into_iter().map(|(t, c)| (t.into_boxed_str(), c)));
        model
    }

    /// Count one document given its terms; repeats inside the document
    /// are collapsed first.
    fn add_set<'a, I>(&mut self, terms: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: HashSet<&str, RandomState> = terms.into_iter().collect();
        for term in distinct {
            match self.term_counts.get_mut(term) {
                Some(count) => *count += 1,
                None => {
                    self.term_counts.insert(term.into(), 1);
                }
            }
        }
        self.doc_num += 1;
    }

    /// Number of training documents containing `term`, 0 if never seen
    #[inline]
    pub fn document_frequency(&self, term: &str) -> u64 {
        self.term_counts.get(term).copied().unwrap_or(0)
    }

    /// Total number of training documents (N)
    #[inline]
    pub fn document_count(&self) -> u64 {
        self.doc_num
    }

    /// Number of distinct terms
    #[inline]
    pub fn vocabulary_size(&self) -> usize {
        self.term_counts.len()
    }

    #[inline]
    pub fn contains(&self, term: &str) -> bool {
        self.term_counts.contains_key(term)
    }

    /// Iterator over (term, df), in no particular order
    pub fn terms(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_counts.iter().map(|(term, &count)| (&**term, count))
    }

    /// Combine with a model trained on a disjoint set of documents.
    ///
    /// Sums df per term and N; the result equals a model trained on both
    /// document sets in one pass, in any order.
    pub fn merge(mut self, other: &DocumentFrequencyModel) -> DocumentFrequencyModel {
        for (term, &count) in &other.term_counts {
            self.term_counts
                .entry(term.clone())
                .and_modify(|c| *c += count)
                .or_insert(count);
        }
        self.doc_num += other.doc_num;
        self
    }

    /// Check `df <= N` for every term
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        match self.terms().find(|&(_, df)| df > self.doc_num) {
            Some((term, df)) => Err(format!(
                "term {term:?} has document frequency {df} > document count {}",
                self.doc_num
            )),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainingState {
    Uninitialized,
    Training,
    Frozen,
}

impl TrainingState {
    fn name(self) -> &'static str {
        match self {
            TrainingState::Uninitialized => "UNINITIALIZED",
            TrainingState::Training => "TRAINING",
            TrainingState::Frozen => "FROZEN",
        }
    }
}

/// Builds a [`DocumentFrequencyModel`] in one pass over a corpus.
///
/// State machine: `UNINITIALIZED -> TRAINING -> FROZEN`. Documents are only
/// accepted while training; after [`freeze`](Self::freeze) the builder is
/// spent and every further call is an error.
#[derive(Debug)]
pub struct DocumentFrequencyBuilder {
    state: TrainingState,
    model: DocumentFrequencyModel,
}

impl Default for DocumentFrequencyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentFrequencyBuilder {
    pub fn new() -> Self {
        Self {
            state: TrainingState::Uninitialized,
            model: DocumentFrequencyModel::empty(),
        }
    }

    fn invalid(&self, operation: &'static str) -> StatsError {
        StatsError::InvalidState {
            operation,
            state: self.state.name(),
        }
    }

    pub fn begin_training(&mut self) -> StatsResult<()> {
        if self.state != TrainingState::Uninitialized {
            return Err(self.invalid("begin_training"));
        }
        self.state = TrainingState::Training;
        info!("begin document frequency training");
        Ok(())
    }

    /// Count every distinct term of the document once, and the document itself
    pub fn add_document(&mut self, document: &Document) -> StatsResult<()> {
        if self.state != TrainingState::Training {
            return Err(self.invalid("add_document"));
        }
        self.model.add_set(document.tokens());
        Ok(())
    }

    /// Documents seen so far
    #[inline]
    pub fn documents_seen(&self) -> u64 {
        self.model.document_count()
    }

    /// Emit the immutable model and stop accepting documents
    pub fn freeze(&mut self) -> StatsResult<DocumentFrequencyModel> {
        if self.state != TrainingState::Training {
            return Err(self.invalid("freeze"));
        }
        self.state = TrainingState::Frozen;
        let model = std::mem::replace(&mut self.model, DocumentFrequencyModel::empty());
        info!(
            documents = model.document_count(),
            vocabulary = model.vocabulary_size(),
            "froze document frequency model"
        );
        Ok(model)
    }

    /// Train over `documents` with one shard-local model per worker,
    /// then reduce the shards by summation.
    ///
    /// The result is identical to a sequential pass.
    pub fn train_parallel(documents: &[Document], workers: usize) -> DocumentFrequencyModel {
        let chunk_size = documents.len().div_ceil(workers.max(1)).max(1);
        let model = documents
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut shard = DocumentFrequencyModel::empty();
                for document in chunk {
                    shard.add_set(document.tokens());
                }
                debug!(documents = shard.document_count(), "trained shard");
                shard
            })
            .reduce(DocumentFrequencyModel::empty, |acc, shard| acc.merge(&shard));
        info!(
            documents = model.document_count(),
            vocabulary = model.vocabulary_size(),
            "trained document frequency model in parallel"
        );
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(documents: &[Document]) -> DocumentFrequencyModel {
        let mut builder = DocumentFrequencyBuilder::new();
        builder.begin_training().unwrap();
        for doc in documents {
            builder.add_document(doc).unwrap();
        }
        builder.freeze().unwrap()
    }

    fn example_corpus() -> Vec<Document> {
        vec![
            Document::from_tokens(["example", "sentence", "funny"]),
            Document::from_tokens(["example", "example", "sentence"]),
        ]
    }

    #[test]
    fn two_document_corpus() {
        let model = train(&example_corpus());
        assert_eq!(model.document_count(), 2);
        assert_eq!(model.document_frequency("example"), 2);
        assert_eq!(model.document_frequency("sentence"), 2);
        assert_eq!(model.document_frequency("funny"), 1);
        assert_eq!(model.document_frequency("unseen"), 0);
        assert_eq!(model.vocabulary_size(), 3);
    }

    #[test]
    fn repeats_across_sentences_count_once() {
        let doc = Document::from_sentences(vec![vec!["x", "x", "x"], vec!["x", "y"]]);
        let model = train(&[doc.clone(), doc]);
        assert_eq!(model.document_frequency("x"), 2);
        assert_eq!(model.document_frequency("y"), 2);
        assert!(model.check_invariants().is_ok());
    }

    #[test]
    fn empty_documents_still_count_toward_n() {
        let model = train(&[Document::new(), Document::from_tokens(["a"])]);
        assert_eq!(model.document_count(), 2);
        assert_eq!(model.document_frequency("a"), 1);
    }

    #[test]
    fn state_machine_is_enforced() {
        let mut builder = DocumentFrequencyBuilder::new();
        let doc = Document::from_tokens(["a"]);
        assert!(matches!(
            builder.add_document(&doc),
            Err(StatsError::InvalidState { operation: "add_document", state: "UNINITIALIZED" })
        ));
        assert!(builder.freeze().is_err());

        builder.begin_training().unwrap();
        assert!(builder.begin_training().is_err());
        builder.add_document(&doc).unwrap();
        assert_eq!(builder.documents_seen(), 1);
        builder.freeze().unwrap();

        assert!(matches!(
            builder.add_document(&doc),
            Err(StatsError::InvalidState { operation: "add_document", state: "FROZEN" })
        ));
        assert!(builder.freeze().is_err());
    }

    #[test]
    fn merge_over_any_partition_equals_sequential() {
        let docs: Vec<Document> = (0..30)
            .map(|i| Document::from_tokens((0..(i % 4 + 1)).map(|j| format!("w{}", (i + j) % 6))))
            .collect();
        let sequential = train(&docs);

        let a = train(&docs[..7]);
        let b = train(&docs[7..19]);
        let c = train(&docs[19..]);

        let abc = a.clone().merge(&b).merge(&c);
        let cba = c.clone().merge(&b).merge(&a);
        let a_bc = a.clone().merge(&b.clone().merge(&c));

        assert_eq!(abc, sequential);
        assert_eq!(cba, sequential);
        assert_eq!(a_bc, sequential);
    }

    #[test]
    fn parallel_training_matches_sequential() {
        let docs: Vec<Document> = (0..50)
            .map(|i| Document::from_tokens((0..(i % 5)).map(|j| format!("t{}", (i * j) % 7))))
            .collect();
        let sequential = train(&docs);
        for workers in [0, 1, 4, 16, 100] {
            assert_eq!(DocumentFrequencyBuilder::train_parallel(&docs, workers), sequential);
        }
        assert_eq!(
            DocumentFrequencyBuilder::train_parallel(&[], 4),
            DocumentFrequencyModel::empty()
        );
    }

    #[test]
    fn df_never_exceeds_n() {
        let docs: Vec<Document> = (0..20)
            .map(|i| Document::from_tokens(std::iter::repeat("same").take(i + 1)))
            .collect();
        let model = train(&docs);
        for (_, df) in model.terms() {
            assert!(df <= model.document_count());
        }
        assert_eq!(model.document_frequency("same"), 20);
    }
}
