//! This crate is a corpus statistics engine: n-gram frequency tables and
//! document-frequency-based TF-IDF term weights over tokenized documents.

pub mod config;
pub mod df;
pub mod error;
pub mod frequency;
pub mod ngram;
pub mod source;
pub mod tfidf;

/// Frequency Table
/// A counter over discrete terms (term -> count).
/// It tracks:
/// - The count of each term
/// - The total number of occurrences tallied
///
/// Tables merge by summing counts, which is commutative and associative,
/// so shard-local tables can be reduced in any order.
pub use frequency::FrequencyTable;

/// Conditional Frequency Table
/// One `FrequencyTable` per condition, e.g. per n-gram length.
/// Conditions are created on first use.
pub use frequency::conditional::ConditionalFrequencyTable;

/// N-gram Extractor
/// Turns a sentence into overlapping windows of configurable lengths,
/// bracketed with sentence boundary markers.
pub use ngram::{NGram, NGramExtractor};

/// N-gram Corpus Aggregator
/// Counts n-grams over a whole corpus with bounded memory:
/// per-document counts are flushed to scratch files, then reduced per
/// length into one sorted `term\tcount` file.
///
/// The peak memory of a pass is the number of distinct n-grams of one
/// length across the corpus.
///
/// Extra workers take their own `ScratchShard`; `aggregate_parallel`
/// wires this up with rayon.
pub use ngram::aggregator::{aggregate_parallel, CorpusReport, LengthReport, NGramCorpusAggregator};
pub use ngram::scratch::{read_counts_file, ScratchShard};

/// Document Frequency Model
/// The frozen result of a training pass:
/// - The number of documents (N)
/// - The number of documents in which each term appears
///
/// Used as the base data for IDF (Inverse Document Frequency) calculation.
///
/// # Serialization
/// `save` / `load` persist the model as CBOR and round-trip exactly.
///
/// # Thread Safety
/// Read-only once frozen; share it as `Arc<DocumentFrequencyModel>`.
pub use df::{DocumentFrequencyBuilder, DocumentFrequencyModel};

/// TF-IDF Scorer
/// Weights every distinct term of a document against a frozen
/// `DocumentFrequencyModel`.
///
/// Supported modes:
/// - tf: NORMAL (raw count), BINARY (presence)
/// - idf: CONSTANT_ONE, BINARY (seen in training), LOG (ln(N / df))
///
/// Terms the model never saw follow an `UnseenTermPolicy`.
pub use tfidf::{IdfMode, TermWeight, TfMode, TfidfScorer, UnseenTermPolicy};
pub use tfidf::cache::ModelCache;

/// Documents and token sources
/// A `TokenSource` decides, once at setup, which token text feeds the engine.
pub use source::{to_document, to_documents, Document, Lowercase, PreTokenized, TokenSource, WhitespaceTokenizer};

pub use config::{EngineConfig, NGramConfig, ScoringConfig};
pub use error::{ConfigError, StatsError, StatsResult};
