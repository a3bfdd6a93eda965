//! Error definitions

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors, raised while validating an `EngineConfig`
/// or constructing an extractor/aggregator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// min_len must be at least 1
    #[error("n-gram min_len must be >= 1: actual={actual}")]
    ZeroMinLength {
        /// value that was given
        actual: usize,
    },

    /// max_len < min_len
    #[error("n-gram max_len must be >= min_len: min_len={min_len}, max_len={max_len}")]
    InvertedLengthRange {
        /// lower bound
        min_len: usize,
        /// upper bound
        max_len: usize,
    },

    /// boundary markers may not be empty or contain whitespace/tab
    #[error("invalid sentence boundary marker {marker:?}: {reason}")]
    InvalidMarker {
        /// offending marker
        marker: String,
        /// why it was rejected
        reason: &'static str,
    },

    /// output directory exists but is not a directory
    #[error("output path is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    /// min_frequency must be at least 1
    #[error("min_frequency must be >= 1")]
    ZeroMinFrequency,

    /// scoring needs `scoring.model_path`
    #[error("scoring.model_path is not set")]
    MissingModelPath,

    /// config text could not be parsed
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced by the statistics engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    /// Reading or writing a scratch, count or model file failed.
    /// The current pass is aborted; partial outputs are not valid.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// file or directory involved
        path: PathBuf,
        /// underlying error
        #[source]
        source: io::Error,
    },

    /// An operation was called out of protocol order,
    /// e.g. `add_document` after `freeze` or `end_corpus`.
    #[error("`{operation}` is not allowed in state {state}")]
    InvalidState {
        /// operation that was attempted
        operation: &'static str,
        /// state the component was in
        state: &'static str,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scoring was requested but no frozen model exists at the given path.
    #[error("document frequency model not found: {0:?}")]
    ModelNotFound(PathBuf),

    /// A persisted model was readable but violates the model invariants.
    #[error("corrupt document frequency model {path:?}: {reason}")]
    CorruptModel {
        /// model file
        path: PathBuf,
        /// violated invariant
        reason: String,
    },

    /// CBOR encoding/decoding of a model failed
    #[error("model serialization failed: {0}")]
    Serialize(#[from] serde_cbor::Error),
}

impl StatsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StatsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used by every fallible engine API.
pub type StatsResult<T> = Result<T, StatsError>;
