pub mod cache;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::df::DocumentFrequencyModel;
use crate::error::{ConfigError, StatsResult};
use crate::frequency::FrequencyTable;
use crate::source::Document;
use crate::tfidf::cache::ModelCache;

/// How the in-document count of a term becomes its tf weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TfMode {
    /// raw count
    #[default]
    Normal,
    /// 1 if the term occurs, else 0
    Binary,
}

impl TfMode {
    #[inline]
    pub fn weight(self, count: u64) -> f64 {
        match self {
            TfMode::Normal => count as f64,
            TfMode::Binary => {
                if count > 0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// How document frequency becomes the idf weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdfMode {
    /// always 1
    ConstantOne,
    /// 1 if the term was seen in training, else 0
    Binary,
    /// ln(N / df), natural logarithm
    #[default]
    Log,
}

impl IdfMode {
    /// idf for a term with document frequency `df` in a corpus of `n`
    /// documents. Callers must not pass `df == 0` in `Log` mode.
    #[inline]
    pub fn weight(self, df: u64, n: u64) -> f64 {
        match self {
            IdfMode::ConstantOne => 1.0,
            IdfMode::Binary => {
                if df > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            IdfMode::Log => (n as f64 / df as f64).ln(),
        }
    }
}

/// What to do with a term the model never saw (df = 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnseenTermPolicy {
    /// emit no record for the term, in every mode
    #[default]
    Skip,
    /// use df + 1 and N + 1 for every term, seen or not, in every mode
    AddOneSmoothing,
}

/// Weight of one distinct term of a scored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub term: String,
    /// occurrences of the term in the document
    pub count: u64,
    pub weight: f64,
}

impl fmt::Display for TermWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{:.6}", self.term, self.weight)
    }
}

/// Computes tf x idf weights against a frozen document frequency model.
///
/// The model is shared read-only, so one scorer (or clones of it) can score
/// any number of documents concurrently.
#[derive(Debug, Clone)]
pub struct TfidfScorer {
    model: Arc<DocumentFrequencyModel>,
    tf_mode: TfMode,
    idf_mode: IdfMode,
    unseen: UnseenTermPolicy,
}

impl TfidfScorer {
    pub fn new(model: Arc<DocumentFrequencyModel>, tf_mode: TfMode, idf_mode: IdfMode) -> Self {
        Self {
            model,
            tf_mode,
            idf_mode,
            unseen: UnseenTermPolicy::default(),
        }
    }

    pub fn with_unseen_policy(mut self, policy: UnseenTermPolicy) -> Self {
        self.unseen = policy;
        self
    }

    /// Load the persisted model at `path`.
    ///
    /// Fails with `ModelNotFound` if nothing was frozen there.
    pub fn from_path(path: &Path, tf_mode: TfMode, idf_mode: IdfMode) -> StatsResult<Self> {
        let model = DocumentFrequencyModel::load(path)?;
        Ok(Self::new(Arc::new(model), tf_mode, idf_mode))
    }

    /// Build from configuration, loading the model through a caller-owned cache
    pub fn from_config(config: &ScoringConfig, cache: &mut ModelCache) -> StatsResult<Self> {
        let path = config
            .model_path
            .as_deref()
            .ok_or(ConfigError::MissingModelPath)?;
        let model = cache.get_or_load(path)?;
        Ok(Self::new(model, config.tf_mode, config.idf_mode).with_unseen_policy(config.unseen_terms))
    }

    #[inline]
    pub fn model(&self) -> &DocumentFrequencyModel {
        &self.model
    }

    #[inline]
    pub fn tf_mode(&self) -> TfMode {
        self.tf_mode
    }

    #[inline]
    pub fn idf_mode(&self) -> IdfMode {
        self.idf_mode
    }

    #[inline]
    pub fn unseen_policy(&self) -> UnseenTermPolicy {
        self.unseen
    }

    /// idf of `term`, or `None` if the unseen-term policy drops it
    pub fn idf(&self, term: &str) -> Option<f64> {
        let df = self.model.document_frequency(term);
        let n = self.model.document_count();
        match self.unseen {
            UnseenTermPolicy::Skip if df == 0 => None,
            UnseenTermPolicy::Skip => Some(self.idf_mode.weight(df, n)),
            UnseenTermPolicy::AddOneSmoothing => Some(self.idf_mode.weight(df + 1, n + 1)),
        }
    }

    /// One weight per distinct term of the document, in order of first
    /// occurrence.
    pub fn score(&self, document: &Document) -> Vec<TermWeight> {
        let counts: FrequencyTable = document.tokens().collect();
        let weights: Vec<TermWeight> = counts
            .iter()
            .filter_map(|(term, count)| {
                let idf = self.idf(term)?;
                Some(TermWeight {
                    term: term.to_string(),
                    count,
                    weight: self.tf_mode.weight(count) * idf,
                })
            })
            .collect();
        debug!(
            distinct = counts.distinct_count(),
            scored = weights.len(),
            "scored document"
        );
        weights
    }

    /// Like [`score`](Self::score), ordered by descending weight, ties by term
    pub fn score_sorted(&self, document: &Document) -> Vec<TermWeight> {
        let mut weights = self.score(document);
        weights.sort_by(|a, b| b.weight.total_cmp(&a.weight).then_with(|| a.term.cmp(&b.term)));
        weights
    }

    /// Score many documents in parallel against the shared model
    pub fn score_all(&self, documents: &[Document]) -> Vec<Vec<TermWeight>> {
        documents.par_iter().map(|doc| self.score(doc)).collect()
    }
}
