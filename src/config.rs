//! Engine configuration.
//!
//! ```json
//! {
//!   "ngram": { "min_len": 1, "max_len": 3, "output_dir": "out" },
//!   "scoring": { "tf_mode": "NORMAL", "idf_mode": "LOG", "model_path": "df.cbor" }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, StatsError, StatsResult};
use crate::ngram::{validate_marker, validate_range, DEFAULT_END_MARKER, DEFAULT_START_MARKER};
use crate::tfidf::{IdfMode, TfMode, UnseenTermPolicy};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// [ngram] section
    pub ngram: NGramConfig,
    /// [scoring] section
    pub scoring: ScoringConfig,
}

/// [ngram] section: extraction range, markers and output layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NGramConfig {
    /// shortest n-gram length, >= 1
    pub min_len: usize,
    /// longest n-gram length, >= min_len
    pub max_len: usize,
    pub start_marker: String,
    pub end_marker: String,
    /// directory receiving scratch shards and final count files
    pub output_dir: PathBuf,
    /// final files are named `<file_prefix><len>.txt`
    pub file_prefix: String,
    /// n-grams with a corpus total below this are left out of the final files
    pub min_frequency: u64,
}

impl Default for NGramConfig {
    fn default() -> Self {
        Self {
            min_len: 1,
            max_len: 3,
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            output_dir: PathBuf::from("."),
            file_prefix: "ngrams-".to_string(),
            min_frequency: 1,
        }
    }
}

impl NGramConfig {
    /// Default config writing into `output_dir`
    pub fn new(min_len: usize, max_len: usize, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            min_len,
            max_len,
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_range(self.min_len, self.max_len)?;
        validate_marker(&self.start_marker)?;
        validate_marker(&self.end_marker)?;
        if self.min_frequency == 0 {
            return Err(ConfigError::ZeroMinFrequency);
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::NotADirectory(self.output_dir.clone()));
        }
        Ok(())
    }

    /// Path of the final count file for n-grams of length `len`
    pub fn output_path(&self, len: usize) -> PathBuf {
        self.output_dir.join(format!("{}{}.txt", self.file_prefix, len))
    }

    /// Path of a scratch shard for length `len`
    pub(crate) fn scratch_path(&self, len: usize, shard_id: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.shard-{}.scratch", self.file_prefix, len, shard_id))
    }
}

/// [scoring] section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub tf_mode: TfMode,
    pub idf_mode: IdfMode,
    pub unseen_terms: UnseenTermPolicy,
    /// persisted document frequency model consumed by the scorer
    pub model_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> StatsResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| StatsError::io(path, e))?;
        Ok(Self::from_json_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ngram.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config.ngram.min_len, 1);
        assert_eq!(config.ngram.max_len, 3);
        assert_eq!(config.ngram.start_marker, "<s>");
        assert_eq!(config.scoring.tf_mode, TfMode::Normal);
        assert_eq!(config.scoring.idf_mode, IdfMode::Log);
        assert_eq!(config.scoring.unseen_terms, UnseenTermPolicy::Skip);
        assert!(config.scoring.model_path.is_none());
    }

    #[test]
    fn modes_parse_from_upper_snake_case() {
        let config = EngineConfig::from_json_str(
            r#"{"scoring": {"tf_mode": "BINARY", "idf_mode": "CONSTANT_ONE",
                "unseen_terms": "ADD_ONE_SMOOTHING", "model_path": "df.cbor"}}"#,
        )
        .unwrap();
        assert_eq!(config.scoring.tf_mode, TfMode::Binary);
        assert_eq!(config.scoring.idf_mode, IdfMode::ConstantOne);
        assert_eq!(config.scoring.unseen_terms, UnseenTermPolicy::AddOneSmoothing);
        assert_eq!(config.scoring.model_path, Some(PathBuf::from("df.cbor")));
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"ngram": {"min_len": 3, "max_len": 2}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedLengthRange { min_len: 3, max_len: 2 }));

        let err = EngineConfig::from_json_str(r#"{"ngram": {"min_len": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroMinLength { .. }));

        let err = EngineConfig::from_json_str(r#"{"ngram": {"min_frequency": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroMinFrequency));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ngram").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn output_paths() {
        let config = NGramConfig::new(1, 2, "/tmp/out");
        assert_eq!(config.output_path(2), PathBuf::from("/tmp/out/ngrams-2.txt"));
        assert_eq!(
            config.scratch_path(1, 4),
            PathBuf::from("/tmp/out/ngrams-1.shard-4.scratch")
        );
    }
}
