pub mod aggregator;
pub mod scratch;

use std::ops::RangeInclusive;

use crate::config::NGramConfig;
use crate::error::{ConfigError, StatsResult};
use crate::frequency::conditional::ConditionalFrequencyTable;
use crate::source::Document;

/// Default marker prepended to every sentence
pub const DEFAULT_START_MARKER: &str = "<s>";
/// Default marker appended to every sentence
pub const DEFAULT_END_MARKER: &str = "</s>";

/// One n-gram occurrence: its length in tokens and its space-joined text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NGram {
    pub len: usize,
    pub text: String,
}

/// Turns a sentence into overlapping n-grams of every length in
/// `[min_len, max_len]`, bracketed with boundary markers.
///
/// The markers are ordinary terms: `"<s> first"` is a valid bigram.
/// Extraction is a pure function of the sentence and the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NGramExtractor {
    min_len: usize,
    max_len: usize,
    start_marker: String,
    end_marker: String,
}

pub(crate) fn validate_range(min_len: usize, max_len: usize) -> Result<(), ConfigError> {
    if min_len == 0 {
        return Err(ConfigError::ZeroMinLength { actual: min_len });
    }
    if max_len < min_len {
        return Err(ConfigError::InvertedLengthRange { min_len, max_len });
    }
    Ok(())
}

pub(crate) fn validate_marker(marker: &str) -> Result<(), ConfigError> {
    let reason = if marker.is_empty() {
        "marker is empty"
    } else if marker.chars().any(char::is_whitespace) {
        "marker contains whitespace"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidMarker {
        marker: marker.to_string(),
        reason,
    })
}

impl NGramExtractor {
    /// Extractor with the default markers
    pub fn new(min_len: usize, max_len: usize) -> StatsResult<Self> {
        validate_range(min_len, max_len)?;
        Ok(Self {
            min_len,
            max_len,
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
        })
    }

    /// Replace the boundary markers
    pub fn with_markers(mut self, start: &str, end: &str) -> StatsResult<Self> {
        validate_marker(start)?;
        validate_marker(end)?;
        self.start_marker = start.to_string();
        self.end_marker = end.to_string();
        Ok(self)
    }

    pub fn from_config(config: &NGramConfig) -> StatsResult<Self> {
        Self::new(config.min_len, config.max_len)?
            .with_markers(&config.start_marker, &config.end_marker)
    }

    #[inline]
    pub fn lengths(&self) -> RangeInclusive<usize> {
        self.min_len..=self.max_len
    }

    #[inline]
    pub fn start_marker(&self) -> &str {
        &self.start_marker
    }

    #[inline]
    pub fn end_marker(&self) -> &str {
        &self.end_marker
    }

    /// Lazily yield every n-gram of the sentence, shortest lengths first.
    ///
    /// A sentence with `t` tokens yields `t + 2 - k + 1` n-grams of length
    /// `k`, or none when `t + 2 < k`.
    pub fn extract<'a, T>(&'a self, sentence: &'a [T]) -> NGramIter<'a>
    where
        T: AsRef<str>,
    {
        let mut extended = Vec::with_capacity(sentence.len() + 2);
        extended.push(self.start_marker.as_str());
        extended.extend(sentence.iter().map(AsRef::as_ref));
        extended.push(self.end_marker.as_str());
        NGramIter {
            extended,
            len: self.min_len,
            max_len: self.max_len,
            pos: 0,
        }
    }

    /// Tally one sentence into `table`, keyed by n-gram length
    pub fn tally_into<T>(&self, table: &mut ConditionalFrequencyTable<usize>, sentence: &[T])
    where
        T: AsRef<str>,
    {
        for ngram in self.extract(sentence) {
            table.increment(ngram.len, &ngram.text, 1);
        }
    }

    /// Tally every sentence of a document into a fresh table
    pub fn tally_document(&self, document: &Document) -> ConditionalFrequencyTable<usize> {
        let mut table = ConditionalFrequencyTable::new();
        for sentence in &document.sentences {
            self.tally_into(&mut table, sentence);
        }
        table
    }
}

/// Iterator returned by [`NGramExtractor::extract`]
#[derive(Debug, Clone)]
pub struct NGramIter<'a> {
    extended: Vec<&'a str>,
    len: usize,
    max_len: usize,
    pos: usize,
}

impl Iterator for NGramIter<'_> {
    type Item = NGram;

    fn next(&mut self) -> Option<NGram> {
        // no window is longer than the bracketed sentence
        let longest = self.max_len.min(self.extended.len());
        while self.len <= longest {
            if self.pos + self.len <= self.extended.len() {
                let window = &self.extended[self.pos..self.pos + self.len];
                self.pos += 1;
                return Some(NGram {
                    len: self.len,
                    text: window.join(" "),
                });
            }
            self.len += 1;
            self.pos = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.extended.len();
        let mut remaining = 0;
        for k in self.len..=self.max_len.min(n) {
            let windows = n - k + 1;
            remaining += if k == self.len { windows.saturating_sub(self.pos) } else { windows };
        }
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NGramIter<'_> {}
