//! Corpus-wide n-gram counting with bounded memory.
//!
//! The pass runs in two phases:
//!
//! 1. accumulate/flush: every document is tallied on its own and appended to
//!    a per-length scratch file of some [`ScratchShard`]. Memory is bounded
//!    by the distinct n-grams of a single document.
//! 2. reduce: at [`NGramCorpusAggregator::end_corpus`] the scratch files of
//!    every shard are streamed, length by length, into one
//!    [`FrequencyTable`], which is written out sorted and deduplicated.
//!
//! # Memory ceiling
//! The reduce phase holds every distinct n-gram of one length across the
//! whole corpus in memory at once. That table is the upper bound on memory
//! for the entire pass; nothing else grows with corpus size.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rayon::prelude::*;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::NGramConfig;
use crate::error::{StatsError, StatsResult};
use crate::frequency::FrequencyTable;
use crate::ngram::scratch::{merge_counts_file, ScratchShard, ShardFiles};
use crate::ngram::NGramExtractor;
use crate::source::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregatorState {
    Idle,
    Accumulating,
    Finished,
}

impl AggregatorState {
    fn name(self) -> &'static str {
        match self {
            AggregatorState::Idle => "IDLE",
            AggregatorState::Accumulating => "ACCUMULATING",
            AggregatorState::Finished => "FINISHED",
        }
    }
}

/// Result of reducing one n-gram length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthReport {
    pub len: usize,
    /// final sorted count file
    pub path: PathBuf,
    /// lines written to the final file
    pub distinct: u64,
    /// sum of the counts written to the final file
    pub total: u64,
    /// n-grams dropped by `min_frequency`
    pub below_min_frequency: u64,
    /// scratch lines that could not be parsed
    pub malformed_lines: u64,
}

/// Summary returned by [`NGramCorpusAggregator::end_corpus`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusReport {
    pub documents: u64,
    pub shards: usize,
    /// n-gram occurrences that could not be written (embedded separators)
    pub unwritable: u64,
    pub lengths: Vec<LengthReport>,
}

impl CorpusReport {
    pub fn length(&self, len: usize) -> Option<&LengthReport> {
        self.lengths.iter().find(|r| r.len == len)
    }
}

/// Drives a full n-gram counting pass over a corpus.
///
/// Protocol: [`begin_corpus`](Self::begin_corpus), any number of
/// [`add_document`](Self::add_document), then [`end_corpus`](Self::end_corpus).
/// Extra workers can take their own [`ScratchShard`] from
/// [`shard`](Self::shard) and return it through
/// [`absorb_shard`](Self::absorb_shard) before `end_corpus`.
///
/// Dropping an aggregator before `end_corpus` discards every scratch file.
#[derive(Debug)]
pub struct NGramCorpusAggregator {
    config: NGramConfig,
    state: AggregatorState,
    extractor: Option<NGramExtractor>,
    local: Option<ScratchShard>,
    flushed: Vec<ShardFiles>,
    next_shard_id: usize,
}

impl NGramCorpusAggregator {
    /// Create an idle aggregator. Markers, output layout and
    /// `min_frequency` come from `config`.
    pub fn new(config: NGramConfig) -> StatsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: AggregatorState::Idle,
            extractor: None,
            local: None,
            flushed: Vec::new(),
            next_shard_id: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &NGramConfig {
        &self.config
    }

    fn expect_state(&self, expected: AggregatorState, operation: &'static str) -> StatsResult<()> {
        if self.state != expected {
            return Err(StatsError::InvalidState {
                operation,
                state: self.state.name(),
            });
        }
        Ok(())
    }

    /// Open one scratch output per length in `[min_len, max_len]`
    pub fn begin_corpus(&mut self, min_len: usize, max_len: usize) -> StatsResult<()> {
        self.expect_state(AggregatorState::Idle, "begin_corpus")?;
        let mut config = self.config.clone();
        config.min_len = min_len;
        config.max_len = max_len;
        config.validate()?;
        let extractor = NGramExtractor::from_config(&config)?;
        self.config = config;

        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|e| StatsError::io(dir, e))?;

        let local = ScratchShard::create(&self.config, extractor.clone(), self.next_shard_id)?;
        self.next_shard_id += 1;
        self.local = Some(local);
        self.extractor = Some(extractor);
        self.state = AggregatorState::Accumulating;
        info!(min_len, max_len, output_dir = %self.config.output_dir.display(), "begin corpus");
        Ok(())
    }

    /// Tally a document and append its counts to the scratch outputs
    pub fn add_document(&mut self, document: &Document) -> StatsResult<()> {
        self.expect_state(AggregatorState::Accumulating, "add_document")?;
        match self.local.as_mut() {
            Some(local) => local.add_document(document),
            None => Err(StatsError::InvalidState {
                operation: "add_document",
                state: self.state.name(),
            }),
        }
    }

    /// A fresh, independent shard for another worker
    pub fn shard(&mut self) -> StatsResult<ScratchShard> {
        self.expect_state(AggregatorState::Accumulating, "shard")?;
        let Some(extractor) = self.extractor.clone() else {
            return Err(StatsError::InvalidState {
                operation: "shard",
                state: self.state.name(),
            });
        };
        let shard = ScratchShard::create(&self.config, extractor, self.next_shard_id)?;
        self.next_shard_id += 1;
        Ok(shard)
    }

    /// Hand a worker's shard back for the reduce phase
    pub fn absorb_shard(&mut self, shard: ScratchShard) -> StatsResult<()> {
        self.expect_state(AggregatorState::Accumulating, "absorb_shard")?;
        let files = shard.finish()?;
        debug!(shard = files.id, documents = files.documents, "absorbed shard");
        self.flushed.push(files);
        Ok(())
    }

    /// Reduce all scratch files into one sorted count file per length
    pub fn end_corpus(&mut self) -> StatsResult<CorpusReport> {
        self.expect_state(AggregatorState::Accumulating, "end_corpus")?;
        // no further documents are accepted, whatever the outcome below
        self.state = AggregatorState::Finished;

        if let Some(local) = self.local.take() {
            self.flushed.push(local.finish()?);
        }
        let mut shards = std::mem::take(&mut self.flushed);

        let mut report = CorpusReport {
            documents: shards.iter().map(|s| s.documents).sum(),
            shards: shards.len(),
            unwritable: shards.iter().map(|s| s.unwritable).sum(),
            lengths: Vec::new(),
        };

        let mut staged = Vec::new();
        for len in self.config.min_len..=self.config.max_len {
            let mut table = FrequencyTable::new();
            let mut malformed_lines = 0;
            for shard in shards.iter_mut() {
                if let Some(path) = shard.paths.remove(&len) {
                    let merged = merge_counts_file(&path, &mut table);
                    // the scratch file is consumed either way
                    if let Err(e) = fs::remove_file(&path) {
                        warn!(path = %path.display(), error = %e, "failed to remove scratch file");
                    }
                    malformed_lines += merged?;
                }
            }
            // staged files are deleted on drop if a later length fails
            staged.push(self.write_final(len, &table, malformed_lines)?);
        }

        let mut persisted: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (temp, length_report) in staged {
            if let Err(e) = temp.persist(&length_report.path) {
                for path in &persisted {
                    if let Err(e) = fs::remove_file(path) {
                        warn!(path = %path.display(), error = %e, "failed to remove partial output");
                    }
                }
                return Err(StatsError::io(&length_report.path, e.error));
            }
            info!(
                len = length_report.len,
                distinct = length_report.distinct,
                total = length_report.total,
                malformed = length_report.malformed_lines,
                "wrote n-gram counts"
            );
            persisted.push(length_report.path.clone());
            report.lengths.push(length_report);
        }

        info!(documents = report.documents, shards = report.shards, "end corpus");
        Ok(report)
    }

    /// Write the sorted table to a temp file next to its final path.
    /// The caller renames it into place once every length is staged.
    fn write_final(
        &self,
        len: usize,
        table: &FrequencyTable,
        malformed_lines: u64,
    ) -> StatsResult<(NamedTempFile, LengthReport)> {
        let dir = &self.config.output_dir;
        let path = self.config.output_path(len);
        let temp = NamedTempFile::new_in(dir).map_err(|e| StatsError::io(dir, e))?;

        let mut distinct = 0;
        let mut total = 0;
        let mut below_min_frequency = 0;
        {
            let mut out = BufWriter::new(temp.as_file());
            for (term, count) in table.sorted_dict_order_vector() {
                if count < self.config.min_frequency {
                    below_min_frequency += 1;
                    continue;
                }
                writeln!(out, "{term}\t{count}").map_err(|e| StatsError::io(temp.path(), e))?;
                distinct += 1;
                total += count;
            }
            out.flush().map_err(|e| StatsError::io(temp.path(), e))?;
        }
        Ok((
            temp,
            LengthReport {
                len,
                path,
                distinct,
                total,
                below_min_frequency,
                malformed_lines,
            },
        ))
    }
}

impl Drop for NGramCorpusAggregator {
    fn drop(&mut self) {
        if self.state == AggregatorState::Accumulating {
            warn!(
                output_dir = %self.config.output_dir.display(),
                "aggregation aborted before end_corpus; discarding scratch files"
            );
        }
    }
}

/// Run a whole pass with one scratch shard per worker.
///
/// Documents are split into `workers` contiguous chunks which are tallied
/// in parallel; the reduce step is single-threaded. The final files are
/// identical to a sequential pass over the same documents.
pub fn aggregate_parallel(
    config: NGramConfig,
    documents: &[Document],
    workers: usize,
) -> StatsResult<CorpusReport> {
    let (min_len, max_len) = (config.min_len, config.max_len);
    let mut aggregator = NGramCorpusAggregator::new(config)?;
    aggregator.begin_corpus(min_len, max_len)?;

    let chunk_size = documents.len().div_ceil(workers.max(1)).max(1);
    let shards = documents
        .chunks(chunk_size)
        .map(|_| aggregator.shard())
        .collect::<StatsResult<Vec<_>>>()?;

    let shards = documents
        .par_chunks(chunk_size)
        .zip(shards.into_par_iter())
        .map(|(chunk, mut shard)| {
            for document in chunk {
                shard.add_document(document)?;
            }
            Ok::<_, StatsError>(shard)
        })
        .collect::<StatsResult<Vec<_>>>()?;

    for shard in shards {
        aggregator.absorb_shard(shard)?;
    }
    aggregator.end_corpus()
}
