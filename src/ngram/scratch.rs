//! Scratch shards: the flush side of the n-gram aggregation.
//!
//! A shard owns one append-only file per n-gram length. Each document is
//! tallied in memory, written out as `term\tcount` lines and dropped, so a
//! shard never holds more than one document's n-grams. Shards share nothing
//! and need no locks; a worker owns its shard outright.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::NGramConfig;
use crate::error::{StatsError, StatsResult};
use crate::frequency::FrequencyTable;
use crate::ngram::NGramExtractor;
use crate::source::Document;

struct ScratchWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

/// Per-worker scratch storage for one aggregation pass
pub struct ScratchShard {
    id: usize,
    extractor: NGramExtractor,
    writers: BTreeMap<usize, ScratchWriter>,
    documents: u64,
    unwritable: u64,
}

impl std::fmt::Debug for ScratchShard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchShard")
            .field("id", &self.id)
            .field("lengths", &self.writers.keys().collect::<Vec<_>>())
            .field("documents", &self.documents)
            .finish()
    }
}

impl ScratchShard {
    /// Open (truncating) one scratch file per configured length
    pub(crate) fn create(
        config: &NGramConfig,
        extractor: NGramExtractor,
        id: usize,
    ) -> StatsResult<Self> {
        let lengths = extractor.lengths();
        // files opened so far are removed by Drop if a later one fails
        let mut shard = Self {
            id,
            extractor,
            writers: BTreeMap::new(),
            documents: 0,
            unwritable: 0,
        };
        for len in lengths {
            let path = config.scratch_path(len, id);
            let file = File::create(&path).map_err(|e| StatsError::io(&path, e))?;
            shard.writers.insert(
                len,
                ScratchWriter {
                    path,
                    out: BufWriter::new(file),
                },
            );
        }
        debug!(shard = id, lengths = shard.writers.len(), "opened scratch shard");
        Ok(shard)
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Documents added so far
    #[inline]
    pub fn documents(&self) -> u64 {
        self.documents
    }

    /// Tally one document and append its per-length counts.
    ///
    /// N-grams containing a tab or newline cannot be represented in the
    /// line format; they are dropped with a warning.
    pub fn add_document(&mut self, document: &Document) -> StatsResult<()> {
        let table = self.extractor.tally_document(document);
        for (len, counts) in table.into_tables() {
            let Some(writer) = self.writers.get_mut(&len) else {
                continue;
            };
            for (term, count) in counts.into_counts() {
                if term.contains(['\t', '\n', '\r']) {
                    warn!(shard = self.id, len, term = ?term, "n-gram contains a line or field separator; dropped");
                    self.unwritable += count;
                    continue;
                }
                writeln!(writer.out, "{term}\t{count}")
                    .map_err(|e| StatsError::io(&writer.path, e))?;
            }
        }
        self.documents += 1;
        Ok(())
    }

    /// Flush every file and hand ownership of them to the reducer
    pub(crate) fn finish(mut self) -> StatsResult<ShardFiles> {
        let mut files = ShardFiles {
            id: self.id,
            documents: self.documents,
            unwritable: self.unwritable,
            paths: BTreeMap::new(),
        };
        let mut flushed: StatsResult<()> = Ok(());
        for (len, ScratchWriter { path, out }) in mem::take(&mut self.writers) {
            if flushed.is_ok() {
                if let Err(e) = out.into_inner() {
                    flushed = Err(StatsError::io(&path, e.into_error()));
                }
            }
            files.paths.insert(len, path);
        }
        // on error `files` drops here and takes the scratch files with it
        flushed?;
        debug!(shard = files.id, documents = files.documents, "flushed scratch shard");
        Ok(files)
    }
}

impl Drop for ScratchShard {
    fn drop(&mut self) {
        // writers are only left here when the shard was abandoned
        for (_, writer) in mem::take(&mut self.writers) {
            let ScratchWriter { path, out } = writer;
            drop(out);
            remove_scratch(&path);
        }
    }
}

/// Flushed scratch files of one shard, owned by the reducer.
///
/// Files still listed when this is dropped are deleted; a scratch file
/// is never meant to outlive its pass.
#[derive(Debug)]
pub(crate) struct ShardFiles {
    pub id: usize,
    pub documents: u64,
    pub unwritable: u64,
    pub paths: BTreeMap<usize, PathBuf>,
}

impl Drop for ShardFiles {
    fn drop(&mut self) {
        for path in self.paths.values() {
            remove_scratch(path);
        }
    }
}

fn remove_scratch(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

/// Parse one `term\tcount` line. `None` for anything else.
pub fn parse_line(line: &str) -> Option<(&str, u64)> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(term), Some(count), None) => count.parse().ok().map(|count| (term, count)),
        _ => None,
    }
}

/// Stream a `term\tcount` file into `table`, summing repeated terms.
///
/// Malformed lines (wrong field count, bad count, invalid UTF-8) are logged
/// and skipped. Returns the number of skipped lines. I/O errors are fatal.
pub fn merge_counts_file(path: &Path, table: &mut FrequencyTable) -> StatsResult<u64> {
    let file = File::open(path).map_err(|e| StatsError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut line_no = 0u64;
    let mut malformed = 0u64;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| StatsError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        match std::str::from_utf8(&buf).ok().and_then(parse_line) {
            Some((term, count)) => {
                table.increment(term, count);
            }
            None => {
                malformed += 1;
                warn!(path = %path.display(), line = line_no, "skipping malformed count line");
            }
        }
    }
    Ok(malformed)
}

/// Read a final count file back as (term, count) pairs in file order
pub fn read_counts_file(path: &Path) -> StatsResult<Vec<(String, u64)>> {
    let mut table = FrequencyTable::new();
    merge_counts_file(path, &mut table)?;
    Ok(table.into_counts().collect())
}
