//! On-disk form of a frozen [`DocumentFrequencyModel`].
//!
//! The model is written as CBOR `{ document_count, terms }` with terms in
//! sorted order, so equal models always produce equal bytes. Writes go to a
//! temp file in the target directory and are renamed into place, so a crash
//! mid-write never leaves a truncated model under the final name.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use crate::df::DocumentFrequencyModel;
use crate::error::{StatsError, StatsResult};

#[derive(Serialize)]
struct ModelRecordRef<'a> {
    document_count: u64,
    terms: BTreeMap<&'a str, u64>,
}

#[derive(Deserialize)]
struct ModelRecord {
    document_count: u64,
    terms: BTreeMap<String, u64>,
}

/// Persist a frozen model to `path`
pub fn save(model: &DocumentFrequencyModel, path: &Path) -> StatsResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;

    let record = ModelRecordRef {
        document_count: model.document_count(),
        terms: model.terms().collect(),
    };

    let temp = NamedTempFile::new_in(parent).map_err(|e| StatsError::io(parent, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_cbor::to_writer(&mut writer, &record)?;
        writer.flush().map_err(|e| StatsError::io(temp.path(), e))?;
    }
    temp.persist(path).map_err(|e| StatsError::io(path, e.error))?;

    info!(
        path = %path.display(),
        documents = record.document_count,
        vocabulary = record.terms.len(),
        "saved document frequency model"
    );
    Ok(())
}

/// Load a model written by [`save`].
///
/// A missing file is [`StatsError::ModelNotFound`]; a file that decodes but
/// has a term with `df > N` is [`StatsError::CorruptModel`].
pub fn load(path: &Path) -> StatsResult<DocumentFrequencyModel> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StatsError::ModelNotFound(path.to_path_buf()),
        _ => StatsError::io(path, e),
    })?;
    let record: ModelRecord = serde_cbor::from_reader(BufReader::new(file)).map_err(|e| {
        StatsError::CorruptModel {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let model = DocumentFrequencyModel::from_parts(record.document_count, record.terms);
    model
        .check_invariants()
        .map_err(|reason| StatsError::CorruptModel {
            path: path.to_path_buf(),
            reason,
        })?;

    info!(
        path = %path.display(),
        documents = model.document_count(),
        vocabulary = model.vocabulary_size(),
        "loaded document frequency model"
    );
    Ok(model)
}

impl DocumentFrequencyModel {
    /// Same as [`save`]
    pub fn save(&self, path: &Path) -> StatsResult<()> {
        save(self, path)
    }

    /// Same as [`load`]
    pub fn load(path: &Path) -> StatsResult<Self> {
        load(path)
    }
}
