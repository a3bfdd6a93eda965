//! Caller-owned cache of loaded document frequency models.
//!
//! The cache is an ordinary value: whoever builds the scoring setup creates
//! it, passes it by reference where models are needed and drops or clears it
//! when done. Nothing in the crate keeps models alive behind the caller's back.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::df::DocumentFrequencyModel;
use crate::error::{StatsError, StatsResult};

#[derive(Debug, Default)]
pub struct ModelCache {
    models: HashMap<PathBuf, Arc<DocumentFrequencyModel>>,
}

/// Canonical form of `path`, so `./df.cbor` and `df.cbor` share an entry
fn cache_key(path: &Path) -> StatsResult<PathBuf> {
    fs::canonicalize(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StatsError::ModelNotFound(path.to_path_buf()),
        _ => StatsError::io(path, e),
    })
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the model stored at `path`, loading it on first use
    pub fn get_or_load(&mut self, path: &Path) -> StatsResult<Arc<DocumentFrequencyModel>> {
        let key = cache_key(path)?;
        if let Some(model) = self.models.get(&key) {
            debug!(path = %key.display(), "model cache hit");
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(DocumentFrequencyModel::load(&key)?);
        self.models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Register an in-memory model under `path` (for example one just saved there)
    pub fn insert(&mut self, path: &Path, model: DocumentFrequencyModel) -> StatsResult<Arc<DocumentFrequencyModel>> {
        let key = cache_key(path)?;
        let model = Arc::new(model);
        self.models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Drop the entry for `path`; scorers holding the model keep their `Arc`
    pub fn evict(&mut self, path: &Path) -> Option<Arc<DocumentFrequencyModel>> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.models.remove(&key)
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::df::DocumentFrequencyBuilder;
    use crate::source::Document;

    fn saved_model(dir: &Path) -> PathBuf {
        let mut builder = DocumentFrequencyBuilder::new();
        builder.begin_training().unwrap();
        builder.add_document(&Document::from_tokens(["a", "b"])).unwrap();
        let path = dir.join("df.cbor");
        builder.freeze().unwrap().save(&path).unwrap();
        path
    }

    #[test]
    fn loads_once_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_model(dir.path());
        let mut cache = ModelCache::new();

        let first = cache.get_or_load(&path).unwrap();
        let alias = dir.path().join(".").join("df.cbor");
        let second = cache.get_or_load(&alias).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.document_frequency("a"), 1);
    }

    #[test]
    fn evict_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_model(dir.path());
        let mut cache = ModelCache::new();
        let held = cache.get_or_load(&path).unwrap();

        assert!(cache.evict(&path).is_some());
        assert!(cache.is_empty());
        // the scorer side keeps working with its own handle
        assert_eq!(held.document_count(), 1);

        let reloaded = cache.get_or_load(&path).unwrap();
        assert!(!Arc::ptr_eq(&held, &reloaded));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ModelCache::new();
        let err = cache.get_or_load(&dir.path().join("nope.cbor")).unwrap_err();
        assert!(matches!(err, StatsError::ModelNotFound(_)));
    }

    #[test]
    fn insert_registers_without_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_model(dir.path());
        let mut cache = ModelCache::new();
        let model = DocumentFrequencyModel::load(&path).unwrap();
        let inserted = cache.insert(&path, model).unwrap();
        let fetched = cache.get_or_load(&path).unwrap();
        assert!(Arc::ptr_eq(&inserted, &fetched));
    }
}
