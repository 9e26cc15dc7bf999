//! Selection and result store
//!
//! Ordered set of the models chosen for comparison together with their latest
//! evaluation result. Entries are unique by model name and keep insertion
//! order so charts stay stable. Every mutation is written through to a
//! key-value backend before it becomes visible.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;
use crate::types::evaluation::EvaluationResult;
use crate::types::model::ModelReference;

/// Key holding the ordered selection
pub const SELECTION_KEY: &str = "selectedModels";
/// Key holding the dataset path the user picked
pub const DATASET_PATH_KEY: &str = "datasetPath";

/// Durable string storage keyed by fixed names
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values().remove(key);
        Ok(())
    }
}

/// One JSON file per key, replaced atomically on write
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A model in the comparison set and its latest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedModel {
    pub reference: ModelReference,
    #[serde(default)]
    pub result: Option<EvaluationResult>,
}

impl SelectedModel {
    pub fn new(reference: ModelReference) -> Self {
        Self {
            reference,
            result: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }
}

/// Name-deduplicated, order-preserving selection with write-through persistence
pub struct ResultStore<B: StorageBackend> {
    backend: B,
    entries: Vec<SelectedModel>,
    dataset_path: Option<String>,
}

impl<B: StorageBackend> ResultStore<B> {
    /// Create a store and rehydrate it from the backend
    pub fn init(backend: B) -> Self {
        let mut store = Self {
            backend,
            entries: Vec::new(),
            dataset_path: None,
        };
        store.load();
        store
    }

    /// Reload from the backend
    ///
    /// Unreadable or corrupt payloads are dropped and treated as empty.
    pub fn load(&mut self) {
        self.entries = match self.read_key::<Vec<SelectedModel>>(SELECTION_KEY) {
            Some(entries) => dedupe(entries),
            None => Vec::new(),
        };
        self.dataset_path = self.read_key::<String>(DATASET_PATH_KEY);
        tracing::debug!("Loaded {} selected models", self.entries.len());
    }

    fn read_key<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read '{}', starting empty: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding corrupt '{}': {}", key, e);
                if let Err(e) = self.backend.remove(key) {
                    tracing::warn!("Failed to clear corrupt '{}': {}", key, e);
                }
                None
            }
        }
    }

    /// Persist the current state
    pub fn save(&self) -> Result<(), StorageError> {
        self.persist_entries(&self.entries)?;
        match &self.dataset_path {
            Some(path) => self
                .backend
                .write(DATASET_PATH_KEY, &serde_json::to_string(path)?),
            None => self.backend.remove(DATASET_PATH_KEY),
        }
    }

    fn persist_entries(&self, entries: &[SelectedModel]) -> Result<(), StorageError> {
        let json = serde_json::to_string(entries)?;
        self.backend.write(SELECTION_KEY, &json)?;
        tracing::debug!("Persisted {} selected models", entries.len());
        Ok(())
    }

    /// Swap in `next` only once it is persisted
    fn commit(&mut self, next: Vec<SelectedModel>) -> Result<(), StorageError> {
        self.persist_entries(&next)?;
        self.entries = next;
        Ok(())
    }

    /// Add an entry; a name already present wins and the call is a no-op
    ///
    /// Returns whether the entry was inserted.
    pub fn add(&mut self, entry: SelectedModel) -> Result<bool, StorageError> {
        if self.contains(entry.name()) {
            return Ok(false);
        }
        let mut next = self.entries.clone();
        next.push(entry);
        self.commit(next)?;
        Ok(true)
    }

    /// Remove the entry with `name`; absent names are a no-op
    pub fn remove(&mut self, name: &str) -> Result<bool, StorageError> {
        let Some(pos) = self.entries.iter().position(|e| e.name() == name) else {
            return Ok(false);
        };
        let mut next = self.entries.clone();
        next.remove(pos);
        self.commit(next)?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.commit(Vec::new())
    }

    /// Replace the result of an already selected model
    ///
    /// Returns false when the model is not part of the selection.
    pub fn record_result(&mut self, result: EvaluationResult) -> Result<bool, StorageError> {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.name() == result.model_name)
        else {
            return Ok(false);
        };
        let mut next = self.entries.clone();
        next[pos].result = Some(result);
        self.commit(next)?;
        Ok(true)
    }

    pub fn list(&self) -> &[SelectedModel] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&SelectedModel> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dataset_path(&self) -> Option<&str> {
        self.dataset_path.as_deref()
    }

    pub fn set_dataset_path(&mut self, path: Option<String>) -> Result<(), StorageError> {
        match &path {
            Some(p) => self
                .backend
                .write(DATASET_PATH_KEY, &serde_json::to_string(p)?)?,
            None => self.backend.remove(DATASET_PATH_KEY)?,
        }
        self.dataset_path = path;
        Ok(())
    }
}

/// Keep the first entry per name
fn dedupe(entries: Vec<SelectedModel>) -> Vec<SelectedModel> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.name().to_string()))
        .collect()
}
