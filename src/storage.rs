/// Storage backends for wildcard value-sets
///
/// This module provides an async trait for reading and writing the raw
/// contents of named storage units, with implementations for both
/// filesystem-based and in-memory storage.
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Error types for storage access
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    NotFound(String),
    Io(String),
    InvalidName(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(name) => write!(f, "Value-set not found: {}", name),
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
            StorageError::InvalidName(name) => write!(f, "Invalid set name: {}", name),
        }
    }
}

impl std::error::Error for StorageError {}

/// Async trait for raw value-set storage
///
/// One storage unit per set name. The store layer on top of this trait is
/// responsible for parsing, caching, and degrading unreadable units to the
/// empty set; implementations only move bytes.
#[async_trait]
pub trait WildcardStorage: Send + Sync {
    /// Read the raw contents of the named storage unit.
    async fn read(&self, name: &str) -> Result<String, StorageError>;

    /// Overwrite the named storage unit. Partial writes must not become
    /// visible to subsequent reads under normal operation.
    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError>;

    /// List the names of all storage units currently present.
    async fn list(&self) -> Vec<String>;
}

/// Filesystem-based storage
///
/// Each value-set lives in `<base>/<name>.json`. Writes go through a
/// temporary file followed by a rename so readers never observe a
/// half-written unit.
pub struct FolderStorage {
    base_path: PathBuf,
}

impl FolderStorage {
    /// Create a new FolderStorage rooted at the given directory
    ///
    /// # Example
    /// ```no_run
    /// use wildcard_engine::storage::FolderStorage;
    /// use std::path::PathBuf;
    ///
    /// let storage = FolderStorage::new(PathBuf::from("./data/wildcards"));
    /// ```
    pub fn new(base_path: PathBuf) -> Self {
        FolderStorage { base_path }
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        // Sanitize the name to prevent path traversal
        let sanitized = name.replace("..", "").replace(['/', '\\'], "");
        if sanitized.is_empty() {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.base_path.join(format!("{}.json", sanitized)))
    }
}

#[async_trait]
impl WildcardStorage for FolderStorage {
    async fn read(&self, name: &str) -> Result<String, StorageError> {
        let path = self.file_path(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        let path = self.file_path(name)?;
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut dir) = tokio::fs::read_dir(&self.base_path).await else {
            return names;
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        names
    }
}

/// In-memory storage
///
/// Keeps storage units in a shared map, useful for testing and for
/// embedding value-sets directly in an application.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    units: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create a new empty MemoryStorage
    ///
    /// # Example
    /// ```
    /// use wildcard_engine::storage::MemoryStorage;
    ///
    /// let storage = MemoryStorage::new();
    /// storage.add("colors", r#"[{"value": "red"}]"#);
    /// ```
    pub fn new() -> Self {
        MemoryStorage {
            units: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add or replace a storage unit.
    pub fn add(&self, name: impl Into<String>, contents: impl Into<String>) {
        let mut units = self.units.write().unwrap();
        units.insert(name.into(), contents.into());
    }

    /// Remove a storage unit.
    ///
    /// Returns `true` if the unit existed.
    pub fn remove(&self, name: &str) -> bool {
        let mut units = self.units.write().unwrap();
        units.remove(name).is_some()
    }

    /// Check whether a storage unit exists.
    pub fn contains(&self, name: &str) -> bool {
        let units = self.units.read().unwrap();
        units.contains_key(name)
    }

    /// Fetch the raw contents of a unit, if present.
    pub fn get(&self, name: &str) -> Option<String> {
        let units = self.units.read().unwrap();
        units.get(name).cloned()
    }
}

#[async_trait]
impl WildcardStorage for MemoryStorage {
    async fn read(&self, name: &str) -> Result<String, StorageError> {
        let units = self.units.read().unwrap();
        units
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        let mut units = self.units.write().unwrap();
        units.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    async fn list(&self) -> Vec<String> {
        let units = self.units.read().unwrap();
        let mut names: Vec<String> = units.keys().cloned().collect();
        names.sort();
        names
    }
}
