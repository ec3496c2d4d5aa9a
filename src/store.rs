/// Value-set store: data model, lazy cache, and persistence
///
/// A value-set is a named, ordered collection of scored entries backed by a
/// JSON storage unit. Sets load lazily on first reference and stay cached
/// for the lifetime of the store. Unreadable or malformed storage degrades
/// to the empty set so a missing wildcard never aborts resolution.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::storage::{StorageError, WildcardStorage};

/// One candidate substitution value with its outcome counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    pub value: String,
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub blocked: u64,
    /// Cached projection of `success - blocked`. Persisted for the benefit
    /// of editing tools, but always recomputed on load and on update.
    #[serde(default)]
    pub average: i64,
    /// Unknown fields are carried through verbatim so external tooling can
    /// attach its own metadata without this engine discarding it.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ValueEntry {
    pub fn new(value: impl Into<String>) -> Self {
        ValueEntry {
            value: value.into(),
            success: 0,
            blocked: 0,
            average: 0,
            extra: serde_json::Map::new(),
        }
    }

    /// Recompute the `average` projection from the counters.
    pub fn recompute_average(&mut self) {
        self.average = self.success as i64 - self.blocked as i64;
    }
}

/// A named, ordered collection of entries.
///
/// Insertion order is preserved for display and editing; selection among
/// entries is uniform and ignores order and scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueSet {
    pub entries: Vec<ValueEntry>,
}

impl ValueSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lazy, process-wide cache of value-sets keyed by name.
///
/// Each cached set sits behind its own async mutex; all mutation of a named
/// set (score updates, saves) holds that mutex across the read-modify-write
/// so concurrent updates cannot drop increments.
pub struct ValueSetStore {
    storage: Arc<dyn WildcardStorage>,
    cache: RwLock<HashMap<String, Arc<Mutex<ValueSet>>>>,
}

impl ValueSetStore {
    pub fn new(storage: Arc<dyn WildcardStorage>) -> Self {
        ValueSetStore {
            storage,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached handle for a named set, loading it on first access.
    ///
    /// Never fails outward: a missing, empty, or malformed storage unit is
    /// logged and cached as the empty set, so repeated misses do not hit
    /// storage again.
    pub(crate) async fn handle(&self, name: &str) -> Arc<Mutex<ValueSet>> {
        if let Some(handle) = self.cached(name) {
            return handle;
        }

        let set = self.load_from_storage(name).await;

        let mut cache = self.cache.write().unwrap();
        // A concurrent miss may have loaded the same set in the meantime;
        // the redundant read is benign, the first insertion wins.
        cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(set)))
            .clone()
    }

    fn cached(&self, name: &str) -> Option<Arc<Mutex<ValueSet>>> {
        let cache = self.cache.read().unwrap();
        cache.get(name).cloned()
    }

    async fn load_from_storage(&self, name: &str) -> ValueSet {
        let raw = match self.storage.read(name).await {
            Ok(raw) => raw,
            Err(StorageError::NotFound(_)) => {
                warn!(set = name, "value-set storage unit not found");
                return ValueSet::default();
            }
            Err(e) => {
                error!(set = name, error = %e, "failed to read value-set storage");
                return ValueSet::default();
            }
        };

        if raw.trim().is_empty() {
            warn!(set = name, "value-set storage unit is empty");
            return ValueSet::default();
        }

        let set = parse_entries(name, &raw);
        debug!(set = name, entries = set.entries.len(), "loaded value-set");
        set
    }

    /// Return a snapshot of the named set's entries.
    pub async fn load(&self, name: &str) -> Vec<ValueEntry> {
        let handle = self.handle(name).await;
        let set = handle.lock().await;
        set.entries.clone()
    }

    /// Replace the named set and persist it.
    ///
    /// Returns `true` when the write reached storage. The cache is updated
    /// either way so in-process readers observe the new entries.
    pub async fn save(&self, name: &str, mut entries: Vec<ValueEntry>) -> bool {
        for entry in &mut entries {
            entry.recompute_average();
        }

        let handle = self.handle(name).await;
        let mut set = handle.lock().await;
        set.entries = entries;
        self.persist_locked(name, &set).await
    }

    /// Serialize and write a set while its mutex is held.
    pub(crate) async fn persist_locked(&self, name: &str, set: &ValueSet) -> bool {
        let contents = match serde_json::to_string_pretty(&set.entries) {
            Ok(contents) => contents,
            Err(e) => {
                error!(set = name, error = %e, "failed to serialize value-set");
                return false;
            }
        };
        match self.storage.write(name, &contents).await {
            Ok(()) => {
                debug!(set = name, "saved value-set");
                true
            }
            Err(e) => {
                error!(set = name, error = %e, "failed to write value-set");
                false
            }
        }
    }

    /// Drop a name from the cache; the next load re-reads storage.
    pub fn invalidate(&self, name: &str) {
        let mut cache = self.cache.write().unwrap();
        if cache.remove(name).is_some() {
            debug!(set = name, "value-set cache invalidated");
        }
    }

    /// Drop the entire cache.
    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write().unwrap();
        cache.clear();
        debug!("value-set cache cleared");
    }

    /// Names of all sets currently present in storage.
    pub async fn list_names(&self) -> Vec<String> {
        self.storage.list().await
    }
}

/// Parse a storage unit into entries, tolerating bad records.
///
/// A top level that is not an array makes the whole unit corrupt (empty
/// set); individual records that are not objects or lack `value` are
/// skipped with a warning.
fn parse_entries(name: &str, raw: &str) -> ValueSet {
    let records: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            error!(set = name, error = %e, "value-set storage unit is not a record collection");
            return ValueSet::default();
        }
    };

    let mut entries = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<ValueEntry>(record) {
            Ok(mut entry) => {
                entry.recompute_average();
                entries.push(entry);
            }
            Err(e) => {
                warn!(set = name, index, error = %e, "skipping invalid value-set record");
            }
        }
    }
    ValueSet { entries }
}
