//! In-memory filer store.
//!
//! Entries are grouped by parent directory and kept in name order so that
//! paginated listings are stable. Snapshots are plain JSON.

use super::{FilerStore, StoreResult};
use crate::error::StoreError;
use crate::types::{Entry, FullPath};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tracing::debug;

/// Serializable form of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStoreSnapshot {
    pub entries: Vec<Entry>,
}

/// Filer store backed by process memory.
pub struct MemoryStore {
    /// Directory path -> children by name.
    dirs: RwLock<HashMap<FullPath, BTreeMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            dirs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace an entry, creating missing parent directories.
    pub fn insert_entry(&self, entry: Entry) {
        let mut dirs = self.dirs.write();
        Self::ensure_parents(&mut dirs, &entry.full_path);
        if let Some(parent) = entry.full_path.parent() {
            let name = entry.name().to_string();
            dirs.entry(parent).or_default().insert(name, entry);
        }
    }

    fn ensure_parents(dirs: &mut HashMap<FullPath, BTreeMap<String, Entry>>, path: &FullPath) {
        let mut missing = Vec::new();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.is_root() {
                break;
            }
            let exists = dir
                .parent()
                .and_then(|p| dirs.get(&p))
                .is_some_and(|children| children.contains_key(dir.name()));
            if exists {
                break;
            }
            current = dir.parent();
            missing.push(dir);
        }

        for dir in missing.into_iter().rev() {
            if let Some(parent) = dir.parent() {
                let name = dir.name().to_string();
                dirs.entry(parent).or_default().insert(name, Entry::directory(dir));
            }
        }
    }

    /// Whether an entry exists at `path`.
    pub fn contains(&self, path: &FullPath) -> bool {
        self.get(path).is_some()
    }

    fn get(&self, path: &FullPath) -> Option<Entry> {
        let parent = path.parent()?;
        self.dirs.read().get(&parent)?.get(path.name()).cloned()
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.dirs.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored paths in lexicographic order.
    pub fn paths(&self) -> Vec<FullPath> {
        let dirs = self.dirs.read();
        let mut paths: Vec<FullPath> = dirs
            .values()
            .flat_map(|children| children.values().map(|e| e.full_path.clone()))
            .collect();
        paths.sort();
        paths
    }

    /// Serialize all entries to JSON.
    pub fn snapshot(&self) -> StoreResult<Vec<u8>> {
        let dirs = self.dirs.read();
        let mut entries: Vec<Entry> = dirs
            .values()
            .flat_map(|children| children.values().cloned())
            .collect();
        entries.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(serde_json::to_vec(&MemoryStoreSnapshot { entries })?)
    }

    /// Replace the store content with a snapshot.
    pub fn restore(&self, snapshot: &[u8]) -> StoreResult<()> {
        let snapshot: MemoryStoreSnapshot = serde_json::from_slice(snapshot)?;
        self.dirs.write().clear();
        for entry in snapshot.entries {
            self.insert_entry(entry);
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FilerStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_entry(&self, path: &FullPath) -> StoreResult<Entry> {
        if path.is_root() {
            return Ok(Entry::directory(FullPath::root()));
        }
        self.get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn list_directory_entries(
        &self,
        dir: &FullPath,
        start_file_name: &str,
        include_start: bool,
        limit: usize,
    ) -> StoreResult<Vec<Entry>> {
        let dirs = self.dirs.read();
        let Some(children) = dirs.get(dir) else {
            return Ok(Vec::new());
        };

        let lower = if start_file_name.is_empty() {
            Bound::Unbounded
        } else if include_start {
            Bound::Included(start_file_name.to_string())
        } else {
            Bound::Excluded(start_file_name.to_string())
        };

        Ok(children
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn delete_entry(&self, path: &FullPath) -> StoreResult<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        let mut dirs = self.dirs.write();
        if let Some(children) = dirs.get_mut(&parent) {
            children.remove(path.name());
        }
        Ok(())
    }

    async fn delete_folder_children(&self, dir: &FullPath) -> StoreResult<()> {
        let mut dirs = self.dirs.write();
        let before = dirs.len();
        dirs.retain(|parent, _| parent != dir && !parent.is_under(dir));
        debug!(dir = %dir, removed_dirs = before - dirs.len(), "Deleted folder children");
        Ok(())
    }
}
