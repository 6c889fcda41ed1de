//! Common test utilities for integration tests.

pub mod assertions;
pub mod fixtures;

use filer::cache::DirectoryCache;
use filer::notification::EventNotifier;
use filer::reclaim::ChunkReclaimer;
use filer::store::{FilerStore, StoreResult};
use filer::{CancelToken, Entry, FileChunk, Filer, FullPath, MemoryStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

// Re-export common types
pub use assertions::*;
pub use fixtures::*;

/// One call received by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Find(FullPath),
    List { dir: FullPath, start: String, include: bool, limit: usize },
    DeleteEntry(FullPath),
    DeleteFolderChildren(FullPath),
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, StoreCall::DeleteEntry(_) | StoreCall::DeleteFolderChildren(_))
    }
}

/// Memory store wrapper that records calls and injects failures.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<StoreCall>>,
    fail_find: Mutex<HashSet<FullPath>>,
    fail_list: Mutex<HashSet<FullPath>>,
    fail_delete_entry: Mutex<HashSet<FullPath>>,
    fail_delete_children: Mutex<HashSet<FullPath>>,
    cancel_after_lists: Mutex<Option<(usize, CancelToken)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entry: Entry) {
        self.inner.insert_entry(entry);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_mutation).collect()
    }

    pub fn list_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, StoreCall::List { .. }))
            .count()
    }

    pub fn fail_find(&self, path: &str) {
        self.fail_find.lock().insert(FullPath::new(path));
    }

    pub fn fail_list(&self, path: &str) {
        self.fail_list.lock().insert(FullPath::new(path));
    }

    pub fn fail_delete_entry(&self, path: &str) {
        self.fail_delete_entry.lock().insert(FullPath::new(path));
    }

    pub fn fail_delete_children(&self, path: &str) {
        self.fail_delete_children.lock().insert(FullPath::new(path));
    }

    /// Cancel `token` once `lists` listing calls have been served.
    pub fn cancel_after_lists(&self, lists: usize, token: CancelToken) {
        *self.cancel_after_lists.lock() = Some((lists, token));
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn injected(set: &Mutex<HashSet<FullPath>>, path: &FullPath) -> StoreResult<()> {
        if set.lock().contains(path) {
            return Err(StoreError::Backend(format!("injected failure at {}", path)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FilerStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn find_entry(&self, path: &FullPath) -> StoreResult<Entry> {
        self.record(StoreCall::Find(path.clone()));
        Self::injected(&self.fail_find, path)?;
        self.inner.find_entry(path).await
    }

    async fn list_directory_entries(
        &self,
        dir: &FullPath,
        start_file_name: &str,
        include_start: bool,
        limit: usize,
    ) -> StoreResult<Vec<Entry>> {
        self.record(StoreCall::List {
            dir: dir.clone(),
            start: start_file_name.to_string(),
            include: include_start,
            limit,
        });
        Self::injected(&self.fail_list, dir)?;

        let result = self
            .inner
            .list_directory_entries(dir, start_file_name, include_start, limit)
            .await;

        if let Some((lists, token)) = self.cancel_after_lists.lock().as_ref() {
            if self.list_calls() >= *lists {
                token.cancel();
            }
        }
        result
    }

    async fn delete_entry(&self, path: &FullPath) -> StoreResult<()> {
        self.record(StoreCall::DeleteEntry(path.clone()));
        Self::injected(&self.fail_delete_entry, path)?;
        self.inner.delete_entry(path).await
    }

    async fn delete_folder_children(&self, dir: &FullPath) -> StoreResult<()> {
        self.record(StoreCall::DeleteFolderChildren(dir.clone()));
        Self::injected(&self.fail_delete_children, dir)?;
        self.inner.delete_folder_children(dir).await
    }
}

/// One event received by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub old_path: Option<FullPath>,
    pub new_path: Option<FullPath>,
    pub delete_chunks: bool,
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Paths of deleted entries, in notification order.
    pub fn deleted_paths(&self) -> Vec<FullPath> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.new_path.is_none())
            .filter_map(|e| e.old_path.clone())
            .collect()
    }
}

impl EventNotifier for RecordingNotifier {
    fn notify_update_event(
        &self,
        old_entry: Option<&Entry>,
        new_entry: Option<&Entry>,
        delete_chunks: bool,
    ) {
        self.events.lock().push(RecordedEvent {
            old_path: old_entry.map(|e| e.full_path.clone()),
            new_path: new_entry.map(|e| e.full_path.clone()),
            delete_chunks,
        });
    }
}

#[derive(Default)]
pub struct RecordingCache {
    invalidated: Mutex<Vec<FullPath>>,
}

impl RecordingCache {
    pub fn invalidated(&self) -> Vec<FullPath> {
        self.invalidated.lock().clone()
    }
}

impl DirectoryCache for RecordingCache {
    fn invalidate(&self, dir: &FullPath) {
        self.invalidated.lock().push(dir.clone());
    }
}

#[derive(Default)]
pub struct RecordingReclaimer {
    batches: Mutex<Vec<Vec<FileChunk>>>,
}

impl RecordingReclaimer {
    pub fn batches(&self) -> Vec<Vec<FileChunk>> {
        self.batches.lock().clone()
    }

    /// Sorted file ids across all batches.
    pub fn file_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .batches
            .lock()
            .iter()
            .flatten()
            .map(|c| c.file_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl ChunkReclaimer for RecordingReclaimer {
    fn reclaim(&self, chunks: Vec<FileChunk>) {
        self.batches.lock().push(chunks);
    }
}

/// A filer wired to recording collaborators.
pub struct TestFiler {
    pub filer: Filer,
    pub store: Arc<RecordingStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: Arc<RecordingCache>,
    pub reclaimer: Arc<RecordingReclaimer>,
}

impl TestFiler {
    pub fn new(pagination_size: usize) -> Self {
        Self::with_store(Arc::new(RecordingStore::new()), pagination_size)
    }

    pub fn with_store(store: Arc<RecordingStore>, pagination_size: usize) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let cache = Arc::new(RecordingCache::default());
        let reclaimer = Arc::new(RecordingReclaimer::default());

        let filer = Filer::builder(store.clone())
            .notifier(notifier.clone())
            .directory_cache(cache.clone())
            .reclaimer(reclaimer.clone())
            .pagination_size(pagination_size)
            .build()
            .expect("valid test filer");

        Self {
            filer,
            store,
            notifier,
            cache,
            reclaimer,
        }
    }

    pub fn paths(&self) -> Vec<FullPath> {
        self.store.inner.paths()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.store.inner.contains(&FullPath::new(path))
    }
}
