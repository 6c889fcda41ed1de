//! Recursive deletion of filer entries.
//!
//! [`Filer::delete_entry_meta_and_data`] removes the metadata of a path and,
//! for a directory, of its whole subtree, then hands the chunk references of
//! everything removed to the [`ChunkReclaimer`]. Metadata deletion is
//! sequential and depth-first; chunk reclamation runs detached and its
//! outcome is never part of the result.
//!
//! Deletion is not transactional. A walk that fails part way leaves the
//! siblings it already removed deleted, and reports the failure.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use crate::cache::{DirectoryCache, NoopDirectoryCache};
use crate::config::FilerConfig;
use crate::error::{FilerError, Result};
use crate::notification::{EventNotifier, NoopNotifier};
use crate::observability;
use crate::reclaim::ChunkReclaimer;
use crate::shutdown::CancelToken;
use crate::store::FilerStore;
use crate::types::{Entry, FileChunk, FullPath};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Flags of a delete call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Allow deleting a directory that has children.
    pub recursive: bool,
    /// Keep walking when a subdirectory's deletion fails.
    pub ignore_recursive_error: bool,
    /// Reclaim the chunks of deleted files.
    pub should_delete_chunks: bool,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a directory together with everything under it.
    pub fn recursive() -> Self {
        Self::new().with_recursive(true)
    }

    /// Refuse to delete a directory that still has children.
    pub fn non_recursive() -> Self {
        Self::new().with_recursive(false)
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_ignore_recursive_error(mut self, ignore: bool) -> Self {
        self.ignore_recursive_error = ignore;
        self
    }

    pub fn with_delete_chunks(mut self, delete_chunks: bool) -> Self {
        self.should_delete_chunks = delete_chunks;
        self
    }
}

/// Reclaimer used when chunks are never deleted.
struct DiscardReclaimer;

impl ChunkReclaimer for DiscardReclaimer {
    fn reclaim(&self, chunks: Vec<FileChunk>) {
        debug!(chunks = chunks.len(), "No reclaimer configured, discarding chunk references");
    }
}

/// The filer deletion engine.
pub struct Filer {
    store: Arc<dyn FilerStore>,
    notifier: Arc<dyn EventNotifier>,
    dir_cache: Arc<dyn DirectoryCache>,
    reclaimer: Arc<dyn ChunkReclaimer>,
    pagination_size: usize,
}

impl Filer {
    /// Create a filer over the given collaborators.
    pub fn new(
        store: Arc<dyn FilerStore>,
        notifier: Arc<dyn EventNotifier>,
        dir_cache: Arc<dyn DirectoryCache>,
        reclaimer: Arc<dyn ChunkReclaimer>,
        config: &FilerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            notifier,
            dir_cache,
            reclaimer,
            pagination_size: config.pagination_size,
        })
    }

    /// Start building a filer over `store`.
    pub fn builder(store: Arc<dyn FilerStore>) -> FilerBuilder {
        FilerBuilder {
            store,
            notifier: None,
            dir_cache: None,
            reclaimer: None,
            config: FilerConfig::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn FilerStore> {
        &self.store
    }

    pub fn pagination_size(&self) -> usize {
        self.pagination_size
    }

    /// Look up the entry at `path`.
    pub async fn find_entry(&self, path: &FullPath) -> Result<Entry> {
        self.store
            .find_entry(path)
            .await
            .map_err(|source| FilerError::LookupFailed {
                path: path.clone(),
                source,
            })
    }

    /// Delete `path`, and its subtree if it is a directory.
    ///
    /// Deleting the root is a no-op success. Chunk reclamation, when
    /// requested, is dispatched after all metadata mutations succeeded and is
    /// not awaited.
    pub async fn delete_entry_meta_and_data(
        &self,
        path: &FullPath,
        options: DeleteOptions,
    ) -> Result<()> {
        self.delete_entry_meta_and_data_with_cancel(path, options, &CancelToken::new())
            .await
    }

    /// Like [`delete_entry_meta_and_data`](Self::delete_entry_meta_and_data),
    /// stopping with `FilerError::Cancelled` once `cancel` fires. Nothing
    /// deleted before that point is restored.
    pub async fn delete_entry_meta_and_data_with_cancel(
        &self,
        path: &FullPath,
        options: DeleteOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        let result = self.delete_entry(path, options, cancel).await;
        if let Err(e) = &result {
            observability::record_delete_failure(e.kind());
        }
        result
    }

    async fn delete_entry(
        &self,
        path: &FullPath,
        options: DeleteOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }

        if cancel.is_cancelled() {
            return Err(FilerError::Cancelled { path: path.clone() });
        }

        let entry = self.find_entry(path).await?;

        let mut chunks = entry.chunks.clone();
        if entry.is_directory() {
            // Children only, the folder record itself goes below.
            let dir_chunks = self
                .delete_folder_children(&entry, options, cancel)
                .await
                .map_err(|e| match e {
                    FilerError::Cancelled { .. } => e,
                    e => FilerError::SubtreeDeletionFailed {
                        path: path.clone(),
                        source: Box::new(e),
                    },
                })?;
            chunks.extend(dir_chunks);
            self.dir_cache.invalidate(path);
        }

        self.delete_single_entry(&entry, options.should_delete_chunks)
            .await?;

        if options.should_delete_chunks {
            self.reclaimer.reclaim(chunks);
        }

        Ok(())
    }

    /// Delete everything under `entry` and return the chunks of removed files.
    fn delete_folder_children<'a>(
        &'a self,
        entry: &'a Entry,
        options: DeleteOptions,
        cancel: &'a CancelToken,
    ) -> BoxFuture<'a, Result<Vec<FileChunk>>> {
        Box::pin(async move {
            let dir = &entry.full_path;
            let mut chunks = Vec::new();
            let mut last_file_name = String::new();
            let include_last_file = false;

            loop {
                if cancel.is_cancelled() {
                    return Err(FilerError::Cancelled { path: dir.clone() });
                }

                let entries = self
                    .store
                    .list_directory_entries(
                        dir,
                        &last_file_name,
                        include_last_file,
                        self.pagination_size,
                    )
                    .await
                    .map_err(|source| {
                        error!(dir = %dir, error = %source, "List folder failed");
                        FilerError::ListFailed {
                            path: dir.clone(),
                            source,
                        }
                    })?;

                // Only the first page of each folder is checked.
                if last_file_name.is_empty() && !options.recursive && !entries.is_empty() {
                    return Err(FilerError::NonEmptyDirectory { path: dir.clone() });
                }

                for sub in &entries {
                    last_file_name = sub.name().to_string();

                    if !sub.is_directory() {
                        if options.should_delete_chunks {
                            chunks.extend(sub.chunks.iter().cloned());
                        }
                        continue;
                    }

                    if cancel.is_cancelled() {
                        return Err(FilerError::Cancelled {
                            path: sub.full_path.clone(),
                        });
                    }

                    match self.delete_folder_children(sub, options, cancel).await {
                        Ok(sub_chunks) => {
                            if options.should_delete_chunks {
                                chunks.extend(sub_chunks);
                            }
                        }
                        Err(e @ FilerError::Cancelled { .. }) => return Err(e),
                        Err(e) if options.ignore_recursive_error => {
                            warn!(
                                dir = %sub.full_path,
                                error = %e,
                                "Ignoring failed subfolder deletion"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }

                if entries.len() < self.pagination_size {
                    break;
                }
            }

            self.dir_cache.invalidate(dir);

            debug!(dir = %dir, "Deleting directory children");

            self.store
                .delete_folder_children(dir)
                .await
                .map_err(|source| FilerError::StoreChildrenDeletionFailed {
                    path: dir.clone(),
                    source,
                })?;
            self.notifier
                .notify_update_event(Some(entry), None, options.should_delete_chunks);
            observability::record_entry_deleted("directory");

            Ok(chunks)
        })
    }

    async fn delete_single_entry(&self, entry: &Entry, should_delete_chunks: bool) -> Result<()> {
        debug!(path = %entry.full_path, "Deleting entry");

        self.store
            .delete_entry(&entry.full_path)
            .await
            .map_err(|source| FilerError::EntryDeletionFailed {
                path: entry.full_path.clone(),
                source,
            })?;
        self.notifier
            .notify_update_event(Some(entry), None, should_delete_chunks);
        let kind = if entry.is_directory() { "directory" } else { "file" };
        observability::record_entry_deleted(kind);

        Ok(())
    }
}

/// Builder for [`Filer`], defaulting to no-op collaborators.
pub struct FilerBuilder {
    store: Arc<dyn FilerStore>,
    notifier: Option<Arc<dyn EventNotifier>>,
    dir_cache: Option<Arc<dyn DirectoryCache>>,
    reclaimer: Option<Arc<dyn ChunkReclaimer>>,
    config: FilerConfig,
}

impl FilerBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn directory_cache(mut self, dir_cache: Arc<dyn DirectoryCache>) -> Self {
        self.dir_cache = Some(dir_cache);
        self
    }

    pub fn reclaimer(mut self, reclaimer: Arc<dyn ChunkReclaimer>) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    pub fn config(mut self, config: FilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pagination_size(mut self, pagination_size: usize) -> Self {
        self.config.pagination_size = pagination_size;
        self
    }

    pub fn build(self) -> Result<Filer> {
        Filer::new(
            self.store,
            self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            self.dir_cache.unwrap_or_else(|| Arc::new(NoopDirectoryCache)),
            self.reclaimer.unwrap_or_else(|| Arc::new(DiscardReclaimer)),
            &self.config,
        )
    }
}
