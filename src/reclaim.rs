//! Asynchronous reclamation of deleted chunks.
//!
//! Metadata deletion hands the chunk references of removed files to a
//! [`ChunkReclaimer`] and returns without waiting. The queue implementation
//! forwards batches to a [`ReclaimWorker`] task that groups file ids per
//! volume and calls the volume-side [`ChunkDeleter`], retrying transient
//! failures. Anything that still fails is logged and counted; orphaned chunks
//! are left for the out-of-band garbage collection sweep.

use crate::config::ReclaimConfig;
use crate::error::StoreError;
use crate::observability;
use crate::retry::RetryExecutor;
use crate::shutdown::ShutdownCoordinator;
use crate::types::{FileChunk, FileId, VolumeId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Accepts ownership of chunk references whose data should be freed.
pub trait ChunkReclaimer: Send + Sync {
    /// Must return promptly; outcome is never reported to the caller.
    fn reclaim(&self, chunks: Vec<FileChunk>);
}

/// Volume-side deletion of stored chunks.
#[async_trait::async_trait]
pub trait ChunkDeleter: Send + Sync {
    async fn delete_file_ids(
        &self,
        volume_id: VolumeId,
        file_ids: &[FileId],
    ) -> Result<(), StoreError>;
}

/// Reclamation statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReclaimStats {
    /// Batches accepted into the queue.
    pub batches_queued: u64,
    /// Batches dropped because the queue was full or closed.
    pub batches_dropped: u64,
    /// Batches the worker finished processing.
    pub batches_processed: u64,
    /// Chunks successfully deleted.
    pub chunks_reclaimed: u64,
    /// Chunks that could not be deleted.
    pub chunks_failed: u64,
}

#[derive(Default)]
struct ReclaimStatsInner {
    batches_queued: AtomicU64,
    batches_dropped: AtomicU64,
    batches_processed: AtomicU64,
    chunks_reclaimed: AtomicU64,
    chunks_failed: AtomicU64,
}

impl ReclaimStatsInner {
    fn snapshot(&self) -> ReclaimStats {
        ReclaimStats {
            batches_queued: self.batches_queued.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            chunks_reclaimed: self.chunks_reclaimed.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
        }
    }

    fn record_failed(&self, count: usize) {
        self.chunks_failed.fetch_add(count as u64, Ordering::Relaxed);
        observability::record_chunk_reclaim_failures(count);
    }
}

/// Bounded queue feeding a [`ReclaimWorker`].
pub struct ChunkDeletionQueue {
    sender: mpsc::Sender<Vec<FileChunk>>,
    stats: Arc<ReclaimStatsInner>,
}

impl ChunkDeletionQueue {
    /// Create the queue and the worker that drains it.
    pub fn new(config: &ReclaimConfig, deleter: Arc<dyn ChunkDeleter>) -> (Self, ReclaimWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(ReclaimStatsInner::default());

        let worker = ReclaimWorker {
            receiver,
            deleter,
            retry: RetryExecutor::new(config.retry.clone()),
            batch_size: config.batch_size.max(1),
            stats: Arc::clone(&stats),
        };

        (Self { sender, stats }, worker)
    }

    /// Get current statistics.
    pub fn stats(&self) -> ReclaimStats {
        self.stats.snapshot()
    }
}

impl ChunkReclaimer for ChunkDeletionQueue {
    fn reclaim(&self, chunks: Vec<FileChunk>) {
        if chunks.is_empty() {
            return;
        }

        let count = chunks.len();
        match self.sender.try_send(chunks) {
            Ok(()) => {
                self.stats.batches_queued.fetch_add(1, Ordering::Relaxed);
                observability::record_chunks_submitted(count);
            }
            Err(TrySendError::Full(_)) => {
                self.stats.batches_dropped.fetch_add(1, Ordering::Relaxed);
                observability::record_chunk_batch_dropped();
                warn!(
                    chunks = count,
                    "Chunk reclaim queue full, leaving chunks to garbage collection"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.batches_dropped.fetch_add(1, Ordering::Relaxed);
                observability::record_chunk_batch_dropped();
                warn!(
                    chunks = count,
                    "Chunk reclaim worker stopped, leaving chunks to garbage collection"
                );
            }
        }
    }
}

/// Background task deleting queued chunks.
pub struct ReclaimWorker {
    receiver: mpsc::Receiver<Vec<FileChunk>>,
    deleter: Arc<dyn ChunkDeleter>,
    retry: RetryExecutor,
    batch_size: usize,
    stats: Arc<ReclaimStatsInner>,
}

impl ReclaimWorker {
    /// Spawn the worker on the current runtime.
    pub fn spawn(self, shutdown: ShutdownCoordinator) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Process batches until the queue closes or shutdown is signalled.
    /// Batches already queued at shutdown are still processed.
    pub async fn run(mut self, shutdown: ShutdownCoordinator) {
        loop {
            tokio::select! {
                batch = self.receiver.recv() => match batch {
                    Some(chunks) => self.process(chunks).await,
                    None => break,
                },
                _ = shutdown.wait_for_shutdown() => {
                    self.receiver.close();
                    while let Some(chunks) = self.receiver.recv().await {
                        self.process(chunks).await;
                    }
                    break;
                }
            }
        }

        info!(stats = ?self.stats.snapshot(), "Chunk reclaim worker stopped");
    }

    /// Delete one batch of chunks.
    pub async fn process(&self, chunks: Vec<FileChunk>) {
        let mut by_volume: BTreeMap<VolumeId, Vec<FileId>> = BTreeMap::new();
        for chunk in &chunks {
            match chunk.fid() {
                Ok(fid) => by_volume.entry(fid.volume_id).or_default().push(fid),
                Err(e) => {
                    warn!(file_id = %chunk.file_id, error = %e, "Skipping unparseable chunk");
                    self.stats.record_failed(1);
                }
            }
        }

        for (volume_id, file_ids) in by_volume {
            for slice in file_ids.chunks(self.batch_size) {
                let result = self
                    .retry
                    .execute(|| self.deleter.delete_file_ids(volume_id, slice))
                    .await;

                match result {
                    Ok(()) => {
                        debug!(volume_id, chunks = slice.len(), "Deleted chunks");
                        self.stats
                            .chunks_reclaimed
                            .fetch_add(slice.len() as u64, Ordering::Relaxed);
                        observability::record_chunks_reclaimed(slice.len());
                    }
                    Err(e) => {
                        error!(
                            volume_id,
                            chunks = slice.len(),
                            error = %e,
                            "Failed to delete chunks"
                        );
                        self.stats.record_failed(slice.len());
                    }
                }
            }
        }

        self.stats.batches_processed.fetch_add(1, Ordering::Relaxed);
    }
}
