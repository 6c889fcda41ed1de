//! Observability module for the filer.
//!
//! Provides logging initialisation and the deletion counters. Counters are
//! no-ops until the embedding process installs a `metrics` recorder.

use crate::config::ObservabilityConfig;
use crate::error::{ErrorKind, FilerError, Result};
use metrics::counter;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| FilerError::Config(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| FilerError::Config(format!("Failed to init logging: {}", e)))?;
    }

    info!("Observability initialized");
    Ok(())
}

/// Record a deleted entry, `kind` is `file` or `directory`.
pub fn record_entry_deleted(kind: &'static str) {
    counter!("filer_entries_deleted_total", "kind" => kind).increment(1);
}

/// Record a failed deletion call.
pub fn record_delete_failure(kind: ErrorKind) {
    counter!("filer_delete_failures_total", "kind" => kind.as_str()).increment(1);
}

/// Record chunk references handed to the reclaimer.
pub fn record_chunks_submitted(count: usize) {
    counter!("filer_chunks_submitted_total").increment(count as u64);
}

/// Record chunks physically deleted.
pub fn record_chunks_reclaimed(count: usize) {
    counter!("filer_chunks_reclaimed_total").increment(count as u64);
}

/// Record chunks that could not be deleted.
pub fn record_chunk_reclaim_failures(count: usize) {
    counter!("filer_chunk_reclaim_failures_total").increment(count as u64);
}

/// Record a chunk batch dropped because the reclaim queue was unavailable.
pub fn record_chunk_batch_dropped() {
    counter!("filer_chunk_batches_dropped_total").increment(1);
}

/// Record a directory cache invalidation.
pub fn record_cache_invalidation() {
    counter!("filer_directory_cache_invalidations_total").increment(1);
}
