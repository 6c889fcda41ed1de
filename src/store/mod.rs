//! Metadata store adapters.
//!
//! [`FilerStore`] is the seam between the deletion engine and whatever
//! backend persists entries. The engine relies on four calls only: lookup by
//! path, a forward paginated listing of a directory's direct children in
//! name order, single-entry deletion and bulk deletion of everything under a
//! directory.

// Store adapters sit under every metadata mutation.
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::types::{Entry, FullPath};

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Backend holding filer entries.
#[async_trait::async_trait]
pub trait FilerStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Look up the entry at `path`, `StoreError::NotFound` if absent.
    async fn find_entry(&self, path: &FullPath) -> StoreResult<Entry>;

    /// List direct children of `dir` ordered by name, starting after
    /// `start_file_name` (or at it, when `include_start` is set). An empty
    /// start name lists from the first child. Returns at most `limit` entries.
    async fn list_directory_entries(
        &self,
        dir: &FullPath,
        start_file_name: &str,
        include_start: bool,
        limit: usize,
    ) -> StoreResult<Vec<Entry>>;

    /// Remove exactly the one record at `path`.
    async fn delete_entry(&self, path: &FullPath) -> StoreResult<()>;

    /// Remove every record under `dir`, at any depth, in one operation.
    /// The record of `dir` itself is kept.
    async fn delete_folder_children(&self, dir: &FullPath) -> StoreResult<()>;
}
