//! Filer - metadata and chunk deletion for a distributed file system.
//!
//! The filer keeps the namespace of the file system (paths, attributes and
//! the chunk references of file data) in a pluggable [`FilerStore`]. This
//! crate implements deletion over that store: removing an entry, or a whole
//! directory subtree, and arranging for the chunks of deleted files to be
//! reclaimed from the volume servers in the background.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Filer::delete_entry_meta_and_data                           │
//! │    lookup ─▶ paginated depth-first walk ─▶ delete entry      │
//! ├───────────────┬──────────────┬───────────────┬───────────────┤
//! │  FilerStore   │ EventNotifier│ DirectoryCache│ ChunkReclaimer│
//! │  (metadata)   │ (change feed)│ (invalidation)│ (async queue) │
//! └───────────────┴──────────────┴───────────────┴───────┬───────┘
//!                                                        ▼
//!                                         ReclaimWorker ─▶ ChunkDeleter
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use filer::{DeleteOptions, Filer, FullPath, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> filer::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let filer = Filer::builder(store).build()?;
//!
//!     let options = DeleteOptions::recursive().with_delete_chunks(true);
//!     filer
//!         .delete_entry_meta_and_data(&FullPath::new("/buckets/logs"), options)
//!         .await
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod cache;
pub mod filer;
pub mod notification;
pub mod observability;
pub mod reclaim;
pub mod retry;
pub mod shutdown;
pub mod store;

// Re-exports
pub use error::{ErrorKind, FilerError, Result, StoreError};
pub use filer::{DeleteOptions, Filer, FilerBuilder};
pub use shutdown::{CancelToken, ShutdownCoordinator};
pub use store::{FilerStore, MemoryStore};
pub use types::*;
