//! Error types for filer deletion.
//!
//! [`StoreError`] is what the storage adapters report. [`FilerError`] is what
//! the deletion engine returns: every variant carries the path at which the
//! failure happened and, where there is one, the underlying cause, so a
//! failure deep in a subtree walk is reported as a chain rather than a
//! flattened string.
//!
//! # Example
//!
//! ```rust
//! use filer::error::{ErrorKind, FilerError, StoreError};
//! use filer::types::FullPath;
//!
//! let inner = FilerError::NonEmptyDirectory { path: FullPath::new("/a/b") };
//! let err = FilerError::SubtreeDeletionFailed {
//!     path: FullPath::new("/a"),
//!     source: Box::new(inner),
//! };
//!
//! assert_eq!(err.kind(), ErrorKind::SubtreeDeletionFailed);
//! assert_eq!(err.root_cause().kind(), ErrorKind::NonEmptyDirectory);
//! assert_eq!(err.root_cause().path(), Some(&FullPath::new("/a/b")));
//! ```

use crate::types::FullPath;
use std::io;
use thiserror::Error;

/// Error reported by a store, chunk deleter or other external adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid file id: {0}")]
    InvalidFileId(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Check if the adapter call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Flat classification of a [`FilerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LookupFailed,
    ListFailed,
    NonEmptyDirectory,
    SubtreeDeletionFailed,
    StoreChildrenDeletionFailed,
    EntryDeletionFailed,
    Cancelled,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::LookupFailed => "lookup_failed",
            ErrorKind::ListFailed => "list_failed",
            ErrorKind::NonEmptyDirectory => "non_empty_directory",
            ErrorKind::SubtreeDeletionFailed => "subtree_deletion_failed",
            ErrorKind::StoreChildrenDeletionFailed => "store_children_deletion_failed",
            ErrorKind::EntryDeletionFailed => "entry_deletion_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
        }
    }
}

/// Main error type for filer operations.
#[derive(Error, Debug)]
pub enum FilerError {
    #[error("Lookup {path} failed: {source}")]
    LookupFailed {
        path: FullPath,
        #[source]
        source: StoreError,
    },

    #[error("List folder {path} failed: {source}")]
    ListFailed {
        path: FullPath,
        #[source]
        source: StoreError,
    },

    #[error("Fail to delete non-empty folder: {path}")]
    NonEmptyDirectory { path: FullPath },

    #[error("Delete directory {path}: {source}")]
    SubtreeDeletionFailed {
        path: FullPath,
        #[source]
        source: Box<FilerError>,
    },

    #[error("Filer store delete children of {path}: {source}")]
    StoreChildrenDeletionFailed {
        path: FullPath,
        #[source]
        source: StoreError,
    },

    #[error("Filer store delete {path}: {source}")]
    EntryDeletionFailed {
        path: FullPath,
        #[source]
        source: StoreError,
    },

    #[error("Deletion cancelled at {path}")]
    Cancelled { path: FullPath },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl FilerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FilerError::LookupFailed { .. } => ErrorKind::LookupFailed,
            FilerError::ListFailed { .. } => ErrorKind::ListFailed,
            FilerError::NonEmptyDirectory { .. } => ErrorKind::NonEmptyDirectory,
            FilerError::SubtreeDeletionFailed { .. } => ErrorKind::SubtreeDeletionFailed,
            FilerError::StoreChildrenDeletionFailed { .. } => {
                ErrorKind::StoreChildrenDeletionFailed
            }
            FilerError::EntryDeletionFailed { .. } => ErrorKind::EntryDeletionFailed,
            FilerError::Cancelled { .. } => ErrorKind::Cancelled,
            FilerError::Config(_) | FilerError::InvalidConfig { .. } => ErrorKind::Config,
        }
    }

    /// Path the error is attached to, if any.
    pub fn path(&self) -> Option<&FullPath> {
        match self {
            FilerError::LookupFailed { path, .. }
            | FilerError::ListFailed { path, .. }
            | FilerError::NonEmptyDirectory { path }
            | FilerError::SubtreeDeletionFailed { path, .. }
            | FilerError::StoreChildrenDeletionFailed { path, .. }
            | FilerError::EntryDeletionFailed { path, .. }
            | FilerError::Cancelled { path } => Some(path),
            FilerError::Config(_) | FilerError::InvalidConfig { .. } => None,
        }
    }

    /// Innermost error of a `SubtreeDeletionFailed` chain.
    pub fn root_cause(&self) -> &FilerError {
        let mut err = self;
        while let FilerError::SubtreeDeletionFailed { source, .. } = err {
            err = source.as_ref();
        }
        err
    }

    /// Underlying adapter error, if the root cause carries one.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self.root_cause() {
            FilerError::LookupFailed { source, .. }
            | FilerError::ListFailed { source, .. }
            | FilerError::StoreChildrenDeletionFailed { source, .. }
            | FilerError::EntryDeletionFailed { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FilerError::LookupFailed { source, .. } if source.is_not_found())
    }

    /// Convert to POSIX errno for FUSE operations.
    pub fn to_errno(&self) -> i32 {
        match self.root_cause() {
            FilerError::LookupFailed { source, .. } if source.is_not_found() => libc::ENOENT,
            FilerError::NonEmptyDirectory { .. } => libc::ENOTEMPTY,
            FilerError::Cancelled { .. } => libc::ECANCELED,
            FilerError::Config(_) | FilerError::InvalidConfig { .. } => libc::EINVAL,
            FilerError::LookupFailed { source, .. }
            | FilerError::ListFailed { source, .. }
            | FilerError::StoreChildrenDeletionFailed { source, .. }
            | FilerError::EntryDeletionFailed { source, .. } => match source {
                StoreError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
                StoreError::Unavailable(_) => libc::EAGAIN,
                _ => libc::EIO,
            },
            FilerError::SubtreeDeletionFailed { .. } => libc::EIO,
        }
    }
}

/// Result type alias for filer operations.
pub type Result<T> = std::result::Result<T, FilerError>;
