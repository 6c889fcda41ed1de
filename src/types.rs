//! Core type definitions for the filer metadata tree.
//!
//! # Key Types
//!
//! - [`FullPath`]: Absolute, slash-delimited path of a node in the tree
//! - [`Entry`]: File or directory metadata as held by a [`FilerStore`](crate::store::FilerStore)
//! - [`FileChunk`]: Reference to a physically stored block of file data
//! - [`FileId`]: Parsed `volume,needle` form of a chunk's file id
//!
//! # Examples
//!
//! ```rust
//! use filer::types::{Entry, FileChunk, FullPath};
//!
//! let dir = FullPath::new("/photos/2024");
//! assert_eq!(dir.name(), "2024");
//! assert_eq!(dir.parent(), Some(FullPath::new("/photos")));
//!
//! let file = Entry::file(dir.child("cat.jpg"), vec![FileChunk::new("3,01637037d6", 0, 4096)]);
//! assert!(!file.is_directory());
//! assert_eq!(file.size(), 4096);
//! ```

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Directory bit of [`Attr::mode`].
pub const MODE_DIR: u32 = libc::S_IFDIR as u32;

/// Absolute path of a node in the metadata tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FullPath(String);

impl FullPath {
    /// Create a path, adding a missing leading slash and dropping a trailing one.
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        while path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        Self(path)
    }

    /// The root directory.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component. Empty for the root.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<FullPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Join a child name onto this directory path.
    pub fn child(&self, name: &str) -> FullPath {
        if self.is_root() {
            Self(format!("/{}", name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }

    /// Whether `self` is a strict descendant of `dir`.
    pub fn is_under(&self, dir: &FullPath) -> bool {
        if dir.is_root() {
            return !self.is_root();
        }
        self.0.len() > dir.0.len()
            && self.0.starts_with(dir.as_str())
            && self.0.as_bytes()[dir.0.len()] == b'/'
    }
}

impl fmt::Display for FullPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FullPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FullPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<FullPath> for String {
    fn from(path: FullPath) -> Self {
        path.0
    }
}

/// POSIX-style attributes of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
    pub mtime: DateTime<Utc>,
    pub crtime: DateTime<Utc>,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub ttl_sec: i32,
}

impl Attr {
    fn with_mode(mode: u32) -> Self {
        let now = Utc::now();
        Self {
            mtime: now,
            crtime: now,
            mode,
            uid: 0,
            gid: 0,
            mime: String::new(),
            ttl_sec: 0,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.mode & MODE_DIR != 0
    }
}

/// One node of the metadata tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub full_path: FullPath,
    pub attr: Attr,
    #[serde(default)]
    pub chunks: Vec<FileChunk>,
    #[serde(default)]
    pub extended: HashMap<String, Vec<u8>>,
}

impl Entry {
    /// A regular file holding `chunks`.
    pub fn file(path: impl Into<FullPath>, chunks: Vec<FileChunk>) -> Self {
        Self {
            full_path: path.into(),
            attr: Attr::with_mode(0o644),
            chunks,
            extended: HashMap::new(),
        }
    }

    /// An empty directory.
    pub fn directory(path: impl Into<FullPath>) -> Self {
        Self {
            full_path: path.into(),
            attr: Attr::with_mode(MODE_DIR | 0o755),
            chunks: Vec::new(),
            extended: HashMap::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attr.is_directory()
    }

    pub fn name(&self) -> &str {
        self.full_path.name()
    }

    /// Logical file size covered by the chunks.
    pub fn size(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| (c.offset.max(0) as u64).saturating_add(c.size))
            .max()
            .unwrap_or(0)
    }
}

/// Reference to a stored block of file data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileChunk {
    pub file_id: String,
    pub offset: i64,
    pub size: u64,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub e_tag: String,
}

impl FileChunk {
    pub fn new(file_id: impl Into<String>, offset: i64, size: u64) -> Self {
        Self {
            file_id: file_id.into(),
            offset,
            size,
            mtime: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            e_tag: String::new(),
        }
    }

    /// Parse the chunk's file id.
    pub fn fid(&self) -> Result<FileId, StoreError> {
        self.file_id.parse()
    }
}

/// Volume id of a stored chunk.
pub type VolumeId = u32;

/// Parsed `"<volume>,<needle key + cookie hex>"` chunk file id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId {
    pub volume_id: VolumeId,
    pub key_cookie: String,
}

impl std::str::FromStr for FileId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (volume, key_cookie) = s
            .split_once(',')
            .ok_or_else(|| StoreError::InvalidFileId(s.to_string()))?;
        let volume_id = volume
            .parse::<VolumeId>()
            .map_err(|_| StoreError::InvalidFileId(s.to_string()))?;
        if key_cookie.is_empty() || !key_cookie.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::InvalidFileId(s.to_string()));
        }
        Ok(Self {
            volume_id,
            key_cookie: key_cookie.to_string(),
        })
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.volume_id, self.key_cookie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path_normalization() {
        assert_eq!(FullPath::new("a/b/").as_str(), "/a/b");
        assert_eq!(FullPath::new("/").as_str(), "/");
        assert_eq!(FullPath::new("").as_str(), "/");
        assert!(FullPath::new("///").is_root());
    }

    #[test]
    fn test_full_path_components() {
        let p = FullPath::new("/a/b/c");
        assert_eq!(p.name(), "c");
        assert_eq!(p.parent(), Some(FullPath::new("/a/b")));
        assert_eq!(FullPath::new("/a").parent(), Some(FullPath::root()));
        assert_eq!(FullPath::root().parent(), None);
        assert_eq!(FullPath::root().name(), "");
        assert_eq!(FullPath::root().child("x").as_str(), "/x");
        assert_eq!(p.child("d").as_str(), "/a/b/c/d");
    }

    #[test]
    fn test_is_under() {
        let dir = FullPath::new("/a/b");
        assert!(FullPath::new("/a/b/c").is_under(&dir));
        assert!(FullPath::new("/a/b/c/d").is_under(&dir));
        assert!(!FullPath::new("/a/bc").is_under(&dir));
        assert!(!dir.is_under(&dir));
        assert!(dir.is_under(&FullPath::root()));
    }

    #[test]
    fn test_entry_kinds() {
        let dir = Entry::directory("/d");
        assert!(dir.is_directory());
        assert_eq!(dir.name(), "d");

        let file = Entry::file(
            "/d/f",
            vec![FileChunk::new("1,ab", 0, 10), FileChunk::new("1,cd", 10, 5)],
        );
        assert!(!file.is_directory());
        assert_eq!(file.size(), 15);
    }

    #[test]
    fn test_entry_size_saturates() {
        let file = Entry::file("/big", vec![FileChunk::new("1,ab", i64::MAX, u64::MAX)]);
        assert_eq!(file.size(), u64::MAX);
    }

    #[test]
    fn test_full_path_deserialize_normalizes() {
        let path: FullPath = serde_json::from_str(r#""a/b/""#).unwrap();
        assert_eq!(path, FullPath::new("/a/b"));
        assert_eq!(path.name(), "b");
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""/a/b""#);
    }

    #[test]
    fn test_file_id_parse() {
        let fid: FileId = "3,01637037d6".parse().unwrap();
        assert_eq!(fid.volume_id, 3);
        assert_eq!(fid.key_cookie, "01637037d6");
        assert_eq!(fid.to_string(), "3,01637037d6");

        assert!("301637037d6".parse::<FileId>().is_err());
        assert!("x,01".parse::<FileId>().is_err());
        assert!("3,".parse::<FileId>().is_err());
        assert!("3,zz".parse::<FileId>().is_err());
    }
}
