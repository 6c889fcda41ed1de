// Test fixtures and tree generators for integration tests

use filer::{Entry, FileChunk, FullPath, MemoryStore};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic random tree generator for reproducible tests
pub struct TreeGenerator {
    rng: StdRng,
    next_key: u64,
}

impl TreeGenerator {
    /// Creates a new generator with a fixed seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_key: 1,
        }
    }

    /// Generates a random lowercase name of the given length
    pub fn random_name(&mut self, len: usize) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    }

    /// Generates a chunk with a unique file id on a random volume
    pub fn random_chunk(&mut self) -> FileChunk {
        let volume = self.rng.gen_range(1..=4u32);
        let key = self.next_key;
        self.next_key += 1;
        FileChunk::new(format!("{},{:x}", volume, key), 0, self.rng.gen_range(1..4096))
    }

    /// Generates a random subtree under `root` and returns every created entry.
    ///
    /// Names within one directory are unique, so the result has no duplicates.
    pub fn random_tree(
        &mut self,
        root: &FullPath,
        max_depth: usize,
        max_fanout: usize,
    ) -> Vec<Entry> {
        let mut entries = vec![Entry::directory(root.clone())];
        self.fill(root, max_depth, max_fanout, &mut entries);
        entries
    }

    fn fill(&mut self, dir: &FullPath, depth: usize, max_fanout: usize, out: &mut Vec<Entry>) {
        let fanout = self.rng.gen_range(0..=max_fanout);
        for i in 0..fanout {
            let name = format!("{}{:02}", self.random_name(4), i);
            let path = dir.child(&name);
            if depth > 0 && self.rng.gen_bool(0.35) {
                out.push(Entry::directory(path.clone()));
                self.fill(&path, depth - 1, max_fanout, out);
            } else {
                let count = self.rng.gen_range(0..=3);
                let chunks = (0..count).map(|_| self.random_chunk()).collect();
                out.push(Entry::file(path, chunks));
            }
        }
    }
}

impl Default for TreeGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Load `entries` into `store`.
pub fn populate(store: &MemoryStore, entries: &[Entry]) {
    for entry in entries {
        store.insert_entry(entry.clone());
    }
}

/// Sorted file ids of every chunk held by `entries`.
pub fn chunk_ids(entries: &[Entry]) -> Vec<String> {
    let mut ids: Vec<String> = entries
        .iter()
        .flat_map(|e| e.chunks.iter().map(|c| c.file_id.clone()))
        .collect();
    ids.sort();
    ids
}

/// A chunk with the given file id.
pub fn chunk(file_id: &str) -> FileChunk {
    FileChunk::new(file_id, 0, 1024)
}

/// The tree used by most deletion scenarios.
///
/// ```text
/// /d
/// ├── a/x      (3,0a)
/// ├── b/y      (3,0b)
/// ├── f        (1,01) (2,02)
/// └── g
/// /keep/k      (9,ff)
/// ```
pub fn standard_tree() -> Vec<Entry> {
    vec![
        Entry::directory("/d"),
        Entry::directory("/d/a"),
        Entry::file("/d/a/x", vec![chunk("3,0a")]),
        Entry::directory("/d/b"),
        Entry::file("/d/b/y", vec![chunk("3,0b")]),
        Entry::file("/d/f", vec![chunk("1,01"), chunk("2,02")]),
        Entry::file("/d/g", vec![]),
        Entry::directory("/keep"),
        Entry::file("/keep/k", vec![chunk("9,ff")]),
    ]
}
