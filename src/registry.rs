use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Set of every regular file path that was hashed during the run.
///
/// Workers insert concurrently; the set is only read back once the pool has
/// drained, by the reconciliation pass.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    paths: Mutex<HashSet<PathBuf>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as visited. Recording the same path twice is harmless.
    pub fn record(&self, path: &Path) {
        let mut paths = self.paths.lock();
        if !paths.contains(path) {
            paths.insert(path.to_path_buf());
        }
    }

    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    /// Consumes the registry once no writer remains.
    pub fn into_paths(self) -> HashSet<PathBuf> {
        self.paths.into_inner()
    }
}
