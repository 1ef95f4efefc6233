//! Comparison of computed digests against a reference map.
//!
//! `compare_digest` runs inline in whichever worker hashed the file;
//! `disappeared_files` runs once, single-threaded, after the pool drained.

use crate::output::Finding;
use crate::reference::ReferenceMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Classifies a freshly computed digest. Returns `None` for a match.
pub fn compare_digest(path: &Path, digest: &str, reference: &ReferenceMap) -> Option<Finding> {
    match reference.expected(path) {
        Some(expected) if expected == digest => None,
        Some(expected) => Some(Finding::Mismatch {
            path: path.to_path_buf(),
            found: digest.to_string(),
            expected: expected.to_string(),
        }),
        None => Some(Finding::Extra {
            path: path.to_path_buf(),
            digest: digest.to_string(),
        }),
    }
}

/// Reference entries that were never visited, sorted by path.
pub fn disappeared_files(reference: &ReferenceMap, visited: &HashSet<PathBuf>) -> Vec<Finding> {
    let mut missing: Vec<&Path> = reference
        .paths()
        .filter(|path| !visited.contains(*path))
        .collect();
    missing.sort_unstable();

    missing
        .into_iter()
        .map(|path| Finding::Disappeared {
            path: path.to_path_buf(),
        })
        .collect()
}
