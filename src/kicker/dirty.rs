//! Dirty-set tracking and scoped cleanup
//!
//! `DirtySet` records which files currently carry an unreverted mutation.
//! `MutationScope` wraps a kicker for the lifetime of a benchmark loop and
//! guarantees `cleanup_all_dirty` runs on every exit path: explicitly via
//! `finish()`, or from `Drop` when the scope is abandoned by an early return
//! or a panic.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::{CleanupReport, Kicker};
use crate::error::Result;

/// Set of files carrying an unreverted mutation, in path order
#[derive(Debug, Default, Clone)]
pub struct DirtySet {
    files: BTreeSet<PathBuf>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a file dirty. Returns false if it already was.
    pub fn mark(&mut self, path: &Path) -> bool {
        self.files.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path)
    }

    /// Snapshot of the dirty files, in path order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Scoped acquisition of "mutations applied" with guaranteed release
pub struct MutationScope<'k, K: Kicker + ?Sized> {
    kicker: &'k mut K,
    released: bool,
}

impl<'k, K: Kicker + ?Sized> MutationScope<'k, K> {
    pub fn new(kicker: &'k mut K) -> Self {
        Self {
            kicker,
            released: false,
        }
    }

    /// Apply a mutation to `file` within this scope
    pub fn append(&mut self, file: &Path) -> Result<()> {
        self.kicker.append(file)
    }

    /// Number of files currently mutated
    pub fn dirty_count(&self) -> usize {
        self.kicker.dirty_files().len()
    }

    /// Release the scope, reverting every dirty file
    pub fn finish(mut self) -> CleanupReport {
        self.release()
    }

    fn release(&mut self) -> CleanupReport {
        if self.released {
            return CleanupReport::default();
        }
        self.released = true;
        self.kicker.cleanup_all_dirty()
    }
}

impl<K: Kicker + ?Sized> Drop for MutationScope<'_, K> {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Mutation scope dropped without finish(), reverting dirty files");
            let report = self.release();
            if !report.is_clean() {
                tracing::error!(
                    "{} file(s) could not be restored: {:?}",
                    report.unrestored.len(),
                    report.unrestored
                );
            }
        }
    }
}
