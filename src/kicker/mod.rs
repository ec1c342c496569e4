//! Source mutation ("kicking")
//!
//! A kicker appends a synthetic, compilable declaration to a source file so
//! that a build tool treats the file as changed, and later truncates exactly
//! that many bytes to restore the original content.
//!
//! No diff is stored. Cleanup regenerates the removal length from the file's
//! mutation strategy, which is why every strategy has a fixed output length.

pub mod dirty;
pub mod strategy;

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{KickError, Result};
use crate::lang::FileType;

pub use dirty::{DirtySet, MutationScope};
pub use strategy::{Mutation, MutationStrategy, StrategyRegistry, TemplateStrategy};

/// Bytes wrapped around every mutation: one leading and one trailing newline
const WRAPPER_LEN: usize = 2;

/// Result of reverting a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Mutation removed, file back to its original bytes
    Restored,
    /// File was not marked dirty, nothing to do
    NotDirty,
    /// File is shorter than the mutation it should carry; left untouched
    TooSmall { size: u64, expected: u64 },
    /// File could not be read or truncated
    Failed { reason: String },
}

impl CleanupOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored)
    }
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restored => write!(f, "restored"),
            Self::NotDirty => write!(f, "not dirty"),
            Self::TooSmall { size, expected } => write!(
                f,
                "file is {} bytes, smaller than expected mutation length {}",
                size, expected
            ),
            Self::Failed { reason } => write!(f, "{}", reason),
        }
    }
}

/// Summary of a bulk cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Number of files restored
    pub restored: usize,
    /// Files that could not be restored
    pub unrestored: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.unrestored.is_empty()
    }
}

/// Applies and reverts reversible source mutations
pub trait Kicker {
    /// Append a fresh mutation to `file`, reverting any previous one first.
    fn append(&mut self, file: &Path) -> Result<()>;

    /// Revert the mutation carried by `file`. Never fails; problems are
    /// logged and reported through the outcome.
    fn cleanup(&mut self, file: &Path) -> CleanupOutcome;

    /// Files currently carrying a mutation
    fn dirty_files(&self) -> &DirtySet;

    /// Forget every dirty entry without touching files
    fn clear_dirty(&mut self);

    /// Revert every file in `files`
    fn cleanup_all(&mut self, files: &[PathBuf]) -> CleanupReport {
        let mut report = CleanupReport::default();
        for file in files {
            match self.cleanup(file) {
                CleanupOutcome::Restored => report.restored += 1,
                CleanupOutcome::NotDirty => {}
                _ => report.unrestored.push(file.clone()),
            }
        }
        report
    }

    /// Revert every dirty file, then clear the dirty set unconditionally
    fn cleanup_all_dirty(&mut self) -> CleanupReport {
        let files = self.dirty_files().paths();
        let report = self.cleanup_all(&files);
        self.clear_dirty();

        if report.is_clean() {
            tracing::info!("Reverted {} mutated file(s)", report.restored);
        } else {
            tracing::warn!(
                "Reverted {} mutated file(s), {} could not be restored",
                report.restored,
                report.unrestored.len()
            );
        }
        report
    }
}

/// Kicker that appends uniquely named empty functions
#[derive(Debug, Default)]
pub struct FunctionKicker {
    registry: StrategyRegistry,
    dirty: DirtySet,
}

impl FunctionKicker {
    /// Kicker with the default Python/Java/Kotlin strategies
    pub fn new() -> Self {
        Self::with_registry(StrategyRegistry::with_defaults())
    }

    pub fn with_registry(registry: StrategyRegistry) -> Self {
        Self {
            registry,
            dirty: DirtySet::new(),
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Whether `file` has a registered strategy
    pub fn supports(&self, file: &Path) -> bool {
        FileType::from_path(file)
            .map(|ft| self.registry.supports(&ft))
            .unwrap_or(false)
    }

    fn validate_file_type(&self, file: &Path) -> Result<FileType> {
        let file_type = FileType::from_path(file)?;
        if !self.registry.supports(&file_type) {
            return Err(KickError::UnsupportedFileType {
                path: file.to_path_buf(),
                extension: file_type.extension().to_string(),
            });
        }
        Ok(file_type)
    }

    fn generate(&self, file_type: &FileType) -> Option<Mutation> {
        self.registry.get(file_type).map(|s| s.generate())
    }

    /// Bytes to truncate from `file`: newline + mutation + newline
    fn removal_len(&self, file: &Path) -> Result<u64> {
        let file_type = self.validate_file_type(file)?;
        let strategy = self
            .registry
            .get(&file_type)
            .ok_or_else(|| KickError::UnsupportedFileType {
                path: file.to_path_buf(),
                extension: file_type.extension().to_string(),
            })?;
        Ok((WRAPPER_LEN + strategy.mutation_len()) as u64)
    }
}

impl Kicker for FunctionKicker {
    fn append(&mut self, file: &Path) -> Result<()> {
        let file_type = self.validate_file_type(file)?;

        if !file.exists() {
            return Err(KickError::FileNotFound {
                path: file.to_path_buf(),
            });
        }

        if self.dirty.contains(file) {
            let outcome = self.cleanup(file);
            if !outcome.is_restored() {
                return Err(KickError::IoFailure {
                    path: file.to_path_buf(),
                    message: format!("previous mutation could not be reverted: {}", outcome),
                });
            }
        }

        let mutation = self
            .generate(&file_type)
            .ok_or_else(|| KickError::UnsupportedFileType {
                path: file.to_path_buf(),
                extension: file_type.extension().to_string(),
            })?;

        let mut handle = OpenOptions::new()
            .append(true)
            .open(file)
            .map_err(|e| KickError::io(file, e))?;
        let original_len = handle
            .metadata()
            .map_err(|e| KickError::io(file, e))?
            .len();
        write_or_rollback(&mut handle, original_len, |f| {
            f.write_all(format!("\n{}\n", mutation.content).as_bytes())
        })
        .map_err(|e| KickError::io(file, e))?;

        self.dirty.mark(file);
        tracing::debug!("Kicked {} ({} bytes)", file.display(), mutation.len + WRAPPER_LEN);
        Ok(())
    }

    fn cleanup(&mut self, file: &Path) -> CleanupOutcome {
        if !self.dirty.contains(file) {
            tracing::debug!("Skipping cleanup of {}: not dirty", file.display());
            return CleanupOutcome::NotDirty;
        }

        let expected = match self.removal_len(file) {
            Ok(len) => len,
            Err(e) => {
                tracing::error!("Cannot revert '{}': {}", file.display(), e);
                return CleanupOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        match truncate_tail(file, expected) {
            Ok(TruncateResult::Truncated) => {
                self.dirty.remove(file);
                tracing::debug!("Reverted {}", file.display());
                CleanupOutcome::Restored
            }
            Ok(TruncateResult::TooSmall(size)) => {
                tracing::warn!(
                    "File '{}' is smaller than expected content length ({} < {} bytes), leaving it untouched",
                    file.display(),
                    size,
                    expected
                );
                CleanupOutcome::TooSmall { size, expected }
            }
            Err(e) => {
                let err = KickError::io(file, e);
                tracing::error!("Error reverting '{}': {}", file.display(), err);
                CleanupOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn dirty_files(&self) -> &DirtySet {
        &self.dirty
    }

    fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

enum TruncateResult {
    Truncated,
    TooSmall(u64),
}

/// Remove the last `len` bytes of `path`, unless the file is shorter than `len`
/// Run `write`; on failure cut the file back to `original_len` so a partial
/// append never outlives the error.
fn write_or_rollback(
    file: &mut File,
    original_len: u64,
    write: impl FnOnce(&mut File) -> io::Result<()>,
) -> io::Result<()> {
    let result = write(file);
    if result.is_err() {
        if let Err(e) = file.set_len(original_len) {
            tracing::error!(
                "Failed to roll back partial append (original length {} bytes): {}",
                original_len,
                e
            );
        }
    }
    result
}

fn truncate_tail(path: &Path, len: u64) -> io::Result<TruncateResult> {
    let file = OpenOptions::new().write(true).open(path)?;
    let size = file.metadata()?.len();
    if size < len {
        return Ok(TruncateResult::TooSmall(size));
    }
    file.set_len(size - len)?;
    file.sync_all()?;
    Ok(TruncateResult::Truncated)
}
