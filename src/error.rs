//! Error types and exit codes for buildkick

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for buildkick operations
#[derive(Error, Debug)]
pub enum KickError {
    #[error("No mutation strategy for file type '{extension}': {path}")]
    UnsupportedFileType { path: PathBuf, extension: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("I/O error on {path}: {message}")]
    IoFailure { path: PathBuf, message: String },

    #[error("{build_system} build failed ({status}):\n{output}")]
    BuildFailed {
        build_system: String,
        status: String,
        output: String,
    },

    #[error("{build_system} build timed out after {timeout_secs:.1}s")]
    BuildTimedOut {
        build_system: String,
        timeout_secs: f64,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Source query failed: {message}")]
    QueryFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Cleanup incomplete, {} file(s) may still be mutated: {}", files.len(), display_paths(files))]
    CleanupIncomplete { files: Vec<PathBuf> },

    #[error("Interrupted, benchmark aborted")]
    Interrupted,
}

fn display_paths(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl KickError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Wrap an `std::io::Error` raised while touching `path`
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::IoFailure {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Convert error to a process exit code:
    /// - 0: Success
    /// - 1: File not found / IO error
    /// - 2: Unsupported file type
    /// - 3: Build failed or timed out
    /// - 4: Validation / configuration error
    /// - 5: Source query failure
    /// - 6: Cleanup left files mutated
    /// - 130: Interrupted by SIGINT/SIGTERM
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(1),
            Self::IoFailure { .. } => ExitCode::from(1),
            Self::UnsupportedFileType { .. } => ExitCode::from(2),
            Self::BuildFailed { .. } => ExitCode::from(3),
            Self::BuildTimedOut { .. } => ExitCode::from(3),
            Self::ValidationError { .. } => ExitCode::from(4),
            Self::ConfigError { .. } => ExitCode::from(4),
            Self::QueryFailed { .. } => ExitCode::from(5),
            Self::CleanupIncomplete { .. } => ExitCode::from(6),
            Self::Interrupted => ExitCode::from(130),
        }
    }
}

/// Result type alias for buildkick operations
pub type Result<T> = std::result::Result<T, KickError>;
