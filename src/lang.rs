//! File type detection from path extensions

use std::fmt;
use std::path::Path;

use crate::error::{KickError, Result};

/// File-type tag of a source file, derived from its extension.
///
/// The tag is the lowercased extension without the leading dot, so
/// `Foo.JAVA` and `Bar.java` share the `java` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileType(String);

impl FileType {
    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| KickError::UnsupportedFileType {
                path: path.to_path_buf(),
                extension: "none".to_string(),
            })?;

        Ok(Self::from_extension(ext))
    }

    /// Build a file type from an extension string (with or without a leading dot)
    pub fn from_extension(ext: &str) -> Self {
        Self(ext.trim_start_matches('.').to_lowercase())
    }

    /// The normalized extension
    pub fn extension(&self) -> &str {
        &self.0
    }

    /// Human-readable language name for well-known extensions
    pub fn language(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "py" | "pyi" => Some("Python"),
            "java" => Some("Java"),
            "kt" | "kts" => Some("Kotlin"),
            "scala" => Some("Scala"),
            "go" => Some("Go"),
            "rs" => Some("Rust"),
            "c" | "h" => Some("C"),
            "cpp" | "cc" | "cxx" | "hpp" => Some("C++"),
            "ts" | "tsx" => Some("TypeScript"),
            "js" | "jsx" => Some("JavaScript"),
            _ => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.language() {
            Some(lang) => write!(f, "{} (.{})", lang, self.0),
            None => write!(f, ".{}", self.0),
        }
    }
}
