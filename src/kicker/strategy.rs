//! Mutation strategies keyed by file type
//!
//! A strategy produces a single, uniquely named, side-effect-free declaration
//! for one language. The generated text differs on every call, but its byte
//! length never does: cleanup relies on regenerating the length rather than
//! remembering what was written.

use std::collections::HashMap;

use rand::distributions::Uniform;
use rand::Rng;

use crate::lang::FileType;

/// Marker prefix shared by every generated identifier
pub const KICK_MARKER: &str = "_kicked_";

/// Number of random characters in a generated identifier
pub const IDENTIFIER_LENGTH: usize = 100;

const IDENT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generated content together with its exact UTF-8 byte length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub content: String,
    pub len: usize,
}

impl Mutation {
    pub fn new(content: String) -> Self {
        let len = content.len();
        Self { content, len }
    }
}

/// Produces compilable no-op declarations for one file type
pub trait MutationStrategy: Send + Sync {
    /// Generate fresh content. `generate().len` must equal `mutation_len()`.
    fn generate(&self) -> Mutation;

    /// Byte length of every mutation this strategy produces
    fn mutation_len(&self) -> usize;
}

/// Strategy rendering `prefix + KICK_MARKER + random identifier + suffix`
#[derive(Debug, Clone)]
pub struct TemplateStrategy {
    prefix: String,
    suffix: String,
    ident_len: usize,
}

impl TemplateStrategy {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            ident_len: IDENTIFIER_LENGTH,
        }
    }

    /// Override the random identifier length
    pub fn with_identifier_length(mut self, len: usize) -> Self {
        self.ident_len = len;
        self
    }

    /// `def _kicked_X():\n    pass`
    pub fn python() -> Self {
        Self::new("def ", "():\n    pass")
    }

    /// `class _kicked_X {}`
    ///
    /// Appended after the public class, so it must be a top-level
    /// declaration: a package-private class is legal there, a method is not.
    pub fn java() -> Self {
        Self::new("class ", " {}")
    }

    /// `fun _kicked_X() {}`
    pub fn kotlin() -> Self {
        Self::new("fun ", "() {}")
    }

    fn random_identifier(&self) -> String {
        let dist = Uniform::from(0..IDENT_ALPHABET.len());
        rand::thread_rng()
            .sample_iter(dist)
            .take(self.ident_len)
            .map(|i| IDENT_ALPHABET[i] as char)
            .collect()
    }
}

impl MutationStrategy for TemplateStrategy {
    fn generate(&self) -> Mutation {
        let content = format!(
            "{}{}{}{}",
            self.prefix,
            KICK_MARKER,
            self.random_identifier(),
            self.suffix
        );
        Mutation::new(content)
    }

    fn mutation_len(&self) -> usize {
        // identifier alphabet is ASCII, one byte per character
        self.prefix.len() + KICK_MARKER.len() + self.ident_len + self.suffix.len()
    }
}

/// Registry mapping file types to their mutation strategy
pub struct StrategyRegistry {
    strategies: HashMap<FileType, Box<dyn MutationStrategy>>,
}

impl StrategyRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with Python, Java and Kotlin templates
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FileType::from_extension("py"), TemplateStrategy::python());
        registry.register(FileType::from_extension("java"), TemplateStrategy::java());
        registry.register(FileType::from_extension("kt"), TemplateStrategy::kotlin());
        registry
    }

    /// Register (or replace) the strategy for a file type
    pub fn register(&mut self, file_type: FileType, strategy: impl MutationStrategy + 'static) {
        self.strategies.insert(file_type, Box::new(strategy));
    }

    pub fn get(&self, file_type: &FileType) -> Option<&dyn MutationStrategy> {
        self.strategies.get(file_type).map(|s| s.as_ref())
    }

    pub fn supports(&self, file_type: &FileType) -> bool {
        self.strategies.contains_key(file_type)
    }

    /// Registered file types, sorted
    pub fn file_types(&self) -> Vec<&FileType> {
        let mut types: Vec<_> = self.strategies.keys().collect();
        types.sort();
        types
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("file_types", &self.file_types())
            .finish()
    }
}
