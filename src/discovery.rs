//! Source-file discovery via build-graph queries
//!
//! The orchestrator only needs "a finite list of source paths". Each query
//! asks a build tool for the declared sources in a target's dependency
//! closure and maps build labels back to filesystem paths.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use serde::Deserialize;

use crate::error::{KickError, Result};

/// Produces the source files to mutate
pub trait SourceQuery {
    fn source_files(&self) -> Result<Vec<PathBuf>>;
}

/// Map a `cell//path/to/file` label onto `dir/path/to/file`.
///
/// The label must contain `//` exactly once.
pub fn replace_target_prefix(label: &str, dir: &Path) -> Result<PathBuf> {
    let parts: Vec<&str> = label.split("//").collect();
    if parts.len() != 2 {
        return Err(KickError::validation(format!(
            "label must contain '//' exactly once: '{}'",
            label
        )));
    }
    Ok(dir.join(parts[1]))
}

/// Split a `path/to/root//label` workspace target into `(path/to/root, //label)`
pub fn split_workspace_target(spec: &str) -> Result<(PathBuf, String)> {
    let parts: Vec<&str> = spec.split("//").collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(KickError::validation(format!(
            "invalid workspace target '{}', expected format 'path/to/root//target'",
            spec
        )));
    }
    Ok((PathBuf::from(parts[0]), format!("//{}", parts[1])))
}

fn run_query(program: &str, args: &[String], cwd: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::debug!("Running source query: {} {:?}", program, args);
    let output = cmd.output().map_err(|e| KickError::QueryFailed {
        message: format!("failed to run {}: {}", program, e),
    })?;

    if !output.status.success() {
        return Err(KickError::QueryFailed {
            message: format!(
                "{} query failed ({}): {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// ============================================================================
// Buck2
// ============================================================================

/// `buck2 uquery "filter('<prefix>', deps(<target>))" --output-attribute srcs`
#[derive(Debug, Clone)]
pub struct Buck2Query {
    /// buck2 executable
    pub buck2: String,
    /// Filesystem root of the cell, replaces `cell//` in source labels
    pub cell_root: PathBuf,
    /// Only targets matching this prefix contribute sources
    pub target_prefix: String,
    /// Root target whose dependency closure is queried
    pub target: String,
    /// Source extensions to drop (lowercase, no dot)
    pub skip_extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Buck2Attrs {
    #[serde(default)]
    srcs: Vec<String>,
}

impl Buck2Query {
    pub fn new(
        cell_root: impl Into<PathBuf>,
        target_prefix: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            buck2: "buck2".to_string(),
            cell_root: cell_root.into(),
            target_prefix: target_prefix.into(),
            target: target.into(),
            skip_extensions: vec!["xml".to_string()],
        }
    }

    fn query_args(&self) -> Vec<String> {
        vec![
            "uquery".to_string(),
            format!("filter('{}', deps({}))", self.target_prefix, self.target),
            "--output-attribute".to_string(),
            "srcs".to_string(),
        ]
    }

    /// Parse `{"target": {"srcs": [...]}, ...}` into filesystem paths
    pub fn parse_output(&self, json: &str) -> Result<Vec<PathBuf>> {
        // BTreeMap keeps target order stable across runs
        let targets: BTreeMap<String, Buck2Attrs> =
            serde_json::from_str(json).map_err(|e| KickError::QueryFailed {
                message: format!("unexpected buck2 query output: {}", e),
            })?;

        let mut files = Vec::new();
        for attrs in targets.into_values() {
            for src in attrs.srcs {
                let lower = src.to_lowercase();
                if self
                    .skip_extensions
                    .iter()
                    .any(|ext| lower.ends_with(&format!(".{}", ext)))
                {
                    continue;
                }
                files.push(replace_target_prefix(&src, &self.cell_root)?);
            }
        }
        Ok(files)
    }
}

impl SourceQuery for Buck2Query {
    fn source_files(&self) -> Result<Vec<PathBuf>> {
        let stdout = run_query(&self.buck2, &self.query_args(), Some(&self.cell_root))?;
        let files = self.parse_output(&stdout)?;
        tracing::info!("buck2 query returned {} source file(s)", files.len());
        Ok(files)
    }
}

// ============================================================================
// Bazel
// ============================================================================

/// `bazel query 'kind("source file", deps(<target>))'`
#[derive(Debug, Clone)]
pub struct BazelQuery {
    /// bazel executable
    pub bazel: String,
    /// Workspace root, used as working directory and label root
    pub workspace: PathBuf,
    /// Root target, e.g. `//app:app`
    pub target: String,
    /// Source extensions to keep (no dot)
    pub extensions: Vec<String>,
}

impl BazelQuery {
    pub fn new(
        workspace: impl Into<PathBuf>,
        target: impl Into<String>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            bazel: "bazel".to_string(),
            workspace: workspace.into(),
            target: target.into(),
            extensions,
        }
    }

    fn query_args(&self) -> Vec<String> {
        vec![
            "query".to_string(),
            format!("kind(\"source file\", deps({}))", self.target),
        ]
    }

    /// Keep `//pkg:file.ext` labels with a wanted extension and map them to paths
    pub fn parse_output(&self, stdout: &str) -> Result<Vec<PathBuf>> {
        let patterns = self
            .extensions
            .iter()
            .map(|ext| Regex::new(&format!(r"^//.*\.{}$", regex::escape(ext))))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| KickError::validation(format!("invalid extension pattern: {}", e)))?;

        let mut files = Vec::new();
        for line in stdout.lines().map(str::trim) {
            if patterns.iter().any(|re| re.is_match(line)) {
                let label = line.replace(':', "/");
                files.push(replace_target_prefix(&label, &self.workspace)?);
            }
        }
        Ok(files)
    }
}

impl SourceQuery for BazelQuery {
    fn source_files(&self) -> Result<Vec<PathBuf>> {
        let stdout = run_query(&self.bazel, &self.query_args(), Some(&self.workspace))?;
        let files = self.parse_output(&stdout)?;
        tracing::info!("bazel query returned {} source file(s)", files.len());
        Ok(files)
    }
}

// ============================================================================
// Explicit list
// ============================================================================

/// Fixed list of files, relative paths resolved against `root`
#[derive(Debug, Clone, Default)]
pub struct FileListQuery {
    pub root: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl FileListQuery {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { root: None, files }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

impl SourceQuery for FileListQuery {
    fn source_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .iter()
            .map(|f| match &self.root {
                Some(root) if f.is_relative() => root.join(f),
                _ => f.clone(),
            })
            .collect())
    }
}

// ============================================================================
// Exclusion
// ============================================================================

/// Substring filter for files that must not be mutated (generated sources, ...)
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<String>,
}

impl ExclusionFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.patterns.iter().any(|p| text.contains(p.as_str()))
    }

    /// Split files into `(eligible, excluded)`, preserving order
    pub fn partition(&self, files: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
        files.into_iter().partition(|f| !self.is_excluded(f))
    }
}
