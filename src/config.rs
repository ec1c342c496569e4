//! Benchmark configuration file
//!
//! A TOML file registers the build systems to compare, how source files are
//! discovered, and run defaults:
//!
//! ```toml
//! [benchmark]
//! iterations = 5
//! exclude = ["/_generated_databinding/"]
//!
//! [discovery]
//! kind = "buck2"
//! cell_root = "/work/android"
//! target_prefix = "root//app"
//! target = "root//app:app"
//!
//! [[build_systems]]
//! name = "Bazel"
//! command = "bazel"
//! target = "/work/android-bazel//app:app"
//! split_workspace = true
//!
//! [[build_systems]]
//! name = "Buck2"
//! command = "buck2"
//! target = "root//app:app"
//! working_dir = "/work/android"
//! args = { "--isolation-dir" = "buck2_isolation" }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::{
    split_workspace_target, BazelQuery, Buck2Query, ExclusionFilter, FileListQuery, SourceQuery,
};
use crate::error::{KickError, Result};
use crate::invoker::{BoundBuild, BuildInvoker, BuildRequest, BuildSystem};
use crate::report::is_hex_color;

/// Colors assigned by registration order when a build system has none
pub const DEFAULT_COLORS: &[&str] = &[
    "#4CAF50", "#FF9800", "#9C27B0", "#2196F3", "#F44336", "#607D8B",
];

/// Top-level benchmark configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub benchmark: BenchmarkSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub build_systems: Vec<BuildSystemConfig>,
}

/// Run defaults, overridable from the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    /// Number of timed incremental builds per build system
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Substrings of paths that must never be mutated
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Per-build timeout in seconds; unbounded when absent
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

fn default_iterations() -> usize {
    5
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            exclude: Vec::new(),
            timeout_secs: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Where the list of source files comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiscoveryConfig {
    Buck2 {
        #[serde(default = "default_buck2")]
        buck2: String,
        cell_root: PathBuf,
        target_prefix: String,
        target: String,
        #[serde(default = "default_skip_extensions")]
        skip_extensions: Vec<String>,
    },
    Bazel {
        #[serde(default = "default_bazel")]
        bazel: String,
        workspace: PathBuf,
        target: String,
        extensions: Vec<String>,
    },
    Files {
        #[serde(default)]
        root: Option<PathBuf>,
        #[serde(default)]
        files: Vec<PathBuf>,
    },
}

fn default_buck2() -> String {
    "buck2".to_string()
}

fn default_bazel() -> String {
    "bazel".to_string()
}

fn default_skip_extensions() -> Vec<String> {
    vec!["xml".to_string()]
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::Files {
            root: None,
            files: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Build the source query this configuration describes
    pub fn source_query(&self) -> Box<dyn SourceQuery> {
        match self {
            Self::Buck2 {
                buck2,
                cell_root,
                target_prefix,
                target,
                skip_extensions,
            } => {
                let mut query = Buck2Query::new(cell_root, target_prefix, target);
                query.buck2 = buck2.clone();
                query.skip_extensions = skip_extensions.iter().map(|e| e.to_lowercase()).collect();
                Box::new(query)
            }
            Self::Bazel {
                bazel,
                workspace,
                target,
                extensions,
            } => {
                let mut query = BazelQuery::new(workspace, target, extensions.clone());
                query.bazel = bazel.clone();
                Box::new(query)
            }
            Self::Files { root, files } => {
                let query = FileListQuery::new(files.clone());
                match root {
                    Some(root) => Box::new(query.with_root(root)),
                    None => Box::new(query),
                }
            }
        }
    }
}

/// One registered build system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSystemConfig {
    /// Display name
    pub name: String,

    /// Executable to invoke
    pub command: String,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Extra flag → value pairs placed before the build subcommand, in file order.
    /// Values must be strings.
    #[serde(default)]
    pub args: toml::Table,

    /// Build subcommand
    #[serde(default = "default_build_command")]
    pub build_command: String,

    #[serde(default)]
    pub target: Option<String>,

    /// Treat `target` as `path/to/root//label`: run in `path/to/root` and build `//label`
    #[serde(default)]
    pub split_workspace: bool,

    /// Display color (#RGB or #RRGGBB)
    #[serde(default)]
    pub color: Option<String>,
}

fn default_build_command() -> String {
    "build".to_string()
}

impl BuildSystemConfig {
    /// Color for this build system, falling back to the palette by position
    pub fn color_at(&self, index: usize) -> String {
        self.color
            .clone()
            .unwrap_or_else(|| DEFAULT_COLORS[index % DEFAULT_COLORS.len()].to_string())
    }

    /// Flag/value pairs in declaration order
    pub fn arg_pairs(&self) -> Result<Vec<(String, String)>> {
        self.args
            .iter()
            .map(|(flag, value)| match value.as_str() {
                Some(value) => Ok((flag.clone(), value.to_string())),
                None => Err(KickError::ConfigError {
                    message: format!(
                        "argument '{}' for build system '{}' must be a string, got {}",
                        flag,
                        self.name,
                        value.type_str()
                    ),
                }),
            })
            .collect()
    }

    /// Resolve into a runnable build bound to its command and target
    pub fn resolve(&self, timeout: Option<Duration>) -> Result<BoundBuild> {
        let mut system = BuildSystem::new(&self.name, &self.command);
        system.working_dir = self.working_dir.clone();

        let mut request = BuildRequest::new(&self.build_command);
        request.args = self.arg_pairs()?;

        match (&self.target, self.split_workspace) {
            (Some(target), true) => {
                let (dir, label) = split_workspace_target(target)?;
                system.working_dir = Some(dir);
                request.target = Some(label);
            }
            (None, true) => {
                return Err(KickError::ConfigError {
                    message: format!(
                        "build system '{}' has split_workspace set but no target",
                        self.name
                    ),
                });
            }
            (target, false) => request.target = target.clone(),
        }

        Ok(BuildInvoker::new(system).with_timeout(timeout).bind(request))
    }
}

/// Parse a `NAME=TARGET` command-line override
pub fn parse_target_override(spec: &str) -> Result<(String, String)> {
    let (name, target) = spec.split_once('=').ok_or_else(|| {
        KickError::validation(format!(
            "invalid target spec '{}', expected NAME=TARGET",
            spec
        ))
    })?;
    let (name, target) = (name.trim(), target.trim());
    if name.is_empty() || target.is_empty() {
        return Err(KickError::validation(format!(
            "invalid target spec '{}', name and target must be non-empty",
            spec
        )));
    }
    Ok((name.to_string(), target.to_string()))
}

impl BenchConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(KickError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| KickError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| KickError::ConfigError {
            message: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check registration invariants
    pub fn validate(&self) -> Result<()> {
        if self.build_systems.is_empty() {
            return Err(KickError::ConfigError {
                message: "at least one [[build_systems]] entry is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for system in &self.build_systems {
            if system.name.trim().is_empty() {
                return Err(KickError::ConfigError {
                    message: "build system name must be non-empty".to_string(),
                });
            }
            if system.name.trim() != system.name {
                return Err(KickError::ConfigError {
                    message: format!(
                        "build system name '{}' has surrounding whitespace",
                        system.name
                    ),
                });
            }
            if !seen.insert(system.name.as_str()) {
                return Err(KickError::ConfigError {
                    message: format!("duplicate build system name '{}'", system.name),
                });
            }
            if let Some(color) = &system.color {
                if !is_hex_color(color) {
                    return Err(KickError::ConfigError {
                        message: format!(
                            "invalid hex color '{}' for build system '{}'",
                            color, system.name
                        ),
                    });
                }
            }
            system.arg_pairs()?;
        }

        if self.benchmark.iterations == 0 {
            return Err(KickError::ConfigError {
                message: "benchmark.iterations must be at least 1".to_string(),
            });
        }
        if let Some(secs) = self.benchmark.timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(KickError::ConfigError {
                    message: format!("benchmark.timeout_secs must be positive, got {}", secs),
                });
            }
        }
        self.timeout()?;
        Ok(())
    }

    /// Replace targets from `NAME=TARGET` overrides; unknown names are rejected
    pub fn apply_target_overrides(&mut self, overrides: &[(String, String)]) -> Result<()> {
        for (name, target) in overrides {
            let system = self
                .build_systems
                .iter_mut()
                .find(|s| &s.name == name)
                .ok_or_else(|| {
                    KickError::validation(format!("unknown build system '{}' in target spec", name))
                })?;
            system.target = Some(target.clone());
        }
        Ok(())
    }

    /// Per-build timeout; errors when `timeout_secs` is not a representable duration
    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.benchmark
            .timeout_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| KickError::ConfigError {
                    message: format!("benchmark.timeout_secs {} is out of range: {}", secs, e),
                })
            })
            .transpose()
    }

    pub fn exclusion_filter(&self) -> ExclusionFilter {
        ExclusionFilter::new(self.benchmark.exclude.iter().cloned())
    }

    /// Every build system resolved and paired with its color, in registration order
    pub fn build_tools(&self) -> Result<Vec<(BoundBuild, String)>> {
        let timeout = self.timeout()?;
        self.build_systems
            .iter()
            .enumerate()
            .map(|(i, system)| Ok((system.resolve(timeout)?, system.color_at(i))))
            .collect()
    }
}
