//! buildkick: incremental build benchmarking
//!
//! This library measures how long build systems take to rebuild after a small
//! source change. Each timed iteration appends a unique, reversible snippet of
//! code (a "kick") to every eligible source file, runs one build per
//! registered build system, and records the wall-clock duration. Every kick is
//! reverted afterwards, even when a build fails.
//!
//! # Supported Source Types
//!
//! - Python (`.py`)
//! - Java (`.java`)
//! - Kotlin (`.kt`)
//!
//! Further types can be added by registering a `MutationStrategy`.
//!
//! # Example
//!
//! ```ignore
//! use buildkick::{BuildInvoker, BuildRequest, BuildSystem, FunctionKicker, Orchestrator};
//! use std::path::PathBuf;
//!
//! let bazel = BuildInvoker::new(BuildSystem::new("Bazel", "bazel").with_working_dir("/ws"))
//!     .bind(BuildRequest::new("build").with_target("//app:app"));
//!
//! let mut orchestrator = Orchestrator::new(FunctionKicker::new());
//! orchestrator.register(bazel, "#4CAF50");
//!
//! let run = orchestrator.run(&[PathBuf::from("/ws/app/Main.java")], 5)?;
//! buildkick::write_table("incremental_build_times.csv".as_ref(), &run.series)?;
//! ```

pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod interrupt;
pub mod invoker;
pub mod kicker;
pub mod lang;
pub mod orchestrator;
pub mod report;
pub mod stats;

// Re-export commonly used types
pub use cli::{Cli, Commands, OutputFormat};
pub use config::{BenchConfig, BuildSystemConfig, DiscoveryConfig};
pub use discovery::{BazelQuery, Buck2Query, ExclusionFilter, FileListQuery, SourceQuery};
pub use error::{KickError, Result};
pub use interrupt::Interrupt;
pub use invoker::{BoundBuild, BuildInvoker, BuildOutcome, BuildRequest, BuildSystem, BuildTool};
pub use kicker::{
    CleanupOutcome, CleanupReport, DirtySet, FunctionKicker, Kicker, MutationScope,
    MutationStrategy, StrategyRegistry, TemplateStrategy,
};
pub use lang::FileType;
pub use orchestrator::{BenchmarkRun, Orchestrator, Phase, WarmupTime};
pub use report::{read_table, write_run_report, write_table, RunReport};
pub use stats::{summarize, Insights, Series, Summary};
