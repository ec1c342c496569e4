//! Benchmark orchestration
//!
//! Drives a run through `Idle → WarmingUp → Iterating(1..=N) → Cleanup → Done`:
//!
//! 1. **WarmingUp**: one build per registered tool, in registration order.
//!    These durations prime caches and are kept apart from the timed series.
//! 2. **Iterating(i)**: kick every eligible source file, then run exactly one
//!    build per tool, strictly sequentially and always in registration order.
//! 3. **Cleanup**: revert every dirty file. This runs whether the iterations
//!    completed or failed, because the loop executes inside a
//!    `MutationScope` whose release is guaranteed.
//!
//! Any failed build aborts the run after cleanup. There is no partial report.
//! A triggered `Interrupt` is checked before every kick round and every build
//! and aborts the same way.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::discovery::ExclusionFilter;
use crate::error::{KickError, Result};
use crate::interrupt::Interrupt;
use crate::invoker::BuildTool;
use crate::kicker::{Kicker, MutationScope};
use crate::stats::Series;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    WarmingUp,
    /// 1-based iteration index
    Iterating(usize),
    Cleanup,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::WarmingUp => write!(f, "warming up"),
            Phase::Iterating(i) => write!(f, "iteration {}", i),
            Phase::Cleanup => write!(f, "cleanup"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// Untimed-for-comparison warm-up duration of one build system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarmupTime {
    pub name: String,
    pub seconds: f64,
}

/// Measurements from a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRun {
    pub iterations: usize,
    /// Eligible files kicked on every iteration
    pub mutated_files: usize,
    /// Files skipped by the exclusion filter
    pub excluded_files: usize,
    pub warmup: Vec<WarmupTime>,
    /// One series per tool, in registration order
    pub series: Vec<Series>,
}

struct RegisteredTool {
    tool: Box<dyn BuildTool>,
    color: String,
}

/// Runs warm-up and timed iterations across registered build tools
pub struct Orchestrator<K: Kicker> {
    kicker: K,
    tools: Vec<RegisteredTool>,
    filter: ExclusionFilter,
    interrupt: Interrupt,
    phase: Phase,
}

impl<K: Kicker> Orchestrator<K> {
    pub fn new(kicker: K) -> Self {
        Self {
            kicker,
            tools: Vec::new(),
            filter: ExclusionFilter::default(),
            interrupt: Interrupt::new(),
            phase: Phase::Idle,
        }
    }

    /// Files matching `filter` are never kicked
    pub fn with_exclusions(mut self, filter: ExclusionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Stop between steps once `interrupt` fires
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Register a tool; registration order is build order
    pub fn register(&mut self, tool: impl BuildTool + 'static, color: impl Into<String>) {
        self.register_boxed(Box::new(tool), color);
    }

    pub fn register_boxed(&mut self, tool: Box<dyn BuildTool>, color: impl Into<String>) {
        self.tools.push(RegisteredTool {
            tool,
            color: color.into(),
        });
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool.name()).collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kicker(&self) -> &K {
        &self.kicker
    }

    /// Run a full benchmark over `files`
    pub fn run(&mut self, files: &[PathBuf], iterations: usize) -> Result<BenchmarkRun> {
        if iterations == 0 {
            return Err(KickError::validation("iteration count must be at least 1"));
        }
        if self.tools.is_empty() {
            return Err(KickError::validation("no build systems registered"));
        }

        let (eligible, excluded) = self.filter.partition(files.to_vec());
        tracing::info!(
            "{} eligible source file(s), {} excluded",
            eligible.len(),
            excluded.len()
        );
        if eligible.is_empty() {
            tracing::warn!("No eligible source files, builds will not see any change");
        }

        enter(&mut self.phase, Phase::WarmingUp);
        let warmup = match warm_up(&mut self.tools, &self.interrupt) {
            Ok(warmup) => warmup,
            Err(e) => {
                enter(&mut self.phase, Phase::Done);
                return Err(e);
            }
        };

        let mut series: Vec<Series> = self
            .tools
            .iter()
            .map(|t| Series::new(t.tool.name(), t.color.clone()))
            .collect();

        let mut scope = MutationScope::new(&mut self.kicker);
        let result = iterate(
            &mut scope,
            &mut self.tools,
            &eligible,
            iterations,
            &mut series,
            &mut self.phase,
            &self.interrupt,
        );

        enter(&mut self.phase, Phase::Cleanup);
        let report = scope.finish();
        enter(&mut self.phase, Phase::Done);

        match result {
            Err(e) => {
                if !report.is_clean() {
                    tracing::error!(
                        "Run aborted and {} file(s) could not be restored: {:?}",
                        report.unrestored.len(),
                        report.unrestored
                    );
                }
                Err(e)
            }
            Ok(()) if !report.is_clean() => Err(KickError::CleanupIncomplete {
                files: report.unrestored,
            }),
            Ok(()) => Ok(BenchmarkRun {
                iterations,
                mutated_files: eligible.len(),
                excluded_files: excluded.len(),
                warmup,
                series,
            }),
        }
    }
}

fn enter(phase: &mut Phase, next: Phase) {
    tracing::debug!("Benchmark phase: {} -> {}", phase, next);
    *phase = next;
}

fn warm_up(tools: &mut [RegisteredTool], interrupt: &Interrupt) -> Result<Vec<WarmupTime>> {
    tracing::info!("Warming up the build systems...");
    let mut warmup = Vec::with_capacity(tools.len());
    for registered in tools.iter_mut() {
        interrupt.check()?;
        let outcome = registered.tool.run_build()?;
        warmup.push(WarmupTime {
            name: registered.tool.name().to_string(),
            seconds: outcome.seconds(),
        });
    }
    Ok(warmup)
}

fn iterate<K: Kicker>(
    scope: &mut MutationScope<'_, K>,
    tools: &mut [RegisteredTool],
    eligible: &[PathBuf],
    iterations: usize,
    series: &mut [Series],
    phase: &mut Phase,
    interrupt: &Interrupt,
) -> Result<()> {
    for i in 1..=iterations {
        interrupt.check()?;
        enter(phase, Phase::Iterating(i));

        for file in eligible {
            scope.append(file)?;
        }
        tracing::info!(
            "Iteration {}/{}: kicked {} file(s)",
            i,
            iterations,
            scope.dirty_count()
        );

        for (registered, measurements) in tools.iter_mut().zip(series.iter_mut()) {
            interrupt.check()?;
            let outcome = registered.tool.run_build()?;
            measurements.durations.push(outcome.seconds());
        }
    }
    Ok(())
}
