//! External build tool invocation and timing
//!
//! A `BuildInvoker` wraps one build system. Each `build` call constructs the
//! command line `[invocation, flag, value, ..., build_command, target]`, starts
//! the clock immediately before spawning, and stops it as soon as the process
//! is observed to exit. Process-spawn overhead is therefore included in the
//! measurement; anything the caller does before or after is not.
//!
//! While waiting, the invoker polls the child every few milliseconds so it can
//! kill a build that outlives its timeout or an `Interrupt` that was triggered.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{KickError, Result};
use crate::interrupt::Interrupt;

/// Poll interval while waiting on a running build
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Extra command-line arguments placed before the build subcommand
pub type ExtraArgs = Vec<(String, String)>;

/// Static description of a build system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSystem {
    /// Display name used in logs and reports
    pub name: String,
    /// Executable used to invoke the build system
    pub invocation: String,
    /// Working directory for every invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl BuildSystem {
    pub fn new(name: impl Into<String>, invocation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invocation: invocation.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Duration and captured output of one successful build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub duration: Duration,
    /// Captured stdout followed by stderr. The two streams are read from
    /// separate pipes, so lines are not interleaved in emission order.
    pub output: String,
}

impl BuildOutcome {
    /// Elapsed wall-clock time in seconds
    pub fn seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

/// Runs builds for one build system, one process at a time
#[derive(Debug, Clone)]
pub struct BuildInvoker {
    system: BuildSystem,
    timeout: Option<Duration>,
    interrupt: Interrupt,
}

impl BuildInvoker {
    pub fn new(system: BuildSystem) -> Self {
        Self {
            system,
            timeout: None,
            interrupt: Interrupt::new(),
        }
    }

    /// Bound every build by `timeout`; the process is killed when it expires
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Kill the running build and fail with `Interrupted` once `interrupt` fires
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn system(&self) -> &BuildSystem {
        &self.system
    }

    pub fn name(&self) -> &str {
        &self.system.name
    }

    /// Full argv for a build
    pub fn command_line(
        &self,
        command: &str,
        target: Option<&str>,
        extra_args: &[(String, String)],
    ) -> Vec<String> {
        let mut argv = Vec::with_capacity(3 + extra_args.len() * 2);
        argv.push(self.system.invocation.clone());
        for (flag, value) in extra_args {
            argv.push(flag.clone());
            argv.push(value.clone());
        }
        argv.push(command.to_string());
        if let Some(target) = target {
            argv.push(target.to_string());
        }
        argv
    }

    /// Run one build and return its wall-clock duration.
    ///
    /// A non-zero exit is `BuildFailed` carrying the captured output. It is
    /// never retried.
    pub fn build(
        &self,
        command: &str,
        target: Option<&str>,
        extra_args: &[(String, String)],
    ) -> Result<BuildOutcome> {
        let argv = self.command_line(command, target, extra_args);
        tracing::info!("Building with {}...", self.system.name);
        tracing::debug!("{} command: {:?}", self.system.name, argv);

        let (status, output, duration) = self.execute(&argv)?;
        tracing::debug!("{} output:\n{}", self.system.name, output);

        if !status.success() {
            return Err(KickError::BuildFailed {
                build_system: self.system.name.clone(),
                status: status.to_string(),
                output,
            });
        }

        tracing::info!(
            "{} build time: {:.3} seconds",
            self.system.name,
            duration.as_secs_f64()
        );
        Ok(BuildOutcome { duration, output })
    }

    /// Run `n` builds back to back, returning every outcome in order
    pub fn build_n_times(
        &self,
        command: &str,
        n: usize,
        target: Option<&str>,
        extra_args: &[(String, String)],
    ) -> Result<Vec<BuildOutcome>> {
        let mut outcomes = Vec::with_capacity(n);
        for i in 0..n {
            tracing::info!("{} build {} of {}", self.system.name, i + 1, n);
            outcomes.push(self.build(command, target, extra_args)?);
        }
        Ok(outcomes)
    }

    /// Bind a fixed command/target/args so the invoker can act as a `BuildTool`
    pub fn bind(self, request: BuildRequest) -> BoundBuild {
        BoundBuild {
            invoker: self,
            request,
        }
    }

    fn execute(&self, argv: &[String]) -> Result<(ExitStatus, String, Duration)> {
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        if let Some(ref dir) = self.system.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| KickError::IoFailure {
            path: PathBuf::from(&argv[0]),
            message: format!("failed to launch {}: {}", self.system.name, e),
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_for_exit(&mut child, start, self.timeout, &self.interrupt) {
            Ok(WaitResult::Exited(status)) => status,
            // early returns detach the readers: grandchildren may still hold the pipes
            Ok(WaitResult::TimedOut(timeout)) => {
                tracing::error!(
                    "{} build exceeded {:.1}s, process killed",
                    self.system.name,
                    timeout.as_secs_f64()
                );
                return Err(KickError::BuildTimedOut {
                    build_system: self.system.name.clone(),
                    timeout_secs: timeout.as_secs_f64(),
                });
            }
            Ok(WaitResult::Interrupted) => {
                tracing::warn!("{} build interrupted, process killed", self.system.name);
                return Err(KickError::Interrupted);
            }
            Err(e) => return Err(self.wait_error(e)),
        };
        let duration = start.elapsed();

        let mut output = join_output(stdout);
        output.push_str(&join_output(stderr));
        Ok((status, output, duration))
    }

    fn wait_error(&self, e: std::io::Error) -> KickError {
        KickError::IoFailure {
            path: PathBuf::from(&self.system.invocation),
            message: format!("failed waiting for {}: {}", self.system.name, e),
        }
    }
}

enum WaitResult {
    Exited(ExitStatus),
    TimedOut(Duration),
    Interrupted,
}

/// Poll `child` until it exits, `timeout` elapses since `start`, or
/// `interrupt` fires. The child is killed and reaped in the last two cases.
fn wait_for_exit(
    child: &mut Child,
    start: Instant,
    timeout: Option<Duration>,
    interrupt: &Interrupt,
) -> std::io::Result<WaitResult> {
    loop {
        if let Some(status) = child.try_wait()? {
            // a terminal Ctrl-C also reaches the child, which may die first
            if !status.success() && interrupt.is_set() {
                return Ok(WaitResult::Interrupted);
            }
            return Ok(WaitResult::Exited(status));
        }
        if interrupt.is_set() {
            kill_and_reap(child)?;
            return Ok(WaitResult::Interrupted);
        }

        let mut pause = WAIT_POLL_INTERVAL;
        if let Some(timeout) = timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                kill_and_reap(child)?;
                return Ok(WaitResult::TimedOut(timeout));
            }
            pause = pause.min(timeout - elapsed);
        }
        thread::sleep(pause);
    }
}

fn kill_and_reap(child: &mut Child) -> std::io::Result<()> {
    child.kill()?;
    child.wait()?;
    Ok(())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Fixed build subcommand, target and extra arguments for one build system
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub command: String,
    pub target: Option<String>,
    pub args: ExtraArgs,
}

impl BuildRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            target: None,
            args: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_arg(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((flag.into(), value.into()));
        self
    }
}

/// Anything the orchestrator can build and time
pub trait BuildTool {
    /// Display name of the build system
    fn name(&self) -> &str;

    /// Run one build to completion
    fn run_build(&mut self) -> Result<BuildOutcome>;
}

/// A `BuildInvoker` with its request bound
#[derive(Debug, Clone)]
pub struct BoundBuild {
    invoker: BuildInvoker,
    request: BuildRequest,
}

impl BoundBuild {
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.invoker = self.invoker.with_interrupt(interrupt);
        self
    }

    pub fn invoker(&self) -> &BuildInvoker {
        &self.invoker
    }

    pub fn request(&self) -> &BuildRequest {
        &self.request
    }

    pub fn command_line(&self) -> Vec<String> {
        self.invoker.command_line(
            &self.request.command,
            self.request.target.as_deref(),
            &self.request.args,
        )
    }
}

impl BuildTool for BoundBuild {
    fn name(&self) -> &str {
        self.invoker.name()
    }

    fn run_build(&mut self) -> Result<BuildOutcome> {
        self.invoker.build(
            &self.request.command,
            self.request.target.as_deref(),
            &self.request.args,
        )
    }
}
