//! CLI command integration tests
//!
//! Drive the `buildkick` binary end to end. Build systems are `sh -c` scripts
//! so the suite runs without Bazel, Buck2 or Gradle installed.

#[cfg(unix)]
pub mod files_tests;
#[cfg(unix)]
pub mod run_tests;
