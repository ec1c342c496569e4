//! Common test utilities and fixtures for buildkick integration tests
//!
//! This module provides:
//! - `TestRepo` builder for creating throwaway source trees and configs
//! - Custom assertions for CLI output and restored sources

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod assertions;
pub mod test_repo;

pub use assertions::*;
pub use test_repo::TestRepo;
