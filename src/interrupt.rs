//! Ctrl-C / SIGTERM handling
//!
//! A received signal only sets a shared flag. The orchestrator checks it
//! between steps and the invoker checks it while waiting on a build, killing
//! the child when set. The resulting `Interrupted` error unwinds through the
//! mutation scope like any other failure, so kicked files are reverted before
//! the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::signal::{SIGINT, SIGTERM};

use crate::error::{KickError, Result};

/// Shared "stop requested" flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// A flag no signal is wired to; `trigger` is the only way to set it
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT and SIGTERM to a new flag instead of terminating the process
    pub fn install() -> Result<Self> {
        let interrupt = Self::new();
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&interrupt.flag)).map_err(|e| {
                KickError::IoFailure {
                    path: "<signal handler>".into(),
                    message: format!("failed to register handler for signal {}: {}", signal, e),
                }
            })?;
        }
        tracing::debug!("Installed SIGINT/SIGTERM handler");
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Interrupted)` once a stop was requested
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            return Err(KickError::Interrupted);
        }
        Ok(())
    }
}
