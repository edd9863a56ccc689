//! Cooperative cancellation for long derivations.
//!
//! String sizes grow multiplicatively with the iteration count, so a
//! misconfigured run can take arbitrarily long. The grammar checks the token
//! between derivation steps and the interpreter checks it at every run
//! boundary.

use crate::error::{Error, Result, Stage};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A clonable flag shared between the caller and a running pipeline.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns [`Error::Cancelled`] for `stage` if cancellation was requested.
    pub fn check(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled { stage })
        } else {
            Ok(())
        }
    }
}
