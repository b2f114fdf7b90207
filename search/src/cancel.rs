//! Cooperative cancellation shared between an orchestrator and its phases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clone-shared flag. Searches poll it at their check cadence.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
