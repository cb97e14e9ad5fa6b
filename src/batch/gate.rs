//! Counting admission gate bounding concurrent operations
//!
//! This module provides the concurrency primitive used by the batch
//! executor: at most N operations hold a permit at once, excess callers
//! queue in arrival order. Permits release on drop so every exit path,
//! including panics and early returns, releases exactly once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// FIFO-fair concurrency gate with a fixed permit count.
///
/// Wraps `tokio::sync::Semaphore`, which queues waiters in arrival order
/// and hands a freed permit directly to the oldest waiter.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

/// Permit held for the duration of one gated operation.
///
/// Dropping the permit releases it back to the gate.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Create a gate with the given permit count (clamped to at least 1)
    #[must_use]
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    /// Acquire a permit, waiting FIFO behind earlier callers if none is free
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is never closed; acquire_owned can only fail after
        // close, so the error arm is unreachable in practice.
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => GatePermit { _permit: permit },
            Err(_) => unreachable!("concurrency gate semaphore was closed"),
        }
    }

    /// Number of permits currently free (for tests and diagnostics)
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Configured permit count
    #[must_use]
    pub fn permits(&self) -> usize {
        self.permits
    }
}
