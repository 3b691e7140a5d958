//! Request-scoped execution context.
//!
//! Every repository and enumerator call carries a [`RequestContext`]. The
//! context is polled before each storage call and on every scanned row, so a
//! caller that cancels or whose deadline passes aborts an in-flight scan at
//! the next row boundary. There are no background threads: polling is
//! cooperative.

use crate::error::{ChannelStoreError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag plus optional deadline for one request.
///
/// Clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Signals cancellation to every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` if the request should stop.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChannelStoreError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ChannelStoreError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
