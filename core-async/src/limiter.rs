//! Counting limiter for bounded fan-out.
//!
//! A [`ConcurrencyLimiter`] hands out at most `capacity` permits at a time.
//! Unlike a bare semaphore, [`ConcurrencyLimiter::acquire`] also watches a
//! [`CancellationToken`]: a task still queued for a permit gives up as soon as
//! the token fires instead of waiting for a slot it will never use.
//!
//! ```rust
//! use core_async::limiter::ConcurrencyLimiter;
//! use core_async::sync::CancellationToken;
//!
//! async fn example() {
//!     let limiter = ConcurrencyLimiter::new(2);
//!     let token = CancellationToken::new();
//!
//!     let permit = limiter.acquire(&token).await.unwrap();
//!     assert_eq!(limiter.in_flight(), 1);
//!     drop(permit);
//!     assert_eq!(limiter.in_flight(), 0);
//! }
//! ```

use crate::sync::{CancellationToken, OwnedSemaphorePermit, Semaphore};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    #[error("permit acquisition cancelled")]
    Cancelled,

    #[error("limiter closed")]
    Closed,
}

/// Shared counting limiter. Cloning shares the same permit pool.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Permit held while a limited operation is in flight. Released on drop.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Creates a limiter with `capacity` permits. A capacity of zero is raised
    /// to one so that acquisition can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Maximum number of concurrent permits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Waits for a permit, or returns [`AcquireError::Cancelled`] as soon as
    /// `token` is cancelled. An already-cancelled token never acquires.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<LimiterPermit, AcquireError> {
        if token.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::trace!(in_flight = self.in_flight(), "Permit wait cancelled");
                Err(AcquireError::Cancelled)
            }
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit
                .map(|permit| LimiterPermit { _permit: permit })
                .map_err(|_| AcquireError::Closed),
        }
    }

    /// Closes the limiter; pending and future acquisitions fail with
    /// [`AcquireError::Closed`].
    pub fn close(&self) {
        self.semaphore.close();
    }
}
