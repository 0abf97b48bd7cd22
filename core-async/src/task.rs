//! Task spawning and execution abstractions.
//!
//! Besides `spawn`, this module exposes [`JoinSet`], the structured
//! fan-out/fan-in primitive: every task spawned into a set is aborted when the
//! set is dropped, so an abandoned parent never leaks children.
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::JoinSet;
//!
//! async fn example() {
//!     let mut set = JoinSet::new();
//!     for i in 0..3 {
//!         set.spawn(async move { i * 2 });
//!     }
//!
//!     let mut total = 0;
//!     while let Some(result) = set.join_next().await {
//!         total += result.unwrap();
//!     }
//!     assert_eq!(total, 6);
//! }
//! ```

use crate::sync::CancellationToken;

pub use tokio::task::{spawn_blocking, yield_now, AbortHandle, JoinError, JoinHandle, JoinSet};

/// Spawns a new asynchronous task on the current runtime.
///
/// The spawned task may run on a different thread.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Drives `future` until it completes or `token` fires, whichever comes first.
///
/// Returns `None` on cancellation; the future is dropped at its current
/// suspension point. An already-cancelled token wins without polling `future`.
pub async fn run_until_cancelled<F>(token: &CancellationToken, future: F) -> Option<F::Output>
where
    F: std::future::Future,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = future => Some(output),
    }
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{sleep, Duration};

    #[core_async::test]
    async fn test_run_until_cancelled_completes() {
        let token = CancellationToken::new();
        assert_eq!(run_until_cancelled(&token, async { 7 }).await, Some(7));
    }

    #[core_async::test]
    async fn test_run_until_cancelled_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(run_until_cancelled(&token, async { 7 }).await, None);
    }

    #[core_async::test]
    async fn test_run_until_cancelled_interrupts_pending_future() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = run_until_cancelled(&token, sleep(Duration::from_secs(5))).await;
        assert!(result.is_none());
    }
}
