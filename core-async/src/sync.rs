//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the cooperative
//! [`CancellationToken`] from `tokio-util` that callers hand to long-running
//! operations such as a merged-entry sync.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, RwLock};
//!
//! async fn example() {
//!     let lock = RwLock::new(vec![1, 2, 3]);
//!     assert_eq!(lock.read().await.len(), 3);
//!
//!     let token = CancellationToken::new();
//!     let child = token.child_token();
//!     token.cancel();
//!     assert!(child.is_cancelled());
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OwnedSemaphorePermit, RwLock,
    RwLockReadGuard, RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
