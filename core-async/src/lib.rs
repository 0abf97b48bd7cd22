//! Runtime facade for the merged-entry engine.
//!
//! Every `core-*` crate goes through this crate instead of depending on tokio
//! directly, so the executor choice lives in one place.
//!
//! # Modules
//!
//! - `task`: Task spawning and task sets for fan-out/fan-in
//! - `time`: Sleep, timeout, duration, instant
//! - `sync`: Locks, channels and the cancellation token
//! - `limiter`: Counting limiter whose permits can be abandoned on cancellation
//! - `runtime`: `block_on` helpers used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

// Re-export the async entry-point/test macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

// Lets the attribute macros resolve `core_async::...` inside this crate's own tests.
extern crate self as core_async;

pub mod limiter;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
