//! Time-related abstractions.
//!
//! ```rust
//! use core_async::time::{sleep, timeout, Duration};
//!
//! async fn example() {
//!     let result = timeout(Duration::from_millis(100), async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     })
//!     .await;
//!     assert_eq!(result.unwrap(), 42);
//! }
//! ```

pub use tokio::time::{error::Elapsed, interval, sleep, sleep_until, timeout, Interval, Sleep, Timeout};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
