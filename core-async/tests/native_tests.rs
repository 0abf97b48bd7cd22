//! Integration tests for core-async.
//!
//! These tests verify the runtime facade and the limiter under real fan-out.

use core_async::limiter::ConcurrencyLimiter;
use core_async::sync::{CancellationToken, Mutex};
use core_async::task::JoinSet;
use core_async::{task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    let result = handle.await.unwrap();
    assert_eq!(result, 42);
}

#[core_async::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn test_mutex_shared_between_tasks() {
    let counter = Arc::new(Mutex::new(0));
    let mut set = JoinSet::new();

    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        set.spawn(async move {
            *counter.lock().await += 1;
        });
    }
    while set.join_next().await.is_some() {}

    assert_eq!(*counter.lock().await, 10);
}

#[core_async::test(multi_thread)]
async fn test_limiter_caps_parallel_tasks() {
    let limiter = ConcurrencyLimiter::new(3);
    let token = CancellationToken::new();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let mut set = JoinSet::new();

    for _ in 0..12 {
        let limiter = limiter.clone();
        let token = token.clone();
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        set.spawn(async move {
            let _permit = limiter.acquire(&token).await.unwrap();
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            time::sleep(time::Duration::from_millis(15)).await;
            current.fetch_sub(1, Ordering::SeqCst);
        });
    }
    while let Some(joined) = set.join_next().await {
        joined.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 2);
}

#[core_async::test]
async fn test_dropping_join_set_aborts_children() {
    let finished = Arc::new(AtomicUsize::new(0));
    {
        let mut set = JoinSet::new();
        for _ in 0..3 {
            let finished = Arc::clone(&finished);
            set.spawn(async move {
                time::sleep(time::Duration::from_millis(200)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        time::sleep(time::Duration::from_millis(5)).await;
    }

    time::sleep(time::Duration::from_millis(300)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}
