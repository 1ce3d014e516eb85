// src/limiter/tests/rate_limiter_tests.rs

use std::sync::Arc;
use std::time::Duration;

use crate::clock::ManualClock;
use crate::config::RateLimitConfig;
use crate::limiter::RateLimiter;
use crate::storage::MemoryWindowStore;
use crate::test_utils::manual_limiter;

fn config(global: u64, per_caller: Option<u64>, window: Duration) -> RateLimitConfig {
    RateLimitConfig {
        window,
        max_global_requests: global,
        max_requests_per_caller: per_caller,
    }
}

#[tokio::test]
async fn test_global_limit_then_window_elapses() {
    let window = Duration::from_secs(60);
    let (limiter, clock) = manual_limiter(config(3, None, window));

    for i in 0..3 {
        assert!(
            limiter.is_allowed(Some("u1")).await.unwrap(),
            "Request {} should be allowed",
            i
        );
        limiter.record_request(Some("u1")).await.unwrap();
    }

    assert!(!limiter.is_allowed(Some("u1")).await.unwrap());

    clock.advance(window);
    assert!(limiter.is_allowed(Some("u1")).await.unwrap());
}

#[tokio::test]
async fn test_per_caller_cap_is_independent() {
    let (limiter, _clock) = manual_limiter(config(10, Some(2), Duration::from_secs(60)));

    for _ in 0..2 {
        let status = limiter.check_and_record(Some("x")).await.unwrap();
        assert!(status.allowed);
    }

    let denied = limiter.check_and_record(Some("x")).await.unwrap();
    assert!(!denied.allowed, "Caller x should be over its cap");

    let other = limiter.check_and_record(Some("y")).await.unwrap();
    assert!(other.allowed, "Caller y must not be affected by x");
    assert_eq!(other.stats.global_usage, 3);
}

#[tokio::test]
async fn test_global_limit_binds_across_callers() {
    let (limiter, _clock) = manual_limiter(config(2, Some(5), Duration::from_secs(60)));

    assert!(limiter.check_and_record(Some("a")).await.unwrap().allowed);
    assert!(limiter.check_and_record(Some("b")).await.unwrap().allowed);

    let status = limiter.check_and_record(Some("c")).await.unwrap();
    assert!(!status.allowed);
    assert_eq!(status.stats.caller_usage, Some(0));
    assert_eq!(status.stats.global_remaining, 0);
}

#[tokio::test]
async fn test_anonymous_requests_only_count_globally() {
    let (limiter, _clock) = manual_limiter(config(2, Some(1), Duration::from_secs(60)));

    assert!(limiter.check_and_record(None).await.unwrap().allowed);
    // Blank ids are anonymous too
    assert!(limiter.check_and_record(Some("  ")).await.unwrap().allowed);
    assert!(!limiter.check_and_record(None).await.unwrap().allowed);

    let stats = limiter.stats(None).await.unwrap();
    assert_eq!(stats.caller_usage, None);
    assert_eq!(stats.caller_limit, None);
}

#[tokio::test]
async fn test_reset_time_counts_down_to_zero() {
    let window = Duration::from_millis(10_000);
    let (limiter, clock) = manual_limiter(config(1, None, window));

    assert_eq!(limiter.reset_time_ms(None).await.unwrap(), 0);
    limiter.check_and_record(None).await.unwrap();

    let mut previous = limiter.reset_time_ms(None).await.unwrap();
    assert_eq!(previous, 10_000);

    for _ in 0..9 {
        clock.advance(Duration::from_millis(1_000));
        let current = limiter.reset_time_ms(None).await.unwrap();
        assert!(current <= previous, "reset time must not increase");
        previous = current;
    }
    assert_eq!(previous, 1_000);

    clock.advance(Duration::from_millis(1_000));
    assert_eq!(limiter.reset_time_ms(None).await.unwrap(), 0);

    clock.advance(Duration::from_millis(5_000));
    assert_eq!(limiter.reset_time_ms(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_reset_time_uses_earlier_blocking_timestamp() {
    let window = Duration::from_millis(1_000);
    let (limiter, clock) = manual_limiter(config(2, Some(1), window));

    // Caller "late" records at t=300, global saturates at t=300
    limiter.check_and_record(Some("early")).await.unwrap();
    clock.advance(Duration::from_millis(300));
    limiter.check_and_record(Some("late")).await.unwrap();

    // "late" is blocked by both limits; the global window started first
    let reset = limiter.reset_time_ms(Some("late")).await.unwrap();
    assert_eq!(reset, 700);

    // Only the caller limit binds for a fresh id once global frees up
    clock.advance(Duration::from_millis(700));
    assert_eq!(limiter.reset_time_ms(Some("late")).await.unwrap(), 300);
    assert_eq!(limiter.reset_time_ms(Some("fresh")).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stats_is_a_pure_observer() {
    let (limiter, _clock) = manual_limiter(config(2, Some(2), Duration::from_secs(60)));
    limiter.check_and_record(Some("u")).await.unwrap();

    for _ in 0..20 {
        let stats = limiter.stats(Some("u")).await.unwrap();
        assert_eq!(stats.global_usage, 1);
        assert_eq!(stats.global_remaining, 1);
        assert_eq!(stats.caller_usage, Some(1));
        assert_eq!(stats.caller_limit, Some(2));
        assert_eq!(stats.caller_remaining, Some(1));
        assert_eq!(stats.reset_time_ms, 0);
    }

    assert!(limiter.is_allowed(Some("u")).await.unwrap());
}

#[tokio::test]
async fn test_is_allowed_does_not_record() {
    let (limiter, _clock) = manual_limiter(config(1, None, Duration::from_secs(60)));

    for _ in 0..10 {
        assert!(limiter.is_allowed(Some("u")).await.unwrap());
    }
    assert_eq!(limiter.stats(Some("u")).await.unwrap().global_usage, 0);
}

#[tokio::test]
async fn test_reset_clears_caller_window() {
    let (limiter, _clock) = manual_limiter(config(10, Some(1), Duration::from_secs(60)));

    limiter.check_and_record(Some("u")).await.unwrap();
    assert!(!limiter.is_allowed(Some("u")).await.unwrap());

    limiter.reset(Some("u")).await.unwrap();
    assert!(limiter.is_allowed(Some("u")).await.unwrap());
    // Global usage is untouched
    assert_eq!(limiter.stats(None).await.unwrap().global_usage, 1);
}

#[tokio::test]
async fn test_idle_callers_are_dropped_from_store() {
    let window = Duration::from_millis(100);
    let store = Arc::new(MemoryWindowStore::new());
    let clock = ManualClock::new(0);
    let limiter = RateLimiter::new(
        "default",
        config(100, Some(5), window),
        Arc::clone(&store),
        Arc::new(clock.clone()),
    )
    .unwrap();

    for caller in ["a", "b", "c"] {
        limiter.check_and_record(Some(caller)).await.unwrap();
    }
    // global + three callers
    assert_eq!(store.scope_count().unwrap(), 4);

    clock.advance(Duration::from_millis(200));
    for caller in ["a", "b", "c"] {
        limiter.stats(Some(caller)).await.unwrap();
    }
    assert_eq!(store.scope_count().unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_admission_never_exceeds_limit() {
    let (limiter, _clock) = manual_limiter(config(25, None, Duration::from_secs(60)));
    let limiter = Arc::new(limiter);

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                let caller = format!("caller-{}", i % 7);
                limiter.check_and_record(Some(&caller)).await.unwrap().allowed
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let admitted = results
        .into_iter()
        .filter(|r| matches!(r, Ok(true)))
        .count();

    assert_eq!(admitted, 25);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let result = RateLimiter::new(
        "default",
        config(0, None, Duration::from_secs(1)),
        Arc::new(MemoryWindowStore::new()),
        Arc::new(ManualClock::new(0)),
    );
    assert!(result.is_err());
}
