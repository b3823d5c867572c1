//! Integration tests for hummn-ratelimit against a live Redis/Valkey server.
//!
//! Disabled by default since they require a running store; run with
//! `cargo test -- --ignored`.

use hummn_ratelimit::algorithms::{fixed_window, sliding_window, token_bucket};
use hummn_ratelimit::{LimitOptions, Limiter};
use std::time::Duration;

const REDIS_URL: &str = "redis://localhost:6379";

async fn limiter(algorithm: impl hummn_ratelimit::Algorithm + 'static, prefix: &str) -> Limiter {
    Limiter::builder()
        .algorithm(algorithm)
        .redis_url(REDIS_URL)
        .prefix(prefix)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore]
async fn fixed_window_saturation() {
    let limiter = limiter(fixed_window(3, 10_000).unwrap(), "it:fw:saturation").await;

    for expected_remaining in [2u64, 1, 0] {
        let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
        assert!(res.success);
        assert_eq!(res.remaining, expected_remaining);
    }

    let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
    assert!(!res.success);
    assert_eq!(res.remaining, 0);
}

#[tokio::test]
#[ignore]
async fn fixed_window_reset_after_expiry() {
    let limiter = limiter(fixed_window(2, 1_000).unwrap(), "it:fw:expiry").await;

    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
    assert!(!limiter.limit("u", LimitOptions::default()).await.unwrap().success);

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
    assert!(res.success);
    assert_eq!(res.remaining, 1);
}

#[tokio::test]
#[ignore]
async fn token_bucket_burst() {
    let limiter = limiter(token_bucket(1.0, 1_000, 5).unwrap(), "it:tb:burst").await;

    for expected_remaining in [4u64, 3, 2, 1, 0] {
        let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
        assert!(res.success);
        assert_eq!(res.remaining, expected_remaining);
    }

    let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
    assert!(!res.success);
    assert_eq!(res.remaining, 0);
}

#[tokio::test]
#[ignore]
async fn token_bucket_refill() {
    let limiter = limiter(token_bucket(1.0, 1_000, 5).unwrap(), "it:tb:refill").await;

    for _ in 0..5 {
        assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
    }
    assert!(!limiter.limit("u", LimitOptions::default()).await.unwrap().success);

    tokio::time::sleep(Duration::from_millis(1_100)).await;

    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
}

#[tokio::test]
#[ignore]
async fn token_bucket_cap() {
    let limiter = limiter(token_bucket(10.0, 1_000, 5).unwrap(), "it:tb:cap").await;

    limiter.limit("u", LimitOptions::default()).await.unwrap();
    limiter.limit("u", LimitOptions::default()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3_000)).await;

    let (remaining, _reset) = limiter.get_remaining("u").await.unwrap();
    assert!(remaining <= 5);
}

#[tokio::test]
#[ignore]
async fn sliding_window_boundary() {
    let limiter = limiter(sliding_window(3, 2_000).unwrap(), "it:sw:boundary").await;

    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);

    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert!(limiter.limit("u", LimitOptions::default()).await.unwrap().success);
}

#[tokio::test]
#[ignore]
async fn custom_rate() {
    let limiter = limiter(fixed_window(10, 10_000).unwrap(), "it:fw:custom-rate").await;

    let res = limiter.limit("u", LimitOptions { rate: Some(5) }).await.unwrap();
    assert_eq!(res.remaining, 5);

    let res = limiter.limit("u", LimitOptions { rate: Some(3) }).await.unwrap();
    assert_eq!(res.remaining, 2);

    let res = limiter.limit("u", LimitOptions { rate: Some(3) }).await.unwrap();
    assert!(!res.success);
}

#[tokio::test]
#[ignore]
async fn timeout_fail_open_against_an_unreachable_store() {
    let limiter = Limiter::builder()
        .algorithm(fixed_window(10, 10_000).unwrap())
        .redis_url("redis://10.255.255.1:6379")
        .prefix("it:fw:unreachable")
        .timeout_ms(100)
        .build()
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
    assert!(res.success);
    assert!(res.is_timeout());
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
#[ignore]
async fn block_until_ready_waits_for_capacity() {
    let limiter = limiter(fixed_window(2, 2_000).unwrap(), "it:fw:block").await;

    limiter.limit("u", LimitOptions::default()).await.unwrap();
    limiter.limit("u", LimitOptions::default()).await.unwrap();

    let started = std::time::Instant::now();
    let res = limiter.block_until_ready("u", 3_000).await.unwrap();
    assert!(res.success);
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
#[ignore]
async fn negative_block_timeout_fails_synchronously() {
    let limiter = limiter(fixed_window(2, 2_000).unwrap(), "it:fw:negative-timeout").await;
    let err = limiter.block_until_ready("u", 0).await.unwrap_err();
    assert!(err.to_string().contains("timeout must be positive"));
}

#[tokio::test]
#[ignore]
async fn reset_effectiveness() {
    let limiter = limiter(fixed_window(3, 10_000).unwrap(), "it:fw:reset").await;

    limiter.limit("u", LimitOptions::default()).await.unwrap();
    limiter.limit("u", LimitOptions::default()).await.unwrap();

    limiter.reset_used_tokens("u").await.unwrap();

    let res = limiter.limit("u", LimitOptions::default()).await.unwrap();
    assert!(res.success);
    assert_eq!(res.remaining, 2);
}
