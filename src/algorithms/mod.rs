//! Rate limiting algorithms
//!
//! Three interchangeable admission algorithms, each expressed as a capability
//! bundle of three operations executed atomically server-side:
//!
//! - **Fixed window**: simple counter per time bucket.
//! - **Sliding window**: a weighted blend of the current and previous bucket.
//! - **Token bucket**: smooth admission with burst capacity.

mod fixed_window;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindow;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

use crate::connection::RedisConnectionLike;
use crate::duration::parse_ms;
use crate::error::RateLimitResult;
use crate::response::LimitResponse;
use async_trait::async_trait;
use std::time::Duration;

/// The shared capability every admission algorithm implements. The
/// orchestrator only ever calls through this trait — it never knows which
/// concrete algorithm it's holding.
#[async_trait]
pub trait Algorithm: Send + Sync {
    /// Consume `rate` tokens (or `1` if `rate` is `None` or non-positive) for
    /// `key`, returning the resulting decision.
    async fn limit(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
        rate: Option<u64>,
    ) -> RateLimitResult<LimitResponse>;

    /// Read the current remaining count for `key` without mutating state.
    /// Not atomic with a subsequent `limit` call — see the spec's atomicity
    /// boundary note.
    async fn get_remaining(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
    ) -> RateLimitResult<(u64, u64)>;

    /// Delete all state for the identifier behind `pattern`
    /// (`<prefix>:<identifier>:*`).
    async fn reset_tokens(&self, conn: &dyn RedisConnectionLike, pattern: &str) -> RateLimitResult<()>;

    /// The configured limit (tokens per window, or bucket capacity), exposed
    /// so the orchestrator doesn't need algorithm-specific downcasting just
    /// to report it.
    fn limit_value(&self) -> u64;
}

/// `rate` defaults to `1` when omitted or non-positive, per the spec's
/// "limit request" data model.
pub(crate) fn increment_by(rate: Option<u64>) -> u64 {
    match rate {
        Some(r) if r >= 1 => r,
        _ => 1,
    }
}

/// Lets the three algorithm factories below accept a millisecond count, a
/// [`Duration`], or a human duration string (`"10s"`, `"1m"`) interchangeably.
pub trait IntoDurationMs {
    fn into_duration_ms(self) -> RateLimitResult<u64>;
}

impl IntoDurationMs for u64 {
    fn into_duration_ms(self) -> RateLimitResult<u64> {
        Ok(self)
    }
}

impl IntoDurationMs for Duration {
    fn into_duration_ms(self) -> RateLimitResult<u64> {
        Ok(self.as_millis() as u64)
    }
}

impl IntoDurationMs for &str {
    fn into_duration_ms(self) -> RateLimitResult<u64> {
        parse_ms(self)
    }
}

impl IntoDurationMs for String {
    fn into_duration_ms(self) -> RateLimitResult<u64> {
        parse_ms(&self)
    }
}

/// Build a [`FixedWindow`] admitting `tokens` requests per `window`.
pub fn fixed_window(tokens: u64, window: impl IntoDurationMs) -> RateLimitResult<FixedWindow> {
    Ok(FixedWindow::new(tokens, window.into_duration_ms()?))
}

/// Build a [`SlidingWindow`] admitting `tokens` requests per `window`.
pub fn sliding_window(tokens: u64, window: impl IntoDurationMs) -> RateLimitResult<SlidingWindow> {
    Ok(SlidingWindow::new(tokens, window.into_duration_ms()?))
}

/// Build a [`TokenBucket`] refilling by `refill_rate` tokens every `interval`,
/// capped at `max_tokens`.
pub fn token_bucket(
    refill_rate: f64,
    interval: impl IntoDurationMs,
    max_tokens: u64,
) -> RateLimitResult<TokenBucket> {
    Ok(TokenBucket::new(max_tokens, interval.into_duration_ms()?, refill_rate))
}
