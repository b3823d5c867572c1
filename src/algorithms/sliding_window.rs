//! Sliding window: a weighted blend of the current and previous fixed
//! window, approximating a true sliding log without storing per-request
//! timestamps.
//!
//! Each bucket holds a single counter. A request's effective count is
//! `current + (1 - p) * previous`, where `p` is how far into the current
//! bucket `now` falls. This corrects the fixed window's boundary burst while
//! staying O(1) in storage per key.

use super::{increment_by, Algorithm};
use crate::connection::RedisConnectionLike;
use crate::error::{RateLimitError, RateLimitResult};
use crate::executor::exec;
use crate::reset;
use crate::response::LimitResponse;
use crate::scripts::{sliding_window_get_remaining, sliding_window_limit};
use async_trait::async_trait;
use redis::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

pub struct SlidingWindow {
    tokens: u64,
    window_ms: u64,
}

impl SlidingWindow {
    pub fn new(tokens: u64, window_ms: u64) -> Self {
        Self { tokens, window_ms }
    }

    fn bucket(&self, now_ms: u64) -> u64 {
        now_ms / self.window_ms
    }

    fn keys(&self, key: &str, bucket: u64) -> [String; 2] {
        [format!("{key}:{bucket}"), format!("{key}:{}", bucket.wrapping_sub(1))]
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

#[async_trait]
impl Algorithm for SlidingWindow {
    async fn limit(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
        rate: Option<u64>,
    ) -> RateLimitResult<LimitResponse> {
        let now = now_ms();
        let bucket = self.bucket(now);
        let [current_key, previous_key] = self.keys(key, bucket);
        let increment = increment_by(rate);
        let reset_at = (bucket + 1) * self.window_ms;

        trace!(key = %key, bucket, increment, "sliding window limit check");

        let reply = exec(
            conn,
            sliding_window_limit(),
            &[current_key, previous_key],
            &[
                self.tokens.to_string(),
                now.to_string(),
                self.window_ms.to_string(),
                increment.to_string(),
            ],
        )
        .await?;

        match as_i64(reply)? {
            remaining if remaining < 0 => {
                warn!(key = %key, tokens = self.tokens, "sliding window: request denied");
                Ok(LimitResponse::new(false, self.tokens, 0, reset_at))
            }
            remaining => Ok(LimitResponse::new(true, self.tokens, remaining as u64, reset_at)),
        }
    }

    async fn get_remaining(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
    ) -> RateLimitResult<(u64, u64)> {
        let now = now_ms();
        let bucket = self.bucket(now);
        let [current_key, previous_key] = self.keys(key, bucket);

        let reply = exec(
            conn,
            sliding_window_get_remaining(),
            &[current_key, previous_key],
            &[self.tokens.to_string(), now.to_string(), self.window_ms.to_string()],
        )
        .await?;

        let remaining = as_i64(reply)?.max(0) as u64;
        let reset_at = (bucket + 1) * self.window_ms;
        Ok((remaining, reset_at))
    }

    async fn reset_tokens(&self, conn: &dyn RedisConnectionLike, pattern: &str) -> RateLimitResult<()> {
        reset::reset(conn, pattern).await
    }

    fn limit_value(&self) -> u64 {
        self.tokens
    }
}

fn as_i64(value: Value) -> RateLimitResult<i64> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(RateLimitError::script(format!(
            "sliding window script returned unexpected reply: {other:?}"
        ))),
    }
}
