//! Fixed window: a plain counter per `floor(now_ms / window_ms)` bucket.
//!
//! A client could make `tokens` requests at the end of window N and `tokens`
//! more at the start of window N+1, doubling the effective rate across the
//! boundary. [`super::SlidingWindow`] corrects exactly that.

use super::{increment_by, Algorithm};
use crate::connection::RedisConnectionLike;
use crate::error::{RateLimitError, RateLimitResult};
use crate::executor::exec;
use crate::reset;
use crate::response::LimitResponse;
use crate::scripts::{fixed_window_get_remaining, fixed_window_limit};
use async_trait::async_trait;
use redis::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

/// Simple rate limiting with fixed time windows.
pub struct FixedWindow {
    tokens: u64,
    window_ms: u64,
}

impl FixedWindow {
    pub fn new(tokens: u64, window_ms: u64) -> Self {
        Self { tokens, window_ms }
    }

    fn bucket(&self, now_ms: u64) -> u64 {
        now_ms / self.window_ms
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

#[async_trait]
impl Algorithm for FixedWindow {
    async fn limit(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
        rate: Option<u64>,
    ) -> RateLimitResult<LimitResponse> {
        let now = now_ms();
        let bucket = self.bucket(now);
        let full_key = format!("{key}:{bucket}");
        let increment = increment_by(rate);

        trace!(key = %key, bucket, increment, "fixed window limit check");

        let reply = exec(
            conn,
            fixed_window_limit(),
            &[full_key],
            &[self.window_ms.to_string(), increment.to_string()],
        )
        .await?;

        let count = as_u64(reply)?;
        let reset_at = (bucket + 1) * self.window_ms;

        if count <= self.tokens {
            let remaining = self.tokens - count;
            Ok(LimitResponse::new(true, self.tokens, remaining, reset_at))
        } else {
            warn!(key = %key, count, tokens = self.tokens, "fixed window: request denied");
            Ok(LimitResponse::new(false, self.tokens, 0, reset_at))
        }
    }

    async fn get_remaining(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
    ) -> RateLimitResult<(u64, u64)> {
        let now = now_ms();
        let bucket = self.bucket(now);
        let full_key = format!("{key}:{bucket}");

        let reply = exec(conn, fixed_window_get_remaining(), &[full_key], &[]).await?;
        let count = as_u64(reply)?;

        let remaining = self.tokens.saturating_sub(count);
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

fn as_u64(value: Value) -> RateLimitResult<u64> {
    match value {
        Value::Int(n) if n >= 0 => Ok(n as u64),
        Value::Int(_) => Err(RateLimitError::script("fixed window script returned a negative count")),
        other => Err(RateLimitError::script(format!(
            "fixed window script returned unexpected reply: {other:?}"
        ))),
    }
}
