//! Token bucket: smooth admission with burst capacity. A bucket starts full
//! at `max_tokens` and refills by `refill_rate` tokens every `interval_ms`,
//! tracked server-side as a `{refilled_at, tokens}` hash.

use super::{increment_by, Algorithm};
use crate::connection::RedisConnectionLike;
use crate::error::{RateLimitError, RateLimitResult};
use crate::executor::exec;
use crate::reset;
use crate::response::LimitResponse;
use crate::scripts::{token_bucket_get_remaining, token_bucket_limit};
use async_trait::async_trait;
use redis::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{trace, warn};

pub struct TokenBucket {
    max_tokens: u64,
    interval_ms: u64,
    refill_rate: f64,
}

impl TokenBucket {
    /// `refill_rate` tokens are added to the bucket every `interval_ms`, up
    /// to `max_tokens`.
    pub fn new(max_tokens: u64, interval_ms: u64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            interval_ms,
            refill_rate,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

#[async_trait]
impl Algorithm for TokenBucket {
    async fn limit(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
        rate: Option<u64>,
    ) -> RateLimitResult<LimitResponse> {
        let now = now_ms();
        let increment = increment_by(rate);

        trace!(key = %key, increment, "token bucket limit check");

        let reply = exec(
            conn,
            token_bucket_limit(),
            &[key.to_string()],
            &[
                self.max_tokens.to_string(),
                self.interval_ms.to_string(),
                format!("{}", self.refill_rate),
                now.to_string(),
                increment.to_string(),
            ],
        )
        .await?;

        let (success, limit, remaining, delta_ms) = parse_limit_reply(reply)?;
        let reset_at = now.saturating_add(delta_ms);

        if success {
            Ok(LimitResponse::new(true, limit, remaining, reset_at))
        } else {
            warn!(key = %key, "token bucket: request denied");
            Ok(LimitResponse::new(false, limit, remaining, reset_at))
        }
    }

    async fn get_remaining(
        &self,
        conn: &dyn RedisConnectionLike,
        key: &str,
    ) -> RateLimitResult<(u64, u64)> {
        let now = now_ms();

        let reply = exec(conn, token_bucket_get_remaining(), &[key.to_string()], &[]).await?;
        let (tokens, refilled_at) = parse_remaining_reply(reply)?;

        if tokens < 0 {
            return Ok((self.max_tokens, now.saturating_add(self.interval_ms)));
        }

        let reset_at = (refilled_at.max(0) as u64).saturating_add(self.interval_ms);
        Ok((tokens as u64, reset_at))
    }

    async fn reset_tokens(&self, conn: &dyn RedisConnectionLike, pattern: &str) -> RateLimitResult<()> {
        reset::reset(conn, pattern).await
    }

    fn limit_value(&self) -> u64 {
        self.max_tokens
    }
}

/// Parses the four-element `{success, limit, remaining, delta_ms}` reply.
fn parse_limit_reply(value: Value) -> RateLimitResult<(bool, u64, u64, u64)> {
    match value {
        Value::Array(items) if items.len() == 4 => {
            let success = as_i64(&items[0])? == 1;
            let limit = as_i64(&items[1])?.max(0) as u64;
            let remaining = as_i64(&items[2])?.max(0) as u64;
            let delta_ms = as_i64(&items[3])?.max(0) as u64;
            Ok((success, limit, remaining, delta_ms))
        }
        other => Err(RateLimitError::script(format!(
            "token bucket limit script returned unexpected shape: {other:?}"
        ))),
    }
}

/// Parses the `{tokens, refilled_at}` reply, where both elements are `-1`
/// when no bucket has been created for the key yet.
fn parse_remaining_reply(value: Value) -> RateLimitResult<(i64, i64)> {
    match value {
        Value::Array(items) if items.len() == 2 => {
            let tokens = as_i64(&items[0])?;
            let refilled_at = as_i64(&items[1])?;
            Ok((tokens, refilled_at))
        }
        other => Err(RateLimitError::script(format!(
            "token bucket get_remaining script returned unexpected shape: {other:?}"
        ))),
    }
}

fn as_i64(value: &Value) -> RateLimitResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(RateLimitError::script(format!(
            "token bucket script returned a non-integer element: {other:?}"
        ))),
    }
}
