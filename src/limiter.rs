//! The rate limiter orchestrator: applies the key prefix, invokes the
//! configured algorithm, races it against a fail-open watchdog, and
//! implements the block-until-ready wait loop.

use crate::algorithms::Algorithm;
use crate::connection::{self, ConnectionStatus, RedisConnectionLike};
use crate::error::{RateLimitError, RateLimitResult};
use crate::response::LimitResponse;
use redis::aio::ConnectionManager;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

const DEFAULT_PREFIX: &str = "@hummn/ratelimit";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Per-call options for [`Limiter::limit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitOptions {
    /// Tokens to consume for this call. Defaults to `1` when absent or
    /// non-positive.
    pub rate: Option<u64>,
}

/// Holds the store collaborator alongside informational connection status.
struct Context {
    store: Box<dyn RedisConnectionLike>,
}

/// A configured rate limiter bound to one algorithm and one store.
pub struct Limiter {
    algorithm: Box<dyn Algorithm>,
    context: Context,
    prefix: String,
    timeout_ms: u64,
}

impl Limiter {
    /// Start building a limiter with named options.
    pub fn builder() -> LimiterBuilder {
        LimiterBuilder::new()
    }

    fn full_key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn full_pattern(&self, id: &str) -> String {
        format!("{}:{}:*", self.prefix, id)
    }

    /// Consume tokens for `id`. Under a positive `timeout_ms`, races the real
    /// store round-trip against a watchdog that resolves fail-open — the
    /// request is admitted with [`crate::response::Reason::Timeout`] if the
    /// store hasn't answered in time.
    pub async fn limit(&self, id: &str, opts: LimitOptions) -> RateLimitResult<LimitResponse> {
        let key = self.full_key(id);
        let call = self.algorithm.limit(self.context.store.as_ref(), &key, opts.rate);

        if self.timeout_ms == 0 {
            return call.await;
        }

        tokio::select! {
            result = call => result,
            _ = sleep(Duration::from_millis(self.timeout_ms)) => {
                warn!(id = %id, timeout_ms = self.timeout_ms, "rate limit watchdog fired, admitting fail-open");
                Ok(LimitResponse::timeout())
            }
        }
    }

    /// Read the current remaining count for `id` without mutating state. Not
    /// raced against the watchdog.
    pub async fn get_remaining(&self, id: &str) -> RateLimitResult<(u64, u64)> {
        let key = self.full_key(id);
        self.algorithm.get_remaining(self.context.store.as_ref(), &key).await
    }

    /// Delete all rate limit state for `id`.
    pub async fn reset_used_tokens(&self, id: &str) -> RateLimitResult<()> {
        let pattern = self.full_pattern(id);
        debug!(id = %id, "resetting used tokens");
        self.algorithm.reset_tokens(self.context.store.as_ref(), &pattern).await
    }

    /// Retry `limit` until it succeeds or `max_wait_ms` elapses, sleeping
    /// until the predicted reset moment between attempts rather than
    /// busy-waiting. `max_wait_ms` must be positive.
    pub async fn block_until_ready(&self, id: &str, max_wait_ms: u64) -> RateLimitResult<LimitResponse> {
        if max_wait_ms == 0 {
            return Err(RateLimitError::config("timeout must be positive"));
        }

        let deadline = now_ms() + max_wait_ms;

        loop {
            let res = self.limit(id, LimitOptions::default()).await?;
            if res.success {
                return Ok(res);
            }
            if res.reset == 0 {
                return Err(RateLimitError::InvalidReset);
            }

            let now = now_ms();
            if now >= deadline {
                return Ok(res);
            }

            let wait_until = res.reset.min(deadline);
            let wait_ms = wait_until.saturating_sub(now);
            sleep(Duration::from_millis(wait_ms)).await;

            if now_ms() > deadline {
                return Ok(res);
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// Named-option constructor for [`Limiter`].
pub struct LimiterBuilder {
    algorithm: Option<Box<dyn Algorithm>>,
    store: Option<Box<dyn RedisConnectionLike>>,
    redis_url: Option<String>,
    prefix: String,
    timeout_ms: u64,
}

impl LimiterBuilder {
    fn new() -> Self {
        Self {
            algorithm: None,
            store: None,
            redis_url: None,
            prefix: DEFAULT_PREFIX.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Set the admission algorithm. Required.
    pub fn algorithm(mut self, algorithm: impl Algorithm + 'static) -> Self {
        self.algorithm = Some(Box::new(algorithm));
        self
    }

    /// Use a pre-built store client. Mutually exclusive with `redis_url`,
    /// last call wins.
    pub fn redis_client(mut self, client: ConnectionManager) -> Self {
        self.store = Some(Box::new(client));
        self.redis_url = None;
        self
    }

    /// Connect to `url` on `build()`. Mutually exclusive with
    /// `redis_client`, last call wins.
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self.store = None;
        self
    }

    /// Key prefix, defaults to `"@hummn/ratelimit"`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Watchdog timeout. `0` disables the race entirely.
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Watchdog timeout expressed as a [`Duration`].
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Construct the limiter, connecting to `redis_url` if no store was set
    /// directly.
    pub async fn build(self) -> RateLimitResult<Limiter> {
        let algorithm = self
            .algorithm
            .ok_or_else(|| RateLimitError::config("an algorithm is required"))?;

        let store: Box<dyn RedisConnectionLike> = if let Some(store) = self.store {
            store
        } else if let Some(url) = self.redis_url {
            Box::new(connection::connect(&url).await?)
        } else {
            return Err(RateLimitError::config("a redis client or url is required"));
        };

        Ok(Limiter {
            algorithm,
            context: Context { store },
            prefix: self.prefix,
            timeout_ms: self.timeout_ms,
        })
    }
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("prefix", &self.prefix)
            .field("timeout_ms", &self.timeout_ms)
            .field("status", &self.context.store.status())
            .finish()
    }
}
