//! Error types for rate limiting

use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimitResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Caller-supplied configuration was invalid: a non-positive
    /// `block_until_ready` timeout, a malformed duration string, or a builder
    /// missing a required field.
    #[error("rate limit configuration error: {0}")]
    Config(String),

    /// `block_until_ready` observed a `reset == 0` response from an otherwise
    /// successful script call. Should be unreachable; indicates a corrupt
    /// store reply.
    #[error("invalid reset")]
    InvalidReset,

    /// A script returned an error reply that was not a `NOSCRIPT` miss.
    #[error("rate limit script error: {0}")]
    Script(String),

    /// Transport-level failure talking to the store.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RateLimitError {
    /// Build a configuration error from any displayable message.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Build a script error from any displayable message.
    pub fn script<S: Into<String>>(msg: S) -> Self {
        Self::Script(msg.into())
    }

    /// True for the synthetic fail-open path's precursor conditions — a
    /// transport error that `Limiter::limit` may choose to mask depending on
    /// `timeout_ms`.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}
