//! The client-visible shape of a rate limit decision.

use futures::future::{ready, Ready};
use serde::Serialize;

/// Why a response took the shape it did, when that shape wasn't a plain
/// store-sourced decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Reason {
    /// The watchdog fired before the store replied; the request was
    /// admitted fail-open.
    Timeout,
}

/// A future that is always immediately ready. `pending` is kept on
/// [`LimitResponse`] purely for forward-compatibility with variants that
/// return a post-decision task (analytics, multi-region reconciliation); this
/// core always resolves it in place.
pub type Pending = Ready<()>;

/// Result of a rate limit check.
#[derive(Debug, Clone, Serialize)]
pub struct LimitResponse {
    /// Whether the request was admitted.
    pub success: bool,
    /// The configured limit (tokens per window, or bucket capacity).
    pub limit: u64,
    /// Tokens remaining after this decision. Always `0 <= remaining <= limit`.
    pub remaining: u64,
    /// Wall-clock millisecond timestamp at or after which capacity is next
    /// available. `0` only for the synthetic timeout response.
    pub reset: u64,
    /// Always resolved by the time the response is constructed.
    #[serde(skip)]
    pub pending: Pending,
    /// Set when this response did not come from a normal store decision.
    pub reason: Option<Reason>,
}

impl LimitResponse {
    /// Build a normal, store-sourced decision.
    pub fn new(success: bool, limit: u64, remaining: u64, reset: u64) -> Self {
        Self {
            success,
            limit,
            remaining,
            reset,
            pending: ready(()),
            reason: None,
        }
    }

    /// The synthetic fail-open response returned when the watchdog fires
    /// before the store replies.
    pub fn timeout() -> Self {
        Self {
            success: true,
            limit: 0,
            remaining: 0,
            reset: 0,
            pending: ready(()),
            reason: Some(Reason::Timeout),
        }
    }

    /// True for the watchdog's synthetic response.
    pub fn is_timeout(&self) -> bool {
        matches!(self.reason, Some(Reason::Timeout))
    }
}
