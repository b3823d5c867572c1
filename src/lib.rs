//! # hummn-ratelimit
//!
//! Distributed rate limiting backed by a Redis-wire-protocol-compatible
//! store. Three interchangeable admission algorithms — fixed window, sliding
//! window, token bucket — each implemented as an atomic server-side script,
//! orchestrated by a client that self-heals on script-cache misses, fails
//! open under a watchdog timeout, and can block a caller until capacity is
//! available.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hummn_ratelimit::{Limiter, LimitOptions, algorithms::fixed_window};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = Limiter::builder()
//!     .algorithm(fixed_window(10, "10s")?)
//!     .redis_url("redis://127.0.0.1/")
//!     .build()
//!     .await?;
//!
//! let result = limiter.limit("user_123", LimitOptions::default()).await?;
//! if result.success {
//!     println!("admitted, {} remaining", result.remaining);
//! } else {
//!     println!("rejected until {}", result.reset);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Algorithms
//!
//! - **Fixed window** — a plain counter per time bucket. Cheapest, allows a
//!   boundary burst.
//! - **Sliding window** — weights the previous bucket's count to correct the
//!   boundary burst, still O(1) storage.
//! - **Token bucket** — smooth admission with burst capacity via refill rate.
//!
//! ## Failure behaviour
//!
//! A non-zero `timeout_ms` (default 5s) races every `limit` call against a
//! watchdog; if the store hasn't answered in time the request is admitted
//! fail-open with [`response::Reason::Timeout`]. Set `timeout_ms(0)` to
//! propagate store errors directly instead.

pub mod algorithms;
pub mod connection;
pub mod duration;
pub mod error;
pub mod executor;
pub mod limiter;
pub mod reset;
pub mod response;
pub mod scripts;

pub use algorithms::{fixed_window, sliding_window, token_bucket, Algorithm, FixedWindow, SlidingWindow, TokenBucket};
pub use error::{RateLimitError, RateLimitResult};
pub use limiter::{LimitOptions, Limiter, LimiterBuilder};
pub use response::{LimitResponse, Reason};
