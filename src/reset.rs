//! The scan-and-unlink reset engine shared by all three algorithms.

use crate::connection::RedisConnectionLike;
use crate::error::{RateLimitError, RateLimitResult};
use crate::executor::exec;
use crate::scripts::reset_pattern;
use redis::Value;
use tracing::debug;

const BATCH_SIZE: u64 = 100;
const MAX_DELETES: u64 = 1000;

/// Delete every key matching `pattern` (`<prefix>:<identifier>:*`), via a
/// single `SCAN`-driven `UNLINK` loop evaluated atomically in one script
/// call.
///
/// Calls the scan script once; a non-zero cursor in the reply means more
/// keys remain past `MAX_DELETES`, which this engine does not chase further
/// (see the spec's documented limitation — each identifier has at most two
/// live keys in practice for fixed/sliding window, and one for token bucket).
pub async fn reset(conn: &dyn RedisConnectionLike, pattern: &str) -> RateLimitResult<()> {
    debug!(pattern = %pattern, "resetting rate limit state");

    let reply = exec(
        conn,
        reset_pattern(),
        &[pattern.to_string()],
        &[
            "0".to_string(),
            BATCH_SIZE.to_string(),
            MAX_DELETES.to_string(),
        ],
    )
    .await?;

    let (deleted, _cursor) = parse_reset_reply(reply)?;
    debug!(pattern = %pattern, deleted, "rate limit reset complete");
    Ok(())
}

fn parse_reset_reply(value: Value) -> RateLimitResult<(i64, String)> {
    match value {
        Value::Array(items) if items.len() == 2 => {
            let deleted = match &items[0] {
                Value::Int(n) => *n,
                other => {
                    return Err(RateLimitError::script(format!(
                        "reset script returned non-integer deleted count: {other:?}"
                    )))
                }
            };
            let cursor = match &items[1] {
                Value::BulkString(bytes) => String::from_utf8_lossy(bytes).to_string(),
                Value::Int(n) => n.to_string(),
                other => {
                    return Err(RateLimitError::script(format!(
                        "reset script returned non-string cursor: {other:?}"
                    )))
                }
            };
            Ok((deleted, cursor))
        }
        other => Err(RateLimitError::script(format!(
            "reset script returned unexpected shape: {other:?}"
        ))),
    }
}
