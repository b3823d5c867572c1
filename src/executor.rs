//! Runs a script by hash, self-healing on `NOSCRIPT` by loading the script
//! and retrying once.

use crate::connection::RedisConnectionLike;
use crate::error::{RateLimitError, RateLimitResult};
use crate::scripts::ScriptInfo;
use redis::Value;
use tracing::trace;

/// Execute `script` against `keys`/`args`, transparently recovering from a
/// script-cache miss.
///
/// The common path is a single `EVALSHA` round trip. On `NOSCRIPT` the script
/// is loaded with `SCRIPT LOAD` and the `EVALSHA` is retried exactly once with
/// the original arguments. Any other error (including a second `NOSCRIPT`,
/// which would indicate a buggy store) is surfaced unchanged.
pub async fn exec(
    conn: &dyn RedisConnectionLike,
    script: ScriptInfo,
    keys: &[String],
    args: &[String],
) -> RateLimitResult<Value> {
    match eval_sha(conn, script.hash(), keys, args).await {
        Ok(value) => Ok(value),
        Err(err) if is_noscript(&err) => {
            trace!(hash = %script.hash(), "script cache miss, loading and retrying");
            load(conn, script.script).await?;
            eval_sha(conn, script.hash(), keys, args).await
        }
        Err(err) => Err(err),
    }
}

async fn eval_sha(
    conn: &dyn RedisConnectionLike,
    hash: &str,
    keys: &[String],
    args: &[String],
) -> RateLimitResult<Value> {
    let mut command_args = Vec::with_capacity(2 + keys.len() + args.len());
    command_args.push(hash.to_string());
    command_args.push(keys.len().to_string());
    command_args.extend_from_slice(keys);
    command_args.extend_from_slice(args);

    conn.send_command("EVALSHA", &command_args)
        .await
        .map_err(map_script_error)
}

async fn load(conn: &dyn RedisConnectionLike, script: &str) -> RateLimitResult<()> {
    conn.send_command("SCRIPT", &["LOAD".to_string(), script.to_string()])
        .await
        .map(|_| ())
        .map_err(RateLimitError::Redis)
}

fn is_noscript(err: &RateLimitError) -> bool {
    matches!(err, RateLimitError::Redis(e) if e.to_string().to_uppercase().contains("NOSCRIPT"))
}

/// A script-level error reply (as opposed to a transport failure) is
/// surfaced as [`RateLimitError::Script`] so callers can tell "the store is
/// unreachable" apart from "the script rejected these arguments".
fn map_script_error(err: redis::RedisError) -> RateLimitError {
    if err.to_string().to_uppercase().contains("NOSCRIPT") {
        RateLimitError::Redis(err)
    } else if err.kind() == redis::ErrorKind::ExtensionError {
        RateLimitError::script(err.to_string())
    } else {
        RateLimitError::Redis(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A fake store that fails the first `EVALSHA` with `NOSCRIPT`, accepts a
    /// `SCRIPT LOAD`, then succeeds on retry — exercising the executor's
    /// self-healing path without a real Redis server.
    struct FlakyOnceStore {
        eval_calls: AtomicUsize,
        loaded: Mutex<bool>,
    }

    #[async_trait]
    impl RedisConnectionLike for FlakyOnceStore {
        async fn send_command(&self, name: &str, _args: &[String]) -> Result<Value, redis::RedisError> {
            match name {
                "EVALSHA" => {
                    let call = self.eval_calls.fetch_add(1, Ordering::SeqCst);
                    if call == 0 {
                        Err((redis::ErrorKind::ResponseError, "NOSCRIPT No matching script").into())
                    } else {
                        Ok(Value::Int(7))
                    }
                }
                "SCRIPT" => {
                    *self.loaded.lock().unwrap() = true;
                    Ok(Value::Okay)
                }
                other => panic!("unexpected command {other}"),
            }
        }

        fn status(&self) -> ConnectionStatus {
            ConnectionStatus::Connected
        }
    }

    /// A fake store that always returns a script-level error reply.
    struct AlwaysScriptErrorStore;

    #[async_trait]
    impl RedisConnectionLike for AlwaysScriptErrorStore {
        async fn send_command(&self, _name: &str, _args: &[String]) -> Result<Value, redis::RedisError> {
            Err((redis::ErrorKind::ExtensionError, "window_ms must be positive").into())
        }
    }

    #[tokio::test]
    async fn recovers_from_noscript_with_single_retry() {
        let store = FlakyOnceStore {
            eval_calls: AtomicUsize::new(0),
            loaded: Mutex::new(false),
        };

        let script = crate::scripts::fixed_window_limit();
        let result = exec(&store, script, &["k".to_string()], &["1000".to_string(), "1".to_string()])
            .await
            .unwrap();

        assert_eq!(result, Value::Int(7));
        assert_eq!(store.eval_calls.load(Ordering::SeqCst), 2);
        assert!(*store.loaded.lock().unwrap());
    }

    #[tokio::test]
    async fn surfaces_non_noscript_script_errors() {
        let script = crate::scripts::fixed_window_limit();
        let err = exec(&AlwaysScriptErrorStore, script, &["k".to_string()], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, RateLimitError::Script(_)));
        assert!(err.to_string().contains("window_ms must be positive"));
    }
}
