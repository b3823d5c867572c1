//! The narrow store collaborator surface the engine actually needs.
//!
//! Keeping this trait small (rather than threading `redis::aio::ConnectionManager`
//! or the full `redis::AsyncCommands` surface through every module) means the
//! rest of the crate depends on exactly the handful of commands §6 of the spec
//! lists, and nothing about connection pooling, pub/sub, or cluster topology
//! leaks into the algorithms.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, Value};
use tracing::debug;

/// Informational connection status. Nothing in the engine branches on this
/// beyond exposing it to callers — `ConnectionManager` already reconnects
/// transparently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// The store collaborator interface: a single `send_command`-shaped capability.
///
/// Implemented for `redis::aio::ConnectionManager` by default. Anything that
/// can issue a named Redis command with a flat argument list and return a
/// [`redis::Value`] satisfies this trait, which is exactly what the script
/// executor and the reset engine need.
#[async_trait]
pub trait RedisConnectionLike: Send + Sync {
    /// Issue `name ARGV[0] ARGV[1] ...` and return the raw reply.
    async fn send_command(&self, name: &str, args: &[String]) -> Result<Value, RedisError>;

    /// Current connection status, informational only.
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }
}

#[async_trait]
impl RedisConnectionLike for ConnectionManager {
    async fn send_command(&self, name: &str, args: &[String]) -> Result<Value, RedisError> {
        let mut conn = self.clone();
        let mut cmd = redis::cmd(name);
        for arg in args {
            cmd.arg(arg);
        }
        cmd.query_async(&mut conn).await
    }
}

/// Build a `ConnectionManager` from a Redis URL. Thin wrapper kept here only
/// because it's the one piece of "construct a store client" surface the
/// engine's own builder needs; anything more (pooling, sentinel, cluster) is
/// the caller's responsibility, per the spec's external-collaborator scoping.
pub async fn connect(url: &str) -> Result<ConnectionManager, RedisError> {
    debug!(url = %url, "connecting to redis for rate limiting");
    let client = redis::Client::open(url)?;
    ConnectionManager::new(client).await
}
