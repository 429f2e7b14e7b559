//! Redis access for the job queue and the ephemeral batch records.
//!
//! Mirrors the database crate: a connection helper plus stateless
//! repositories that take the connection as their first argument.
//! The multiplexed connection is cheap to clone and safe to share, so the
//! worker keeps a single one for its whole lifetime.

pub mod repositories;

pub use repositories::{BatchErrorRepo, BatchProgressRepo, QueueRepo};

/// Shared async connection to Redis.
pub type CacheConn = redis::aio::MultiplexedConnection;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Decode(#[from] jenga_core::error::CoreError),
}

/// Open a multiplexed connection to the Redis server at `redis_url`.
pub async fn connect(redis_url: &str) -> Result<CacheConn, redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    client.get_multiplexed_async_connection().await
}

/// Send `PING` and expect `PONG`.
pub async fn health_check(conn: &mut CacheConn) -> Result<(), redis::RedisError> {
    let pong: String = redis::cmd("PING").query_async(conn).await?;
    tracing::debug!(reply = %pong, "Redis health check");
    Ok(())
}
