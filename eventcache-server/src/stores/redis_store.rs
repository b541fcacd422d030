use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::{CacheStore, ConnectionState};
use crate::config::CacheStoreConfig;
use crate::core::{CacheKey, EventCacheError, Result};

const STORE_NAME: &str = "redis";

/// Redis-backed cache store.
///
/// Wraps a `ConnectionManager`, which reconnects on its own after the
/// server drops; every command is bounded by the configured op timeout so
/// a hung socket only stalls the lookup that issued it.
pub struct RedisCacheStore {
    conn: ConnectionManager,
    state: ConnectionState,
    op_timeout: Duration,
}

impl RedisCacheStore {
    /// Connect and verify the server answers `PING`
    pub async fn connect(config: &CacheStoreConfig) -> Result<Self> {
        let url = config.connection_url()?;
        let op_timeout = Duration::from_millis(config.op_timeout_ms);
        info!("Connecting to Redis at {}:{}", config.host, config.port);

        let client = redis::Client::open(url.as_str()).map_err(startup_error)?;
        let conn = tokio::time::timeout(op_timeout, client.get_connection_manager())
            .await
            .map_err(|_| EventCacheError::StartupConnect {
                store: STORE_NAME,
                reason: format!("no answer within {}ms", config.op_timeout_ms),
            })?
            .map_err(startup_error)?;

        let store = Self {
            conn,
            state: ConnectionState::new(STORE_NAME, true),
            op_timeout,
        };

        store
            .ping()
            .await
            .map_err(|e| EventCacheError::StartupConnect {
                store: STORE_NAME,
                reason: e.to_string(),
            })?;

        info!("Redis client ready");
        Ok(store)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => {
                self.state.mark_up();
                Ok(value)
            }
            Ok(Err(e)) => {
                if is_connection_error(&e) {
                    self.state.mark_down(&e.to_string());
                }
                Err(EventCacheError::CacheUnavailable(format!("{}: {}", op, e)))
            }
            Err(_) => {
                self.state.mark_down("command timed out");
                Err(EventCacheError::CacheUnavailable(format!(
                    "{}: timed out after {:?}",
                    op, self.op_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let key = key.as_str();
        self.run("GET", async move { conn.get::<_, Option<String>>(key).await })
            .await
    }

    async fn set_with_ttl(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let key_str = key.as_str();
        let seconds = ttl.as_secs().max(1);
        self.run("SETEX", async move {
            conn.set_ex::<_, _, ()>(key_str, value, seconds).await
        })
        .await
        .map_err(|e| EventCacheError::CachePopulateFailed(e.to_string()))?;

        debug!("Stored {} in Redis with TTL {}s", key, seconds);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        self.run("PING", async move {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisError>(pong)
        })
        .await
        .map(|_| ())
    }

    fn is_up(&self) -> bool {
        self.state.is_up()
    }
}

fn is_connection_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
}

fn startup_error(err: RedisError) -> EventCacheError {
    EventCacheError::StartupConnect {
        store: STORE_NAME,
        reason: err.to_string(),
    }
}
