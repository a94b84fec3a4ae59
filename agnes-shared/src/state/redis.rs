/// Redis state backend
///
/// Each key is stored as a JSON string under `key_prefix`. Connections go
/// through [`ConnectionManager`], which reconnects on its own; every command
/// runs under the configured timeout.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use agnes_shared::state::{RedisStateStore, StateStore};
///
/// # async fn example() -> Result<(), agnes_shared::state::StateError> {
/// let state = RedisStateStore::connect("redis://localhost:6379", "state:", Duration::from_secs(5)).await?;
/// state.set("feature", &serde_json::json!({"enabled": true})).await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{Client, Cmd, FromRedisValue, RedisError};
use async_trait::async_trait;
use serde_json::Value;

use super::{StateError, StateStore};

impl From<RedisError> for StateError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            StateError::Connection(err.to_string())
        } else {
            StateError::Backend(err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct RedisStateStore {
    manager: ConnectionManager,
    key_prefix: String,
    command_timeout: Duration,
}

impl RedisStateStore {
    /// Opens a managed connection and verifies it with `PING`.
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        command_timeout: Duration,
    ) -> Result<Self, StateError> {
        let client = Client::open(url)
            .map_err(|e| StateError::Config(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            StateError::Connection(format!("Failed to connect to Redis: {}", e))
        })?;

        let store = Self {
            manager,
            key_prefix: key_prefix.into(),
            command_timeout,
        };

        let pong: String = store.run(::redis::cmd("PING")).await?;
        if pong != "PONG" {
            tracing::warn!(response = %pong, "Unexpected PING response");
        }

        tracing::info!("Redis state store connected to {}", sanitize_url(url));
        Ok(store)
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn run<T: FromRedisValue>(&self, cmd: Cmd) -> Result<T, StateError> {
        let mut conn = self.manager.clone();
        tokio::time::timeout(self.command_timeout, cmd.query_async(&mut conn))
            .await
            .map_err(|_| StateError::Connection("Redis command timed out".to_string()))?
            .map_err(StateError::from)
    }
}

fn decode(raw: Option<String>) -> Result<Option<Value>, StateError> {
    raw.map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(StateError::from)
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn set(&self, key: &str, value: &Value) -> Result<Value, StateError> {
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(self.key(key)).arg(serde_json::to_string(value)?);
        let _: () = self.run(cmd).await?;

        tracing::debug!(key, "State stored");
        Ok(value.clone())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let mut cmd = ::redis::cmd("GET");
        cmd.arg(self.key(key));
        decode(self.run(cmd).await?)
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>, StateError> {
        let mut cmd = ::redis::cmd("GETDEL");
        cmd.arg(self.key(key));
        let previous = decode(self.run(cmd).await?)?;

        tracing::debug!(key, existed = previous.is_some(), "State removed");
        Ok(previous)
    }
}

/// Replaces credentials in a Redis URL for logging.
fn sanitize_url(url: &str) -> String {
    if let (Some(at_pos), Some(scheme_end)) = (url.rfind('@'), url.find("://")) {
        return format!("{}***@{}", &url[..scheme_end + 3], &url[at_pos + 1..]);
    }
    url.to_string()
}
