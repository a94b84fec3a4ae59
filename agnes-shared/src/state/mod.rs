/// Global key-value state
///
/// Small JSON documents shared between the API, the worker and external
/// jobs, addressed by string key. Two backends implement [`StateStore`]:
///
/// - [`DynamoStateStore`]: one DynamoDB item per key (`Key` / `Attr_Data`)
/// - [`RedisStateStore`]: one Redis string per key under a prefix
///
/// # Example
///
/// ```no_run
/// use agnes_shared::state::{connect, StateConfig, StateStoreExt};
///
/// # async fn example() -> Result<(), agnes_shared::state::StateError> {
/// let state = connect(&StateConfig::default()).await?;
/// state.set_as("worker:last_batch", &serde_json::json!({"processed": 3})).await?;
/// let last: Option<serde_json::Value> = state.get_as("worker:last_batch").await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aws::{load_sdk_config, AwsConfig};

pub mod dynamo;
pub mod redis;

pub use dynamo::DynamoStateStore;
pub use self::redis::RedisStateStore;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("State backend error: {0}")]
    Backend(String),

    #[error("State connection error: {0}")]
    Connection(String),

    #[error("State configuration error: {0}")]
    Config(String),

    #[error("State value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value, and returns
    /// what the backend now holds.
    async fn set(&self, key: &str, value: &Value) -> Result<Value, StateError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StateError>;

    /// Deletes `key` and returns the value it held.
    async fn remove(&self, key: &str) -> Result<Option<Value>, StateError>;
}

/// Typed access on top of the JSON contract
#[async_trait]
pub trait StateStoreExt: StateStore {
    async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), StateError> {
        let value = serde_json::to_value(value)?;
        self.set(key, &value).await?;
        Ok(())
    }

    async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    Dynamodb,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_backend")]
    pub backend: StateBackend,

    /// DynamoDB table name
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub aws: AwsConfig,

    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_backend() -> StateBackend {
    StateBackend::Dynamodb
}

fn default_table() -> String {
    "GlobalStateTable".to_string()
}

fn default_key_prefix() -> String {
    "state:".to_string()
}

fn default_command_timeout() -> u64 {
    10
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            table: default_table(),
            aws: AwsConfig::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

/// Builds the configured backend.
pub async fn connect(config: &StateConfig) -> Result<Arc<dyn StateStore>, StateError> {
    match config.backend {
        StateBackend::Dynamodb => {
            let sdk = load_sdk_config(&config.aws).await;
            Ok(Arc::new(DynamoStateStore::from_sdk_config(
                &sdk,
                config.table.clone(),
            )))
        }
        StateBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                StateError::Config("redis_url is required for the redis backend".to_string())
            })?;
            let store = RedisStateStore::connect(
                url,
                config.key_prefix.clone(),
                std::time::Duration::from_secs(config.command_timeout_secs),
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapState(Mutex<HashMap<String, Value>>);

    #[async_trait]
    impl StateStore for MapState {
        async fn set(&self, key: &str, value: &Value) -> Result<Value, StateError> {
            self.0.lock().unwrap().insert(key.to_string(), value.clone());
            Ok(value.clone())
        }

        async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
            Ok(self.0.lock().unwrap().get(key).cloned())
        }

        async fn remove(&self, key: &str) -> Result<Option<Value>, StateError> {
            Ok(self.0.lock().unwrap().remove(key))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Checkpoint {
        processed: usize,
    }

    #[tokio::test]
    async fn test_typed_helpers_round_through_json() {
        let state: Arc<dyn StateStore> = Arc::new(MapState::default());
        state.set_as("cp", &Checkpoint { processed: 4 }).await.unwrap();

        let cp: Option<Checkpoint> = state.get_as("cp").await.unwrap();
        assert_eq!(cp, Some(Checkpoint { processed: 4 }));

        state.remove("cp").await.unwrap();
        let gone: Option<Checkpoint> = state.get_as("cp").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_get_as_wrong_shape_is_json_error() {
        let state = MapState::default();
        state.set("cp", &serde_json::json!("text")).await.unwrap();
        let result: Result<Option<Checkpoint>, _> = state.get_as("cp").await;
        assert!(matches!(result, Err(StateError::Json(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config: StateConfig = serde_json::from_str(r#"{"backend": "redis"}"#).unwrap();
        assert_eq!(config.backend, StateBackend::Redis);
        assert_eq!(config.table, "GlobalStateTable");
        assert_eq!(config.key_prefix, "state:");
        assert_eq!(config.aws.region, "us-east-1");
    }

    #[tokio::test]
    async fn test_redis_backend_requires_url() {
        let config = StateConfig {
            backend: StateBackend::Redis,
            ..Default::default()
        };
        assert!(matches!(connect(&config).await, Err(StateError::Config(_))));
    }
}
