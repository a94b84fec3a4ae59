/// Worker configuration
///
/// Same layering as the API server: defaults, optional `agnes-worker.toml`,
/// `AGNES__*` variables, then the conventional variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `QUEUE_URL`: SQS queue URL (required by `consume`)
/// - `AWS_REGION`: region for SQS and DynamoDB (default: us-east-1)
/// - `AWS_ENDPOINT_URL`: endpoint override, e.g. LocalStack
/// - `STATE_BACKEND`: `dynamodb` or `redis`; unset disables checkpoints
/// - `GSM_TABLE`: DynamoDB state table (default: GlobalStateTable)
/// - `REDIS_URL`: Redis URL for the redis state backend

use agnes_shared::aws::AwsConfig;
use agnes_shared::db::DatabaseConfig;
use agnes_shared::state::StateConfig;
use config::{Environment, File};
use serde::Deserialize;
use std::env;

use crate::consumer::ConsumerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,

    /// `None` when no state backend is configured
    #[serde(default)]
    pub state: Option<StateConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub url: String,

    #[serde(default)]
    pub aws: AwsConfig,
}

/// Conventional variables that always apply
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("QUEUE_URL", "queue.url"),
    ("AWS_REGION", "queue.aws.region"),
    ("AWS_ENDPOINT_URL", "queue.aws.endpoint_url"),
];

/// Applied only when `STATE_BACKEND` is set
const STATE_OVERRIDES: &[(&str, &str)] = &[
    ("STATE_BACKEND", "state.backend"),
    ("GSM_TABLE", "state.table"),
    ("REDIS_URL", "state.redis_url"),
    ("AWS_REGION", "state.aws.region"),
    ("AWS_ENDPOINT_URL", "state.aws.endpoint_url"),
];

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let lookup = |(var, key): &(&str, &'static str)| (*key, env::var(var).ok());
        let mut overrides: Vec<(&str, Option<String>)> = ENV_OVERRIDES.iter().map(lookup).collect();
        if env::var("STATE_BACKEND").is_ok() {
            overrides.extend(STATE_OVERRIDES.iter().map(lookup));
        }

        Self::load(&overrides, true)
    }

    pub fn load(overrides: &[(&str, Option<String>)], read_sources: bool) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("database.url", "")?
            .set_default("queue.url", "")?;

        if read_sources {
            builder = builder
                .add_source(File::with_name("agnes-worker").required(false))
                .add_source(Environment::with_prefix("AGNES").separator("__"));
        }

        for (key, value) in overrides {
            builder = builder.set_override_option(*key, value.clone())?;
        }

        let config: WorkerConfig = builder.build()?.try_deserialize()?;
        if config.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }
        Ok(config)
    }

    /// The queue URL, required when consuming
    pub fn queue_url(&self) -> anyhow::Result<&str> {
        if self.queue.url.is_empty() {
            anyhow::bail!("QUEUE_URL environment variable is required");
        }
        Ok(&self.queue.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agnes_shared::state::StateBackend;

    fn required() -> Vec<(&'static str, Option<String>)> {
        vec![
            ("database.url", Some("postgresql://localhost/agnes".to_string())),
            ("queue.url", Some("http://localhost:9324/queue/users".to_string())),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::load(&required(), false).unwrap();
        assert_eq!(config.queue.aws.region, "us-east-1");
        assert_eq!(config.consumer.max_messages, 10);
        assert!(config.state.is_none());
    }

    #[test]
    fn test_state_backend_override() {
        let mut overrides = required();
        overrides.push(("state.backend", Some("redis".to_string())));
        overrides.push(("state.redis_url", Some("redis://localhost:6379".to_string())));

        let state = WorkerConfig::load(&overrides, false).unwrap().state.unwrap();
        assert_eq!(state.backend, StateBackend::Redis);
        assert_eq!(state.table, "GlobalStateTable");
        assert_eq!(state.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_queue_url_is_required() {
        let overrides = vec![("database.url", Some("postgresql://localhost/agnes".to_string()))];
        let config = WorkerConfig::load(&overrides, false).unwrap();
        assert!(config.queue_url().is_err());

        let config = WorkerConfig::load(&required(), false).unwrap();
        assert_eq!(config.queue_url().unwrap(), "http://localhost:9324/queue/users");
    }
}
