/// Configuration management for the API server
///
/// Sources, later ones winning:
///
/// 1. built-in defaults
/// 2. optional `agnes.toml` in the working directory
/// 3. `AGNES__SECTION__KEY` environment variables (e.g. `AGNES__API__PORT`)
/// 4. the conventional variables below
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `APP_ENVIRONMENT`: `development` or `production` (default: development)
/// - `ALLOWED_ORIGINS`: comma separated CORS origins (default: `*`)
/// - `RUST_LOG`, `LOG_FORMAT`: read by the binary's tracing setup
///
/// # Example
///
/// ```no_run
/// use agnes_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use agnes_shared::db::DatabaseConfig;
use config::{Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `production` switches CORS to the explicit origin list
    pub environment: String,

    /// Comma separated; `*` allows any origin
    pub allowed_origins: String,
}

impl ApiConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Conventional variable name and the key it overrides
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.url"),
    ("DATABASE_MAX_CONNECTIONS", "database.max_connections"),
    ("API_HOST", "api.host"),
    ("API_PORT", "api.port"),
    ("APP_ENVIRONMENT", "api.environment"),
    ("ALLOWED_ORIGINS", "api.allowed_origins"),
];

impl Config {
    /// Loads `.env`, then every configuration source.
    ///
    /// # Errors
    ///
    /// Fails when `DATABASE_URL` is missing or a value has the wrong type.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let overrides: Vec<(&str, Option<String>)> = ENV_OVERRIDES
            .iter()
            .map(|(var, key)| (*key, env::var(var).ok()))
            .collect();

        Self::load(&overrides, true)
    }

    /// Builds the configuration from defaults plus explicit overrides.
    pub fn load(overrides: &[(&str, Option<String>)], read_sources: bool) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 8080)?
            .set_default("api.environment", "development")?
            .set_default("api.allowed_origins", "*")?
            .set_default("database.url", "")?;

        if read_sources {
            builder = builder
                .add_source(File::with_name("agnes").required(false))
                .add_source(Environment::with_prefix("AGNES").separator("__"));
        }

        for (key, value) in overrides {
            builder = builder.set_override_option(*key, value.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        if config.database.url.is_empty() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
