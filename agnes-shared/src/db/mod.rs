//! PostgreSQL connection pool and schema migrations

pub mod migrations;
pub mod pool;

pub use migrations::{ensure_database_exists, get_migration_status, run_migrations};
pub use pool::{close_pool, create_pool, get_pool_stats, health_check, DatabaseConfig, PoolStats};
