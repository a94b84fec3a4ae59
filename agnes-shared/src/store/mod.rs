/// Storage backends
///
/// [`Repository`] is the query capability the services and the paged query
/// engine consume. Two implementations exist:
///
/// - [`PgStore`]: PostgreSQL through sqlx, used by the API and worker
/// - [`MemoryStore`]: a process-local map with identical semantics, used by
///   tests and local fixtures
///
/// Both enforce the entity's uniqueness column and report collisions as
/// [`StoreError::UniqueViolation`].

use async_trait::async_trait;

use crate::entity::{Entity, FieldValue};
use crate::query::ListQuery;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write
    #[error("Unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Record storage for one entity type
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Number of records passing the query's filters
    async fn count(&self, query: &ListQuery<E>) -> Result<i64, StoreError>;

    /// The filtered, sorted slice selected by the query's page request
    async fn fetch(&self, query: &ListQuery<E>) -> Result<Vec<E>, StoreError>;

    async fn find(&self, id: i32) -> Result<Option<E>, StoreError>;

    /// Records whose id is in `ids`, in no particular order
    async fn find_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError>;

    /// First record whose `column` equals `value`
    async fn find_by(&self, column: &'static str, value: &FieldValue)
        -> Result<Option<E>, StoreError>;

    async fn insert(&self, data: &E::Create) -> Result<E, StoreError>;

    /// Applies a partial update. `Ok(None)` when `id` does not exist.
    async fn update(&self, id: i32, data: &E::Update) -> Result<Option<E>, StoreError>;

    /// Deletes and returns the removed record. `Ok(None)` when `id` does not exist.
    async fn delete(&self, id: i32) -> Result<Option<E>, StoreError>;

    /// Deletes every existing record in `ids`, returning what was removed
    async fn delete_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError>;
}
