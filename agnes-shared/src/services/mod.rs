/// Entity services
///
/// [`EntityService`] implements the list/find/save/update/delete contract
/// once for every entity. A service is a thin handle around an injected
/// repository: construct one per request, share nothing mutable.
///
/// # Errors
///
/// | Variant | Meaning |
/// |---------|---------|
/// | `NotFound` | unknown id |
/// | `Conflict` | uniqueness column already taken |
/// | `Query` | rejected sort, page or filter parameters |
/// | `Validation` | payload failed its field rules |
/// | `Internal` | storage or hashing failure, already logged |
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use agnes_shared::models::{Category, CreateCategory};
/// use agnes_shared::query::ListParams;
/// use agnes_shared::services::EntityService;
/// use agnes_shared::store::MemoryStore;
///
/// # async fn example() -> Result<(), agnes_shared::services::ServiceError> {
/// let categories = EntityService::<Category>::new(Arc::new(MemoryStore::<Category>::new()));
/// categories
///     .save(CreateCategory {
///         name: "Sensors".to_string(),
///         description: "Environmental sensors".to_string(),
///     })
///     .await?;
///
/// let page = categories.list(&ListParams::default()).await?;
/// assert_eq!(page.meta.total, 1);
/// # Ok(())
/// # }
/// ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::entity::Entity;
use crate::password::PasswordError;
use crate::query::{ListParams, ListQuery, Page, PagedQueryEngine, QueryError};
use crate::store::{Repository, StoreError};
use crate::validation::{validate_payload, FieldError};

pub mod relations;

pub use relations::{DeviceDetail, DeviceRelations, ReadingDetail, ReadingRelations};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        error!(error = %err, "Password hashing failed");
        ServiceError::Internal(err.to_string())
    }
}

/// Maps a storage failure for entity `E` into the service taxonomy.
pub(crate) fn store_error<E: Entity>(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation { constraint } => {
            debug!(entity = E::NAME, constraint = %constraint, "Write rejected by unique index");
            ServiceError::Conflict(format!("{} conflicts with an existing record", E::NAME))
        }
        other => {
            error!(entity = E::NAME, error = %other, "Storage failure");
            ServiceError::Internal(other.to_string())
        }
    }
}

/// CRUD operations for one entity type over an injected repository
pub struct EntityService<E: Entity> {
    repo: Arc<dyn Repository<E>>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(repo: Arc<dyn Repository<E>>) -> Self {
        Self { repo }
    }

    /// Filtered, sorted page of records plus pagination metadata
    pub async fn list(&self, params: &ListParams) -> Result<Page<E>, ServiceError> {
        let query = ListQuery::<E>::from_params(params)?;
        PagedQueryEngine::new(self.repo.as_ref())
            .run(&query)
            .await
            .map_err(store_error::<E>)
    }

    pub async fn find(&self, id: i32) -> Result<E, ServiceError> {
        self.repo
            .find(id)
            .await
            .map_err(store_error::<E>)?
            .ok_or(ServiceError::NotFound {
                entity: E::NAME,
                id,
            })
    }

    /// Validates and stores a new record.
    ///
    /// Rejects the payload with `Conflict` when the entity's uniqueness
    /// column is already taken. The unique index behind it turns a
    /// concurrent duplicate into `Conflict` as well.
    pub async fn save(&self, data: E::Create) -> Result<E, ServiceError> {
        validate_payload(&data).map_err(ServiceError::Validation)?;

        if let Some((column, value)) = E::unique_value(&data) {
            let existing = self
                .repo
                .find_by(column, &value)
                .await
                .map_err(store_error::<E>)?;
            if existing.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "{} with this {} already exists",
                    E::NAME,
                    column
                )));
            }
        }

        let data = E::prepare_create(data)?;
        let record = self.repo.insert(&data).await.map_err(store_error::<E>)?;

        info!(entity = E::NAME, id = record.id(), "Record created");
        Ok(record)
    }

    /// Applies the supplied fields and refreshes `updated_at`.
    pub async fn update(&self, id: i32, data: E::Update) -> Result<E, ServiceError> {
        validate_payload(&data).map_err(ServiceError::Validation)?;

        let data = E::prepare_update(data)?;
        let record = self
            .repo
            .update(id, &data)
            .await
            .map_err(store_error::<E>)?
            .ok_or(ServiceError::NotFound {
                entity: E::NAME,
                id,
            })?;

        info!(entity = E::NAME, id, "Record updated");
        Ok(record)
    }

    /// Hard delete. Returns the removed record.
    pub async fn delete(&self, id: i32) -> Result<E, ServiceError> {
        let record = self
            .repo
            .delete(id)
            .await
            .map_err(store_error::<E>)?
            .ok_or(ServiceError::NotFound {
                entity: E::NAME,
                id,
            })?;

        info!(entity = E::NAME, id, "Record deleted");
        Ok(record)
    }

    /// Deletes every existing record in `ids`.
    ///
    /// Unknown ids are skipped and duplicates count once. Snapshots come
    /// back in the order the ids were given.
    pub async fn bulk_delete(&self, ids: &[i32]) -> Result<Vec<E>, ServiceError> {
        let mut seen = HashSet::new();
        let unique: Vec<i32> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let removed = self
            .repo
            .delete_many(&unique)
            .await
            .map_err(store_error::<E>)?;

        let mut by_id: HashMap<i32, E> = removed.into_iter().map(|r| (r.id(), r)).collect();
        let snapshots: Vec<E> = unique.iter().filter_map(|id| by_id.remove(id)).collect();

        info!(
            entity = E::NAME,
            requested = ids.len(),
            deleted = snapshots.len(),
            "Bulk delete finished"
        );
        Ok(snapshots)
    }
}
