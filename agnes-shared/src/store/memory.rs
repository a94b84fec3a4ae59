//! In-memory repository
//!
//! Mirrors [`super::PgStore`] semantics over a `BTreeMap`: same filters,
//! same sort with id tie-break, and the same unique indexes
//! ([`Entity::unique_columns`]). Ids come from a monotonic sequence and are
//! never reused.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{Repository, StoreError};
use crate::entity::{Entity, FieldValue};
use crate::query::ListQuery;

struct MemoryState<E> {
    records: BTreeMap<i32, E>,
    next_id: i32,
}

pub struct MemoryStore<E> {
    state: RwLock<MemoryState<E>>,
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                records: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Store pre-populated with fully built records; ids are kept as given.
    pub fn with_records(records: impl IntoIterator<Item = E>) -> Self {
        let records: BTreeMap<i32, E> = records.into_iter().map(|r| (r.id(), r)).collect();
        let next_id = records.keys().next_back().map_or(1, |id| id + 1);
        Self {
            state: RwLock::new(MemoryState { records, next_id }),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|state| state.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState<E>>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState<E>>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Rejects `candidate` if another record already holds one of its unique values.
fn check_unique<E: Entity>(records: &BTreeMap<i32, E>, candidate: &E) -> Result<(), StoreError> {
    for column in E::unique_columns() {
        let value = candidate.field(column);
        let taken = records
            .values()
            .any(|other| other.id() != candidate.id() && other.field(column) == value);

        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: format!("idx_{}_{}", E::TABLE, column),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryStore<E> {
    async fn count(&self, query: &ListQuery<E>) -> Result<i64, StoreError> {
        let state = self.read()?;
        let total = state.records.values().filter(|r| query.matches(r)).count();
        Ok(total as i64)
    }

    async fn fetch(&self, query: &ListQuery<E>) -> Result<Vec<E>, StoreError> {
        let state = self.read()?;
        let mut matching: Vec<&E> = state.records.values().filter(|r| query.matches(r)).collect();

        let sort = query.sort();
        matching.sort_by(|a, b| sort.compare(*a, *b));

        let page = query.page();
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

        Ok(matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find(&self, id: i32) -> Result<Option<E>, StoreError> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }

    async fn find_by(
        &self,
        column: &'static str,
        value: &FieldValue,
    ) -> Result<Option<E>, StoreError> {
        let state = self.read()?;
        Ok(state
            .records
            .values()
            .find(|r| r.field(column).as_ref() == Some(value))
            .cloned())
    }

    async fn insert(&self, data: &E::Create) -> Result<E, StoreError> {
        let mut state = self.write()?;
        let record = E::build(state.next_id, data, Utc::now());
        check_unique(&state.records, &record)?;

        state.next_id += 1;
        state.records.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: i32, data: &E::Update) -> Result<Option<E>, StoreError> {
        let mut state = self.write()?;
        let Some(mut record) = state.records.get(&id).cloned() else {
            return Ok(None);
        };
        record.apply(data, Utc::now());
        check_unique(&state.records, &record)?;

        state.records.insert(id, record.clone());
        Ok(Some(record))
    }

    async fn delete(&self, id: i32) -> Result<Option<E>, StoreError> {
        Ok(self.write()?.records.remove(&id))
    }

    async fn delete_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError> {
        let mut state = self.write()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.remove(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateDevice, CreateUser, Device, UpdateDevice, User};

    fn device(description: &str) -> CreateDevice {
        CreateDevice {
            category_id: 1,
            location_id: 1,
            name: "sensor".to_string(),
            topic: "home/sensor".to_string(),
            description: description.to_string(),
            channel: 1,
            device_type: 1,
            visualization: 1,
            message_type: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::<Device>::new();
        let a = store.insert(&device("a")).await.unwrap();
        let b = store.insert(&device("b")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.created_at, a.updated_at);

        store.delete(b.id).await.unwrap();
        let c = store.insert(&device("c")).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_unique_column_is_enforced() {
        let store = MemoryStore::<Device>::new();
        store.insert(&device("boiler")).await.unwrap();

        let err = store.insert(&device("boiler")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
        assert_eq!(store.len(), 1);

        let other = store.insert(&device("attic")).await.unwrap();
        let update = UpdateDevice {
            description: Some("boiler".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(other.id, &update).await,
            Err(StoreError::UniqueViolation { .. })
        ));
        assert_eq!(store.find(other.id).await.unwrap().unwrap().description, "attic");
    }

    #[tokio::test]
    async fn test_every_unique_index_is_enforced() {
        let store = MemoryStore::<User>::new();
        let user = |username: &str, email: &str| CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
        };
        store.insert(&user("sameuser", "a@example.com")).await.unwrap();

        match store.insert(&user("sameuser", "b@example.com")).await {
            Err(StoreError::UniqueViolation { constraint }) => {
                assert_eq!(constraint, "idx_users_username")
            }
            other => panic!("expected unique violation, got {:?}", other.map(|u| u.id)),
        }
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_returns_none() {
        let store = MemoryStore::<Device>::new();
        let result = store.update(42, &UpdateDevice::default()).await.unwrap();
        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_with_records_continues_sequence() {
        let now = Utc::now();
        let store = MemoryStore::with_records(vec![
            Device::build(4, &device("four"), now),
            Device::build(9, &device("nine"), now),
        ]);
        let next = store.insert(&device("ten")).await.unwrap();
        assert_eq!(next.id, 10);
    }

    #[tokio::test]
    async fn test_delete_many_skips_missing() {
        let store = MemoryStore::<Device>::new();
        for name in ["a", "b", "c"] {
            store.insert(&device(name)).await.unwrap();
        }
        let removed = store.delete_many(&[3, 7, 1]).await.unwrap();
        let ids: Vec<i32> = removed.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(store.len(), 1);
    }
}
