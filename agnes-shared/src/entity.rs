//! Entity descriptors
//!
//! Every record type served by the backend implements [`Entity`]. The trait
//! carries everything the generic machinery needs to know about a table:
//! its columns, which of them may be sorted or filtered on, the designated
//! uniqueness column, and the payloads used to create and update rows.
//!
//! The paged query engine, both storage backends, and the HTTP layer are
//! written once against this trait.
//!
//! # Example
//!
//! ```
//! use agnes_shared::entity::Entity;
//! use agnes_shared::models::Category;
//!
//! assert_eq!(Category::TABLE, "categories");
//! assert!(Category::SORTABLE.contains(&"name"));
//! ```

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use validator::Validate;

use crate::services::ServiceError;

/// A single column value, used for sorting, filtering and binding.
///
/// Ordering is only meaningful between values of the same variant.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FieldValue {
    Int(i32),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// How a filter parameter is matched against its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Case-sensitive substring match on a text column
    Contains,
    /// Exact match on an integer column
    Equals,
}

/// One optional filter an entity accepts on its list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    /// Query-string parameter name
    pub param: &'static str,
    /// Column the parameter is matched against
    pub column: &'static str,
    pub kind: FilterKind,
}

impl FilterSpec {
    pub const fn contains(column: &'static str) -> Self {
        Self {
            param: column,
            column,
            kind: FilterKind::Contains,
        }
    }

    pub const fn equals(column: &'static str) -> Self {
        Self {
            param: column,
            column,
            kind: FilterKind::Equals,
        }
    }
}

/// Descriptor implemented by every persisted record type.
///
/// `id`, `created_at` and `updated_at` are implicit: they are never listed in
/// [`Entity::COLUMNS`] and are managed by the storage backend.
pub trait Entity:
    Serialize + Clone + Send + Sync + Unpin + for<'r> FromRow<'r, PgRow> + 'static
{
    /// Payload accepted when creating a record
    type Create: Validate + DeserializeOwned + Send + Sync + 'static;

    /// Partial payload accepted when updating a record
    type Update: Validate + DeserializeOwned + Send + Sync + 'static;

    /// Display name used in client-facing messages ("User", "Device", ...)
    const NAME: &'static str;

    /// Backing table
    const TABLE: &'static str;

    /// Business columns in insert order
    const COLUMNS: &'static [&'static str];

    /// Accepted values of `sort_by`
    const SORTABLE: &'static [&'static str];

    /// Optional filters, applied in declaration order
    const FILTERS: &'static [FilterSpec];

    /// Column that must be unique across records, checked on create
    const UNIQUE: Option<&'static str> = None;

    /// Further columns behind a unique index. Not pre-checked by `save`,
    /// but every backend rejects duplicates on them.
    const EXTRA_UNIQUE: &'static [&'static str] = &[];

    /// Every column a backend must keep unique
    fn unique_columns() -> Vec<&'static str> {
        Self::UNIQUE
            .into_iter()
            .chain(Self::EXTRA_UNIQUE.iter().copied())
            .collect()
    }

    fn id(&self) -> i32;

    fn created_at(&self) -> DateTime<Utc>;

    /// Value of `column`, including `id`, `created_at` and `updated_at`.
    /// Returns `None` for unknown columns.
    fn field(&self, column: &str) -> Option<FieldValue>;

    /// Materialises a new record. Used by the in-memory backend.
    fn build(id: i32, data: &Self::Create, now: DateTime<Utc>) -> Self;

    /// Applies the supplied fields of `data` and refreshes `updated_at`.
    fn apply(&mut self, data: &Self::Update, now: DateTime<Utc>);

    /// Column/value pairs for an insert, in [`Entity::COLUMNS`] order.
    fn create_values(data: &Self::Create) -> Vec<(&'static str, FieldValue)>;

    /// Column/value pairs for the fields present in an update.
    fn update_values(data: &Self::Update) -> Vec<(&'static str, FieldValue)>;

    /// Hook run on a validated create payload before it is stored.
    fn prepare_create(data: Self::Create) -> Result<Self::Create, ServiceError> {
        Ok(data)
    }

    /// Hook run on a validated update payload before it is stored.
    fn prepare_update(data: Self::Update) -> Result<Self::Update, ServiceError> {
        Ok(data)
    }

    /// Value of the uniqueness column in a create payload, if the entity has one.
    fn unique_value(data: &Self::Create) -> Option<(&'static str, FieldValue)> {
        let column = Self::UNIQUE?;
        Self::create_values(data)
            .into_iter()
            .find(|(name, _)| *name == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Device, Reading, User};

    #[test]
    fn test_field_value_ordering() {
        assert!(FieldValue::Int(1) < FieldValue::Int(2));
        assert!(FieldValue::from("apple") < FieldValue::from("banana"));
        assert_eq!(FieldValue::from(7).as_int(), Some(7));
        assert_eq!(FieldValue::from("x").as_text(), Some("x"));
        assert_eq!(FieldValue::from(7).as_text(), None);
    }

    #[test]
    fn test_filter_spec_constructors() {
        let spec = FilterSpec::contains("name");
        assert_eq!(spec.param, "name");
        assert_eq!(spec.kind, FilterKind::Contains);

        let spec = FilterSpec::equals("device_id");
        assert_eq!(spec.column, "device_id");
        assert_eq!(spec.kind, FilterKind::Equals);
    }

    #[test]
    fn test_unique_columns() {
        assert_eq!(User::UNIQUE, Some("email"));
        assert_eq!(Device::UNIQUE, Some("description"));
        assert_eq!(Reading::UNIQUE, Some("device_id"));
        assert_eq!(User::unique_columns(), vec!["email", "username"]);
        assert!(Category::unique_columns().is_empty());
    }

    #[test]
    fn test_sortable_columns_are_known() {
        fn check<E: Entity>() {
            for column in E::SORTABLE {
                assert!(
                    *column == "id" || E::COLUMNS.contains(column),
                    "{} sorts on unknown column {}",
                    E::NAME,
                    column
                );
            }
            for filter in E::FILTERS {
                assert!(E::COLUMNS.contains(&filter.column));
            }
        }

        check::<User>();
        check::<crate::models::Category>();
        check::<crate::models::Location>();
        check::<Device>();
        check::<Reading>();
    }
}
