/// Category model
///
/// Categories group devices by kind ("temperature sensors", "relays", ...).
/// Devices reference a category by id only; deleting a category leaves its
/// devices in place with a dangling `category_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::entity::{Entity, FieldValue, FilterSpec};
use crate::validation::not_blank;

/// Category record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[validate(custom(function = "not_blank"))]
    pub name: String,

    #[validate(custom(function = "not_blank"))]
    pub description: String,
}

/// Input for updating a category
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategory {
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,
}

impl Entity for Category {
    type Create = CreateCategory;
    type Update = UpdateCategory;

    const NAME: &'static str = "Category";
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["name", "description"];
    const SORTABLE: &'static [&'static str] = &["id", "name", "description"];
    const FILTERS: &'static [FilterSpec] =
        &[FilterSpec::contains("name"), FilterSpec::contains("description")];

    fn id(&self) -> i32 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }

    fn build(id: i32, data: &CreateCategory, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name.clone(),
            description: data.description.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, data: &UpdateCategory, now: DateTime<Utc>) {
        if let Some(name) = &data.name {
            self.name = name.clone();
        }
        if let Some(description) = &data.description {
            self.description = description.clone();
        }
        self.updated_at = now;
    }

    fn create_values(data: &CreateCategory) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", data.name.as_str().into()),
            ("description", data.description.as_str().into()),
        ]
    }

    fn update_values(data: &UpdateCategory) -> Vec<(&'static str, FieldValue)> {
        let mut values = Vec::new();
        if let Some(name) = &data.name {
            values.push(("name", name.as_str().into()));
        }
        if let Some(description) = &data.description {
            values.push(("description", description.as_str().into()));
        }
        values
    }
}
