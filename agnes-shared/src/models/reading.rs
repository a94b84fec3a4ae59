/// Reading model
///
/// The latest value reported by a device, attributed to a user. There is at
/// most one reading per device: `device_id` is the uniqueness column.
/// `unit` and `value` are stored as text exactly as the device reported them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::entity::{Entity, FieldValue, FilterSpec};
use crate::validation::not_blank;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reading {
    pub id: i32,
    pub user_id: i32,
    pub device_id: i32,
    pub unit: String,
    pub value: String,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReading {
    pub user_id: i32,
    pub device_id: i32,

    #[validate(custom(function = "not_blank"))]
    pub unit: String,

    #[validate(custom(function = "not_blank"))]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReading {
    pub user_id: Option<i32>,
    pub device_id: Option<i32>,

    #[validate(custom(function = "not_blank"))]
    pub unit: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub value: Option<String>,
}

impl Entity for Reading {
    type Create = CreateReading;
    type Update = UpdateReading;

    const NAME: &'static str = "Reading";
    const TABLE: &'static str = "readings";
    const COLUMNS: &'static [&'static str] = &["user_id", "device_id", "unit", "value"];
    const SORTABLE: &'static [&'static str] = &["id", "user_id", "device_id"];
    const FILTERS: &'static [FilterSpec] =
        &[FilterSpec::equals("user_id"), FilterSpec::equals("device_id")];
    const UNIQUE: Option<&'static str> = Some("device_id");

    fn id(&self) -> i32 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(self.id.into()),
            "user_id" => Some(self.user_id.into()),
            "device_id" => Some(self.device_id.into()),
            "unit" => Some(self.unit.as_str().into()),
            "value" => Some(self.value.as_str().into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }

    fn build(id: i32, data: &CreateReading, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: data.user_id,
            device_id: data.device_id,
            unit: data.unit.clone(),
            value: data.value.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, data: &UpdateReading, now: DateTime<Utc>) {
        if let Some(user_id) = data.user_id {
            self.user_id = user_id;
        }
        if let Some(device_id) = data.device_id {
            self.device_id = device_id;
        }
        if let Some(unit) = &data.unit {
            self.unit = unit.clone();
        }
        if let Some(value) = &data.value {
            self.value = value.clone();
        }
        self.updated_at = now;
    }

    fn create_values(data: &CreateReading) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("user_id", data.user_id.into()),
            ("device_id", data.device_id.into()),
            ("unit", data.unit.as_str().into()),
            ("value", data.value.as_str().into()),
        ]
    }

    fn update_values(data: &UpdateReading) -> Vec<(&'static str, FieldValue)> {
        let mut values: Vec<(&'static str, FieldValue)> = Vec::new();
        if let Some(user_id) = data.user_id {
            values.push(("user_id", user_id.into()));
        }
        if let Some(device_id) = data.device_id {
            values.push(("device_id", device_id.into()));
        }
        if let Some(unit) = &data.unit {
            values.push(("unit", unit.as_str().into()));
        }
        if let Some(value) = &data.value {
            values.push(("value", value.as_str().into()));
        }
        values
    }
}
