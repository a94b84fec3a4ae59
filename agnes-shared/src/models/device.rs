/// Device model
///
/// A device is a physical sensor or actuator publishing on an MQTT `topic`.
/// It belongs to one category and one location (by id, unenforced) and is
/// identified to operators by its `description`, which must be unique.
///
/// The integer columns `channel`, `type`, `visualization` and `message_type`
/// are opaque codes interpreted by the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::entity::{Entity, FieldValue, FilterSpec};
use crate::validation::not_blank;

/// Device record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Device {
    pub id: i32,
    pub category_id: i32,
    pub location_id: i32,
    pub name: String,
    pub topic: String,
    pub description: String,
    pub channel: i32,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub device_type: i32,

    pub visualization: i32,
    pub message_type: i32,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "super::timestamp::serialize")]
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a device
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDevice {
    pub category_id: i32,
    pub location_id: i32,

    #[validate(custom(function = "not_blank"))]
    pub name: String,

    #[validate(custom(function = "not_blank"))]
    pub topic: String,

    #[validate(custom(function = "not_blank"))]
    pub description: String,

    pub channel: i32,

    #[serde(rename = "type")]
    pub device_type: i32,

    pub visualization: i32,
    pub message_type: i32,
}

/// Input for updating a device. Only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDevice {
    pub category_id: Option<i32>,
    pub location_id: Option<i32>,

    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub topic: Option<String>,

    #[validate(custom(function = "not_blank"))]
    pub description: Option<String>,

    pub channel: Option<i32>,

    #[serde(rename = "type")]
    pub device_type: Option<i32>,

    pub visualization: Option<i32>,
    pub message_type: Option<i32>,
}

impl Entity for Device {
    type Create = CreateDevice;
    type Update = UpdateDevice;

    const NAME: &'static str = "Device";
    const TABLE: &'static str = "devices";
    const COLUMNS: &'static [&'static str] = &[
        "category_id",
        "location_id",
        "name",
        "topic",
        "description",
        "channel",
        "type",
        "visualization",
        "message_type",
    ];
    const SORTABLE: &'static [&'static str] = &["id", "name", "description"];
    const FILTERS: &'static [FilterSpec] =
        &[FilterSpec::contains("name"), FilterSpec::contains("description")];
    const UNIQUE: Option<&'static str> = Some("description");

    fn id(&self) -> i32 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, column: &str) -> Option<FieldValue> {
        match column {
            "id" => Some(self.id.into()),
            "category_id" => Some(self.category_id.into()),
            "location_id" => Some(self.location_id.into()),
            "name" => Some(self.name.as_str().into()),
            "topic" => Some(self.topic.as_str().into()),
            "description" => Some(self.description.as_str().into()),
            "channel" => Some(self.channel.into()),
            "type" => Some(self.device_type.into()),
            "visualization" => Some(self.visualization.into()),
            "message_type" => Some(self.message_type.into()),
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            _ => None,
        }
    }

    fn build(id: i32, data: &CreateDevice, now: DateTime<Utc>) -> Self {
        Self {
            id,
            category_id: data.category_id,
            location_id: data.location_id,
            name: data.name.clone(),
            topic: data.topic.clone(),
            description: data.description.clone(),
            channel: data.channel,
            device_type: data.device_type,
            visualization: data.visualization,
            message_type: data.message_type,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, data: &UpdateDevice, now: DateTime<Utc>) {
        if let Some(category_id) = data.category_id {
            self.category_id = category_id;
        }
        if let Some(location_id) = data.location_id {
            self.location_id = location_id;
        }
        if let Some(name) = &data.name {
            self.name = name.clone();
        }
        if let Some(topic) = &data.topic {
            self.topic = topic.clone();
        }
        if let Some(description) = &data.description {
            self.description = description.clone();
        }
        if let Some(channel) = data.channel {
            self.channel = channel;
        }
        if let Some(device_type) = data.device_type {
            self.device_type = device_type;
        }
        if let Some(visualization) = data.visualization {
            self.visualization = visualization;
        }
        if let Some(message_type) = data.message_type {
            self.message_type = message_type;
        }
        self.updated_at = now;
    }

    fn create_values(data: &CreateDevice) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("category_id", data.category_id.into()),
            ("location_id", data.location_id.into()),
            ("name", data.name.as_str().into()),
            ("topic", data.topic.as_str().into()),
            ("description", data.description.as_str().into()),
            ("channel", data.channel.into()),
            ("type", data.device_type.into()),
            ("visualization", data.visualization.into()),
            ("message_type", data.message_type.into()),
        ]
    }

    fn update_values(data: &UpdateDevice) -> Vec<(&'static str, FieldValue)> {
        let mut values: Vec<(&'static str, FieldValue)> = Vec::new();
        if let Some(category_id) = data.category_id {
            values.push(("category_id", category_id.into()));
        }
        if let Some(location_id) = data.location_id {
            values.push(("location_id", location_id.into()));
        }
        if let Some(name) = &data.name {
            values.push(("name", name.as_str().into()));
        }
        if let Some(topic) = &data.topic {
            values.push(("topic", topic.as_str().into()));
        }
        if let Some(description) = &data.description {
            values.push(("description", description.as_str().into()));
        }
        if let Some(channel) = data.channel {
            values.push(("channel", channel.into()));
        }
        if let Some(device_type) = data.device_type {
            values.push(("type", device_type.into()));
        }
        if let Some(visualization) = data.visualization {
            values.push(("visualization", visualization.into()));
        }
        if let Some(message_type) = data.message_type {
            values.push(("message_type", message_type.into()));
        }
        values
    }
}
