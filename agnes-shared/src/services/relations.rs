//! Nested relations for device and reading responses
//!
//! Parents are looked up in one batch per parent table. References are not
//! enforced, so a parent may be missing; it then serializes as `null`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use super::{store_error, ServiceError};
use crate::entity::Entity;
use crate::models::{Category, Device, Location, Reading, User};
use crate::store::Repository;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub category: Option<Category>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingDetail {
    #[serde(flatten)]
    pub reading: Reading,
    pub user: Option<User>,
    pub device: Option<DeviceDetail>,
}

async fn load<E: Entity>(
    repo: &dyn Repository<E>,
    ids: impl Iterator<Item = i32>,
) -> Result<HashMap<i32, E>, ServiceError> {
    let ids: Vec<i32> = ids.collect::<BTreeSet<_>>().into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let records = repo.find_many(&ids).await.map_err(store_error::<E>)?;
    Ok(records.into_iter().map(|r| (r.id(), r)).collect())
}

#[derive(Clone)]
pub struct DeviceRelations {
    categories: Arc<dyn Repository<Category>>,
    locations: Arc<dyn Repository<Location>>,
}

impl DeviceRelations {
    pub fn new(
        categories: Arc<dyn Repository<Category>>,
        locations: Arc<dyn Repository<Location>>,
    ) -> Self {
        Self {
            categories,
            locations,
        }
    }

    pub async fn attach(&self, devices: Vec<Device>) -> Result<Vec<DeviceDetail>, ServiceError> {
        let categories = load(
            self.categories.as_ref(),
            devices.iter().map(|d| d.category_id),
        )
        .await?;
        let locations = load(
            self.locations.as_ref(),
            devices.iter().map(|d| d.location_id),
        )
        .await?;

        Ok(devices
            .into_iter()
            .map(|device| DeviceDetail {
                category: categories.get(&device.category_id).cloned(),
                location: locations.get(&device.location_id).cloned(),
                device,
            })
            .collect())
    }

    pub async fn attach_one(&self, device: Device) -> Result<DeviceDetail, ServiceError> {
        let mut details = self.attach(vec![device]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::Internal("device detail missing".to_string()))
    }
}

#[derive(Clone)]
pub struct ReadingRelations {
    users: Arc<dyn Repository<User>>,
    devices: Arc<dyn Repository<Device>>,
    device_relations: DeviceRelations,
}

impl ReadingRelations {
    pub fn new(
        users: Arc<dyn Repository<User>>,
        devices: Arc<dyn Repository<Device>>,
        device_relations: DeviceRelations,
    ) -> Self {
        Self {
            users,
            devices,
            device_relations,
        }
    }

    pub async fn attach(&self, readings: Vec<Reading>) -> Result<Vec<ReadingDetail>, ServiceError> {
        let users = load(self.users.as_ref(), readings.iter().map(|r| r.user_id)).await?;
        let devices = load(self.devices.as_ref(), readings.iter().map(|r| r.device_id)).await?;

        let devices: HashMap<i32, DeviceDetail> = self
            .device_relations
            .attach(devices.into_values().collect())
            .await?
            .into_iter()
            .map(|detail| (detail.device.id, detail))
            .collect();

        Ok(readings
            .into_iter()
            .map(|reading| ReadingDetail {
                user: users.get(&reading.user_id).cloned(),
                device: devices.get(&reading.device_id).cloned(),
                reading,
            })
            .collect())
    }

    pub async fn attach_one(&self, reading: Reading) -> Result<ReadingDetail, ServiceError> {
        let mut details = self.attach(vec![reading]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::Internal("reading detail missing".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCategory, CreateDevice, CreateReading, CreateUser};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn relations() -> ReadingRelations {
        let now = Utc::now();
        let categories = MemoryStore::with_records([Category::build(
            1,
            &CreateCategory {
                name: "Sensors".to_string(),
                description: "Environmental".to_string(),
            },
            now,
        )]);
        let devices = MemoryStore::with_records([Device::build(
            5,
            &CreateDevice {
                category_id: 1,
                location_id: 77,
                name: "sensor".to_string(),
                topic: "home/sensor".to_string(),
                description: "Boiler sensor".to_string(),
                channel: 1,
                device_type: 2,
                visualization: 3,
                message_type: 4,
            },
            now,
        )]);
        let users = MemoryStore::with_records([User::build(
            3,
            &CreateUser {
                username: "jdoe".to_string(),
                email: "jdoe@example.com".to_string(),
                password: "hash".to_string(),
            },
            now,
        )]);

        ReadingRelations::new(
            Arc::new(users),
            Arc::new(devices),
            DeviceRelations::new(Arc::new(categories), Arc::new(MemoryStore::<Location>::new())),
        )
    }

    fn reading(id: i32, user_id: i32, device_id: i32) -> Reading {
        Reading::build(
            id,
            &CreateReading {
                user_id,
                device_id,
                unit: "C".to_string(),
                value: "21.5".to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_attach_nests_parents() {
        let detail = relations().attach_one(reading(1, 3, 5)).await.unwrap();
        assert_eq!(detail.user.as_ref().map(|u| u.id), Some(3));
        let device = detail.device.as_ref().unwrap();
        assert_eq!(device.device.id, 5);
        assert_eq!(device.category.as_ref().map(|c| c.name.as_str()), Some("Sensors"));
        assert!(device.location.is_none());

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["value"], "21.5");
        assert_eq!(json["user"]["username"], "jdoe");
        assert!(json["user"].get("password").is_none());
        assert_eq!(json["device"]["type"], 2);
        assert_eq!(json["device"]["category"]["id"], 1);
        assert!(json["device"]["location"].is_null());
    }

    #[tokio::test]
    async fn test_missing_parents_are_null() {
        let details = relations()
            .attach(vec![reading(1, 3, 5), reading(2, 404, 500)])
            .await
            .unwrap();
        assert_eq!(details.len(), 2);
        assert!(details[1].user.is_none());
        assert!(details[1].device.is_none());
        assert_eq!(details[0].reading.id, 1);
    }
}
