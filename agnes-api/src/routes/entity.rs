//! Generic CRUD handlers
//!
//! One set of handlers serves every resource. [`Resource`] binds an entity
//! to its repository in [`AppState`] and decides how records are presented:
//! devices and readings carry their parents, the rest serialize as stored.

use std::collections::HashMap;
use std::sync::Arc;

use agnes_shared::entity::Entity;
use agnes_shared::models::{Category, Device, Location, Reading, User};
use agnes_shared::query::ListParams;
use agnes_shared::services::{DeviceDetail, ReadingDetail, ServiceError};
use agnes_shared::store::Repository;
use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiResult;
use crate::response::{Paginated, Single};

#[async_trait]
pub trait Resource: Entity {
    /// Response shape of one record
    type View: Serialize + Send;

    fn repository(state: &AppState) -> Arc<dyn Repository<Self>>;

    async fn present(state: &AppState, records: Vec<Self>) -> Result<Vec<Self::View>, ServiceError>;

    async fn present_one(state: &AppState, record: Self) -> Result<Self::View, ServiceError> {
        Self::present(state, vec![record])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::Internal(format!("{} view missing", Self::NAME)))
    }
}

macro_rules! plain_resource {
    ($entity:ty, $field:ident) => {
        #[async_trait]
        impl Resource for $entity {
            type View = $entity;

            fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
                state.$field.clone()
            }

            async fn present(
                _state: &AppState,
                records: Vec<Self>,
            ) -> Result<Vec<Self::View>, ServiceError> {
                Ok(records)
            }
        }
    };
}

plain_resource!(User, users);
plain_resource!(Category, categories);
plain_resource!(Location, locations);

#[async_trait]
impl Resource for Device {
    type View = DeviceDetail;

    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.devices.clone()
    }

    async fn present(state: &AppState, records: Vec<Self>) -> Result<Vec<DeviceDetail>, ServiceError> {
        state.device_relations().attach(records).await
    }

    async fn present_one(state: &AppState, record: Self) -> Result<DeviceDetail, ServiceError> {
        state.device_relations().attach_one(record).await
    }
}

#[async_trait]
impl Resource for Reading {
    type View = ReadingDetail;

    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.readings.clone()
    }

    async fn present(state: &AppState, records: Vec<Self>) -> Result<Vec<ReadingDetail>, ServiceError> {
        state.reading_relations().attach(records).await
    }

    async fn present_one(state: &AppState, record: Self) -> Result<ReadingDetail, ServiceError> {
        state.reading_relations().attach_one(record).await
    }
}

/// `GET /api/{resource}`
pub async fn list<E: Resource>(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> ApiResult<Paginated<E::View>> {
    let Query(raw) = query?;
    let params = ListParams::from_query(raw);

    let page = state.service::<E>().list(&params).await?;
    let data = E::present(&state, page.items).await?;

    Ok(Paginated::ok(data, page.meta))
}

/// `GET /api/{resource}/:id`
pub async fn read<E: Resource>(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Single<E::View>> {
    let Path(id) = id?;
    let record = state.service::<E>().find(id).await?;
    Ok(Single::ok(E::present_one(&state, record).await?))
}

/// `POST /api/{resource}`, answers 201
pub async fn create<E: Resource>(
    State(state): State<AppState>,
    payload: Result<Json<E::Create>, JsonRejection>,
) -> ApiResult<Single<E::View>> {
    let Json(payload) = payload?;
    let record = state.service::<E>().save(payload).await?;
    Ok(Single::created(E::present_one(&state, record).await?))
}

/// `PUT /api/{resource}/:id`, partial update
pub async fn update<E: Resource>(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<E::Update>, JsonRejection>,
) -> ApiResult<Single<E::View>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let record = state.service::<E>().update(id, payload).await?;
    Ok(Single::ok(E::present_one(&state, record).await?))
}

/// `DELETE /api/{resource}/:id`, returns the removed record
pub async fn delete<E: Resource>(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Single<E::View>> {
    let Path(id) = id?;
    let record = state.service::<E>().delete(id).await?;
    Ok(Single::ok(E::present_one(&state, record).await?))
}
