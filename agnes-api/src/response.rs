//! Response envelopes
//!
//! Lists: `{data, meta, status_code}`. Single records: `{data, status_code}`.
//! `status_code` repeats the HTTP status.

use agnes_shared::query::PageMeta;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Single<T> {
    pub data: T,
    pub status_code: u16,
}

impl<T: Serialize> Single<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK.as_u16(),
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::CREATED.as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for Single<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
    pub status_code: u16,
}

impl<T: Serialize> Paginated<T> {
    pub fn ok(data: Vec<T>, meta: PageMeta) -> Self {
        Self {
            data,
            meta,
            status_code: StatusCode::OK.as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
