/// Shared infrastructure for API integration tests
///
/// Drives the real router over in-memory repositories, so no database is
/// needed.

use agnes_api::app::{build_router, AppState};
use agnes_api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::load(
            &[("database.url", Some("postgresql://unused/agnes".to_string()))],
            false,
        )
        .expect("test config");
        let state = AppState::in_memory(config);
        let app = build_router(state.clone());
        Self { state, app }
    }

    /// Sends one request and returns the status and decoded JSON body.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    /// Creates a resource and returns its id, asserting a 201.
    pub async fn create(&self, collection: &str, body: Value) -> i64 {
        let (status, value) = self.send("POST", &format!("/api/{}", collection), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create {} failed: {}", collection, value);
        value["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_user(&self, n: usize) -> i64 {
        self.create(
            "users",
            json!({
                "username": format!("user{:02}", n),
                "email": format!("user{:02}@example.com", n),
                "password": "s3cret",
            }),
        )
        .await
    }

    pub async fn create_device(&self, category_id: i64, location_id: i64, description: &str) -> i64 {
        self.create(
            "devices",
            json!({
                "category_id": category_id,
                "location_id": location_id,
                "name": "sensor",
                "topic": "home/sensor",
                "description": description,
                "channel": 1,
                "type": 2,
                "visualization": 3,
                "message_type": 4,
            }),
        )
        .await
    }
}
