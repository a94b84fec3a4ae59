/// End-to-end tests for the Agnes REST API
///
/// Every test builds a fresh router over empty in-memory repositories.

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/health-check").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
    assert_eq!(body["status_code"], 200);
    assert_eq!(body["database"], "in-memory");
}

#[tokio::test]
async fn test_create_user_hides_password() {
    let ctx = TestContext::new();
    let (status, body) = ctx
        .send(
            "POST",
            "/api/users",
            Some(json!({"username": "jdoe", "email": "jdoe@example.com", "password": "pw"})),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status_code"], 201);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["username"], "jdoe");
    assert!(body["data"].get("password").is_none());
    assert!(body["data"]["created_at"].is_string());
}

#[tokio::test]
async fn test_list_pages_through_records() {
    let ctx = TestContext::new();
    for n in 1..=10 {
        ctx.create_user(n).await;
    }

    let (status, first) = ctx.get("/api/users?page=1&items_per_page=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status_code"], 200);
    assert_eq!(first["data"].as_array().unwrap().len(), 5);
    assert_eq!(
        first["meta"],
        json!({
            "current_page": 1,
            "last_page": 2,
            "first_item": 1,
            "last_item": 5,
            "items_per_page": 5,
            "total": 10,
        })
    );

    let (_, second) = ctx.get("/api/users?page=2&items_per_page=5").await;
    assert_eq!(second["data"][0]["id"], 6);
    assert_eq!(second["meta"]["first_item"], 6);
    assert_eq!(second["meta"]["last_item"], 10);
}

#[tokio::test]
async fn test_list_sort_and_filter() {
    let ctx = TestContext::new();
    for n in 1..=12 {
        ctx.create_user(n).await;
    }

    let (_, body) = ctx.get("/api/users?sort_by=username&sort_type=desc&items_per_page=3").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["user12", "user11", "user10"]);

    let (_, body) = ctx.get("/api/users?email=user1").await;
    assert_eq!(body["meta"]["total"], 3);
}

#[tokio::test]
async fn test_empty_list() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/categories").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 0);
    assert_eq!(body["meta"]["last_page"], 0);
}

#[tokio::test]
async fn test_invalid_list_parameters() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/api/users?sort_by=password").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");

    let (status, _) = ctx.get("/api/users?sort_type=up").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx.get("/api/users?page=0").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "page");

    let (status, _) = ctx.get("/api/users?items_per_page=abc").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx.get("/api/readings?device_id=seven").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx.get("/api/users?page=abc&sort_by=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let ctx = TestContext::new();
    ctx.create_user(1).await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/users",
            Some(json!({"username": "other", "email": "user01@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = ctx
        .send(
            "POST",
            "/api/users",
            Some(json!({"username": "user01", "email": "fresh@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = ctx.get("/api/users").await;
    assert_eq!(list["meta"]["total"], 1);
}

#[tokio::test]
async fn test_create_validation_errors() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/users",
            Some(json!({"username": "jdoe", "email": "not-an-email", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "email");

    let (status, _) = ctx
        .send("POST", "/api/categories", Some(json!({"name": "only name"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_read_update_delete() {
    let ctx = TestContext::new();
    let id = ctx
        .create("locations", json!({"name": "Attic", "description": "Top floor"}))
        .await;

    let (status, body) = ctx.get(&format!("/api/locations/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Attic");

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/api/locations/{}", id),
            Some(json!({"description": "Loft"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Attic");
    assert_eq!(body["data"]["description"], "Loft");

    let (status, body) = ctx.send("DELETE", &format!("/api/locations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Loft");

    let (status, _) = ctx.get(&format!("/api/locations/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let ctx = TestContext::new();
    ctx.create_user(1).await;

    let (status, body) = ctx
        .send("PUT", "/api/users/99", Some(json!({"username": "ghost"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, list) = ctx.get("/api/users").await;
    assert_eq!(list["data"][0]["username"], "user01");
}

#[tokio::test]
async fn test_non_integer_id_is_bad_request() {
    let ctx = TestContext::new();
    let (status, _) = ctx.get("/api/devices/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bulk_delete_mixed_ids() {
    let ctx = TestContext::new();
    for n in 1..=5 {
        ctx.create_user(n).await;
    }

    let (status, body) = ctx.send("DELETE", "/api/users/2,4,40,99/bulk", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 4]);

    let (_, list) = ctx.get("/api/users").await;
    assert_eq!(list["meta"]["total"], 3);

    let (status, _) = ctx.send("DELETE", "/api/users/1,x/bulk", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_device_nests_category_and_location() {
    let ctx = TestContext::new();
    let category = ctx
        .create("categories", json!({"name": "Sensors", "description": "Environmental"}))
        .await;
    let device = ctx.create_device(category, 77, "Boiler sensor").await;

    let (status, body) = ctx.get(&format!("/api/devices/{}", device)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], 2);
    assert_eq!(body["data"]["category"]["name"], "Sensors");
    assert!(body["data"]["location"].is_null());

    let (status, _) = ctx
        .send(
            "POST",
            "/api/devices",
            Some(json!({
                "category_id": category, "location_id": 1, "name": "dup", "topic": "t",
                "description": "Boiler sensor", "channel": 1, "type": 1,
                "visualization": 1, "message_type": 1,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reading_nests_user_and_device() {
    let ctx = TestContext::new();
    let user = ctx.create_user(1).await;
    let location = ctx
        .create("locations", json!({"name": "Basement", "description": "Boiler room"}))
        .await;
    let device = ctx.create_device(5, location, "Boiler sensor").await;
    ctx.create(
        "readings",
        json!({"user_id": user, "device_id": device, "unit": "C", "value": "21.5"}),
    )
    .await;

    let (status, body) = ctx.get(&format!("/api/readings?device_id={}", device)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let reading = &body["data"][0];
    assert_eq!(reading["value"], "21.5");
    assert_eq!(reading["user"]["username"], "user01");
    assert!(reading["user"].get("password").is_none());
    assert_eq!(reading["device"]["location"]["name"], "Basement");
    assert!(reading["device"]["category"].is_null());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let ctx = TestContext::new();
    let (status, body) = ctx.get("/api/widgets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
