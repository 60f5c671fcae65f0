use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use todo_api::Database;
use todo_api::api::{AppState, router};
use todo_api::config::PaginationConfig;

fn app() -> Router {
    let db = Database::open_in_memory().unwrap();
    router(AppState::new(db, PaginationConfig::default()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, todo) = send(app, Method::POST, "/api/todos", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    todo
}

#[tokio::test]
async fn health_reports_up() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP" }));
}

#[tokio::test]
async fn create_applies_defaults() {
    let app = app();
    let todo = create(&app, json!({ "title": "Buy milk" })).await;
    assert_eq!(todo["title"], "Buy milk");
    assert_eq!(todo["completed"], false);
    assert_eq!(todo["priority"], "MEDIUM");
    assert_eq!(todo["description"], Value::Null);
    assert!(todo["id"].as_i64().unwrap() > 0);
    assert!(todo["createdAt"].is_string());
    assert_eq!(todo["createdAt"], todo["updatedAt"]);
}

#[tokio::test]
async fn create_rejects_empty_title_with_envelope() {
    let (status, body) = send(&app(), Method::POST, "/api/todos", Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["path"], "/api/todos");
    assert!(body["message"].as_str().unwrap().contains("Title must not be empty!"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/todos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], 400);
    assert_eq!(body["path"], "/api/todos");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/todos",
        Some(json!({ "title": "x", "priority": "URGENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_missing_todo_is_not_found() {
    let (status, body) = send(&app(), Method::GET, "/api/todos/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["message"], "Todo with id: 42 not found");
    assert_eq!(body["path"], "/api/todos/42");
}

#[tokio::test]
async fn unknown_route_and_bad_id_use_envelope() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/nothing");

    let (status, body) = send(&app, Method::GET, "/api/todos/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn update_is_partial_and_rejects_blank_title() {
    let app = app();
    let todo = create(&app, json!({ "title": "Draft", "description": "first" })).await;
    let id = todo["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/todos/{id}"),
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Title must not be empty!");

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/todos/{id}"),
        Some(json!({ "priority": "HIGH" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Draft");
    assert_eq!(updated["description"], "first");
    assert_eq!(updated["priority"], "HIGH");
    assert_ne!(updated["updatedAt"], todo["updatedAt"]);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/todos/999",
        Some(json!({ "title": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn toggle_flips_and_delete_returns_prior_state() {
    let app = app();
    let id = create(&app, json!({ "title": "Flip me" })).await["id"].as_i64().unwrap();

    let (status, toggled) = send(&app, Method::PATCH, &format!("/api/todos/{id}/toggle"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);

    let (status, deleted) = send(&app, Method::DELETE, &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["completed"], true);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/todos/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PATCH, "/api/todos/77/toggle", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_pages_through_results() {
    let app = app();
    for i in 1..=5 {
        create(&app, json!({ "title": format!("Task {i}") })).await;
    }

    let (status, page) = send(&app, Method::GET, "/api/todos?page=2&size=2&sort=id,asc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["content"].as_array().unwrap().len(), 1);
    assert_eq!(page["content"][0]["title"], "Task 5");
    assert_eq!(page["number"], 2);
    assert_eq!(page["size"], 2);
    assert_eq!(page["totalElements"], 5);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["numberOfElements"], 1);
    assert_eq!(page["first"], false);
    assert_eq!(page["last"], true);
    assert_eq!(page["empty"], false);

    let (_, beyond) = send(&app, Method::GET, "/api/todos?page=10&size=2", None).await;
    assert_eq!(beyond["empty"], true);
    assert_eq!(beyond["totalElements"], 5);
}

#[tokio::test]
async fn huge_page_index_is_an_empty_last_page() {
    let app = app();
    create(&app, json!({ "title": "Task 1" })).await;

    let (status, page) = send(
        &app,
        Method::GET,
        "/api/todos?page=9223372036854775807&size=20",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["content"], json!([]));
    assert_eq!(page["number"], 9223372036854775807u64);
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["empty"], true);
    assert_eq!(page["last"], true);
}

#[tokio::test]
async fn listing_filters_and_sorts() {
    let app = app();
    create(&app, json!({ "title": "Write report", "priority": "HIGH" })).await;
    create(&app, json!({ "title": "Review REPORT draft", "priority": "LOW", "completed": true })).await;
    create(&app, json!({ "title": "Buy 100% cotton", "priority": "HIGH" })).await;

    let (_, page) = send(&app, Method::GET, "/api/todos?subtitle=report", None).await;
    assert_eq!(page["totalElements"], 2);

    let (_, page) = send(&app, Method::GET, "/api/todos?subtitle=report&completed=false", None).await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["content"][0]["title"], "Write report");

    let (_, page) = send(&app, Method::GET, "/api/todos?subtitle=100%25", None).await;
    assert_eq!(page["totalElements"], 1);

    let (_, page) = send(&app, Method::GET, "/api/todos?priority=high&sort=title,desc", None).await;
    let titles: Vec<_> = page["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Write report", "Buy 100% cotton"]);

    let (status, body) = send(&app, Method::GET, "/api/todos?priority=INVALID", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["path"], "/api/todos");

    let (status, _) = send(&app, Method::GET, "/api/todos?sort=owner,asc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_delete_is_all_or_nothing() {
    let app = app();
    let first = create(&app, json!({ "title": "one" })).await["id"].as_i64().unwrap();
    let second = create(&app, json!({ "title": "two" })).await["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/todos/bulk?ids={first},999"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Todo with id: 999 not found");
    let (status, _) = send(&app, Method::GET, &format!("/api/todos/{first}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/todos/bulk?ids={first}&ids={second}&ids={first}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "deleted": 2 }));

    let (_, page) = send(&app, Method::GET, "/api/todos", None).await;
    assert_eq!(page["totalElements"], 0);
}

#[tokio::test]
async fn bulk_delete_requires_ids() {
    let app = app();
    let (status, body) = send(&app, Method::DELETE, "/api/todos/bulk?ids=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Ids list must not be empty");

    let (status, _) = send(&app, Method::DELETE, "/api/todos/bulk", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, "/api/todos/bulk?ids=1,two", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_update_coalesces_fields() {
    let app = app();
    let a = create(&app, json!({ "title": "a", "priority": "LOW" })).await["id"].as_i64().unwrap();
    let b = create(&app, json!({ "title": "b", "priority": "HIGH", "completed": true }))
        .await["id"]
        .as_i64()
        .unwrap();

    let (status, updated) = send(
        &app,
        Method::PATCH,
        "/api/todos/bulk",
        Some(json!({ "ids": [b, a], "completed": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = updated.as_array().unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(updated[0]["id"], b);
    assert_eq!(updated[0]["priority"], "HIGH");
    assert_eq!(updated[1]["priority"], "LOW");
    assert!(updated.iter().all(|t| t["completed"] == false));

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/todos/bulk",
        Some(json!({ "ids": [a, 404], "priority": "HIGH" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, unchanged) = send(&app, Method::GET, &format!("/api/todos/{a}"), None).await;
    assert_eq!(unchanged["priority"], "LOW");

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/todos/bulk",
        Some(json!({ "ids": [], "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tag_crud() {
    let app = app();
    let (status, tag) = send(&app, Method::POST, "/api/tags", Some(json!({ "name": "work" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = tag["id"].as_i64().unwrap();
    assert_eq!(tag["name"], "work");

    let (status, body) = send(&app, Method::POST, "/api/tags", Some(json!({ "name": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Tag name cannot be blank"));

    let (_, tags) = send(&app, Method::GET, "/api/tags", None).await;
    assert_eq!(tags.as_array().unwrap().len(), 1);

    let (status, fetched) = send(&app, Method::GET, &format!("/api/tags/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "work");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/tags/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, &format!("/api/tags/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("No tag with id {id} not found"));
}

#[tokio::test]
async fn wrong_method_keeps_allow_header() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(response.headers().contains_key(header::ALLOW));
}
