//! HTTP-level tests for `/api/v1/interventions`.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use coldline_api::auth::jwt::generate_access_token;
use coldline_core::roles::Role;
use common::*;
use serde_json::{json, Value};
use tower::ServiceExt;

const BASE: &str = "/api/v1/interventions";

fn draft() -> Value {
    json!({
        "equipment_category": "negative_cold_room",
        "urgency": "under_4h",
        "description": "Freezer alarm at -12 °C",
        "temperature_reading": -12.0,
        "energy_source": "electricity"
    })
}

async fn create_as(app: &TestApp, user: (i64, Role)) -> Value {
    let response = app
        .request(Method::POST, BASE, Some(user), Some(draft()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Every intervention route requires a bearer token.
#[tokio::test]
async fn missing_token_returns_401() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, BASE, None, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn token_with_unknown_role_returns_401() {
    let app = TestApp::new().await;
    let token = generate_access_token(CLIENT, "janitor", &app.config.jwt).unwrap();
    let request = Request::builder()
        .uri(BASE)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_pending_record() {
    let app = TestApp::new().await;
    let data = create_as(&app, (CLIENT, Role::Client)).await;

    assert_eq!(data["status"], "pending");
    assert_eq!(data["client_id"], CLIENT);
    assert_eq!(data["created_by"], CLIENT);
    assert_eq!(data["urgency"], "under_4h");
    assert_eq!(data["photos"], json!([]));
    assert!(data["technician_id"].is_null());
}

/// A missing required field is a field-level validation error, not a body rejection.
#[tokio::test]
async fn create_without_category_returns_400() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            BASE,
            Some((CLIENT, Role::Client)),
            Some(json!({ "description": "No category" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().starts_with("equipment_category"));
}

/// An explicit `null` still counts as supplying photos.
#[tokio::test]
async fn create_with_null_photos_returns_400() {
    let app = TestApp::new().await;
    let mut body = draft();
    body["photos"] = Value::Null;

    let response = app
        .request(Method::POST, BASE, Some((CLIENT, Role::Client)), Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].as_str().unwrap().starts_with("photos"));
    assert!(app.store.all_tasks().await.is_empty());
}

#[tokio::test]
async fn create_by_user_missing_from_directory_returns_400() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::POST, BASE, Some((99, Role::Client)), Some(draft()))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn create_with_photos_returns_400() {
    let app = TestApp::new().await;
    let mut body = draft();
    body["photos"] = json!(["https://cdn.example.com/a.jpg"]);

    let response = app
        .request(Method::POST, BASE, Some((CLIENT, Role::Client)), Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.all_tasks().await.is_empty());
}

// ---------------------------------------------------------------------------
// Read and list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_populates_references() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}", created["id"]);

    let response = app
        .request(Method::GET, &uri, Some((CLIENT, Role::Client)), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_json(response).await["data"].clone();
    assert_eq!(data["id"], created["id"]);
    assert_eq!(data["client"]["name"], "Cleo Client");
    assert!(data["technician"].is_null());
    assert_eq!(data["equipment"]["code"], "negative_cold_room");
    assert_eq!(data["equipment"]["label"], "Negative cold room");
}

#[tokio::test]
async fn get_by_stranger_returns_403() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}", created["id"]);

    let response = app
        .request(Method::GET, &uri, Some((OTHER_CLIENT, Role::Client)), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_missing_returns_404() {
    let app = TestApp::new().await;
    let response = app
        .request(Method::GET, &format!("{BASE}/999"), Some((ADMIN, Role::Admin)), None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Intervention with id 999 not found");
}

#[tokio::test]
async fn list_filters_by_status_within_scope() {
    let app = TestApp::new().await;
    let first = create_as(&app, (CLIENT, Role::Client)).await;
    create_as(&app, (CLIENT, Role::Client)).await;
    create_as(&app, (OTHER_CLIENT, Role::Client)).await;

    app.request(
        Method::PUT,
        &format!("{BASE}/{}/status", first["id"]),
        Some((ADMIN, Role::Admin)),
        Some(json!({ "status": "confirmed" })),
    )
    .await;

    let response = app
        .request(Method::GET, BASE, Some((CLIENT, Role::Client)), None)
        .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = app
        .request(
            Method::GET,
            &format!("{BASE}?status=confirmed"),
            Some((ADMIN, Role::Admin)),
            None,
        )
        .await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 1);
    assert_eq!(data[0]["id"], first["id"]);

    let response = app
        .request(
            Method::GET,
            &format!("{BASE}?status=archived"),
            Some((ADMIN, Role::Admin)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Update and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_assigns_technician() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}", created["id"]);

    let response = app
        .request(
            Method::PUT,
            &uri,
            Some((ADMIN, Role::Admin)),
            Some(json!({ "technician_id": TECHNICIAN, "urgency": "scheduled" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["technician_id"], TECHNICIAN);
    assert_eq!(data["urgency"], "scheduled");

    let response = app
        .request(Method::GET, &uri, Some((TECHNICIAN, Role::Technician)), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["technician"]["name"], "Tom Tech");
}

#[tokio::test]
async fn update_with_null_clears_technician_and_temperature() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}", created["id"]);
    let admin = Some((ADMIN, Role::Admin));

    let response = app
        .request(Method::PUT, &uri, admin, Some(json!({ "technician_id": TECHNICIAN })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::PUT,
            &uri,
            admin,
            Some(json!({ "technician_id": null, "temperature_reading": null })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert!(data["technician_id"].is_null());
    assert!(data["temperature_reading"].is_null());
    assert_eq!(data["urgency"], "under_4h");

    let response = app
        .request(Method::GET, &uri, Some((TECHNICIAN, Role::Technician)), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_transition_returns_400() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}/status", created["id"]);
    let admin = Some((ADMIN, Role::Admin));

    let response = app
        .request(Method::PUT, &uri, admin, Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(Method::PUT, &uri, admin, Some(json!({ "status": "in_progress" })))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn status_change_queues_client_notification() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;

    let response = app
        .request(
            Method::PUT,
            &format!("{BASE}/{}/status", created["id"]),
            Some((ADMIN, Role::Admin)),
            Some(json!({ "status": "in_progress" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    app.drain_outbox().await;

    let notes = app.store.all_notifications().await;
    let to_client: Vec<_> = notes.iter().filter(|n| n.recipient_id == CLIENT).collect();
    assert_eq!(to_client.len(), 1);
    assert_eq!(to_client[0].kind, "STATUS_CHANGED");
    assert_eq!(to_client[0].payload["to"], "in_progress");
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_requires_admin() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let uri = format!("{BASE}/{}", created["id"]);

    let response = app
        .request(Method::DELETE, &uri, Some((CLIENT, Role::Client)), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::DELETE, &uri, Some((ADMIN, Role::Admin)), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, &uri, Some((ADMIN, Role::Admin)), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Non-admins learn nothing about which ids exist.
#[tokio::test]
async fn delete_missing_as_non_admin_returns_403() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::DELETE,
            &format!("{BASE}/999"),
            Some((TECHNICIAN, Role::Technician)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_appends_photo_references() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .upload_photos(
            id,
            (CLIENT, Role::Client),
            &[("image/png", PNG_BYTES), ("image/png", PNG_BYTES)],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let photos = body_json(response).await["data"]["photos"].clone();
    let photos = photos.as_array().unwrap();
    assert_eq!(photos.len(), 2);
    let prefix = format!("/media/photos/{id}/");
    assert!(photos.iter().all(|p| p.as_str().unwrap().starts_with(&prefix)));
}

#[tokio::test]
async fn upload_past_cap_returns_400_and_keeps_existing() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let id = created["id"].as_i64().unwrap();
    let client = (CLIENT, Role::Client);

    app.upload_photos(id, client, &[("image/png", PNG_BYTES), ("image/png", PNG_BYTES)])
        .await;
    let response = app
        .upload_photos(id, client, &[("image/png", PNG_BYTES), ("image/png", PNG_BYTES)])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, &format!("{BASE}/{id}"), Some(client), None)
        .await;
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["photos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn upload_rejects_non_image_files() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .upload_photos(id, (CLIENT, Role::Client), &[("application/pdf", &b"%PDF-1.7"[..])])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload_photos(id, (CLIENT, Role::Client), &[("image/jpeg", PNG_BYTES)])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_by_stranger_returns_403() {
    let app = TestApp::new().await;
    let created = create_as(&app, (CLIENT, Role::Client)).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .upload_photos(id, (OTHER_CLIENT, Role::Client), &[("image/png", PNG_BYTES)])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
