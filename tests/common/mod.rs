#![allow(dead_code)]

use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use seatmap::migration::{Migrator, MigratorTrait};
use seatmap::{router, seed, AppState, Settings};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("admin", "admin123");
pub const USER: (&str, &str) = ("user", "user123");

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub db: DatabaseConnection,
    pub upload_dir: TempDir,
}

/// A migrated and seeded in-memory database behind the full router.
pub async fn spawn() -> TestApp {
    spawn_with(&[]).await
}

/// Like [`spawn`], with extra environment settings layered on top.
pub async fn spawn_with(overrides: &[(&str, &str)]) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();

    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    seed::seed_all(&db, 4).await.unwrap();

    let mut vars = HashMap::from([
        ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ("SECRET_KEY".to_string(), "test-secret".to_string()),
        ("BCRYPT_COST".to_string(), "4".to_string()),
        (
            "UPLOAD_DIR".to_string(),
            upload_dir.path().display().to_string(),
        ),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    let settings = Settings::from_map(&vars).unwrap();

    let state = AppState::new(db.clone(), settings);
    TestApp {
        app: router(state.clone()),
        state,
        db,
        upload_dir,
    }
}

impl TestApp {
    pub async fn raw(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Sends `request` and returns the status with the body parsed as JSON
    /// (`Null` for an empty body).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.raw(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::POST, uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(Method::PATCH, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::DELETE, uri, token, None)).await
    }

    /// Form login against `/login`, returning the access token.
    pub async fn login(&self, (username, password): (&str, &str)) -> String {
        let (status, body) = self.send(login_request("/login", username, password)).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Registers a fresh account and returns its token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "strongpassword123",
                    "password_confirm": "strongpassword123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Creates a location near the given coordinates and returns its JSON.
    pub async fn create_location(&self, token: &str, cord_x: &str, cord_y: &str) -> Value {
        let (status, body) = self
            .post("/locations", Some(token), location_body(cord_x, cord_y))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create location failed: {body}");
        body
    }

    pub async fn create_review(&self, token: &str, location_id: i64) -> Value {
        let mut body = review_body();
        body["location_id"] = json!(location_id);
        let (status, body) = self.post("/reviews", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "create review failed: {body}");
        body
    }
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn login_request(uri: &str, username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

pub fn location_body(cord_x: &str, cord_y: &str) -> Value {
    json!({
        "name": "Bench by the pond",
        "description": "Shaded, two seats, near the playground",
        "address": "1 Park Lane",
        "type": 1,
        "status": 1,
        "cord_x": cord_x,
        "cord_y": cord_y,
    })
}

pub fn review_body() -> Value {
    json!({
        "rate": 4,
        "pollution_id": 1,
        "condition_id": 2,
        "material_id": 1,
        "seating_positions": 3,
    })
}
