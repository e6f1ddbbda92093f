mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{login_request, spawn, TestApp, ADMIN, USER};
use serde_json::{json, Value};

/// Logs into the console and returns the session cookie.
async fn console_login(app: &TestApp) -> String {
    let response = app
        .raw(login_request("/admin/login", ADMIN.0, ADMIN.1))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

fn with_cookie(method: Method, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn console_requires_a_session() {
    let app = spawn().await;
    let response = app
        .raw(Request::get("/admin").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/admin/login"
    );

    let response = app
        .raw(Request::get("/admin/login").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&page).contains("<form"));
}

#[tokio::test]
async fn non_admin_cannot_log_in() {
    let app = spawn().await;
    let response = app.raw(login_request("/admin/login", USER.0, USER.1)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .raw(login_request("/admin/login", ADMIN.0, "wrong"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_and_row_views() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, dashboard) = app
        .send(with_cookie(Method::GET, "/admin", &cookie, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    let users = dashboard["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "users")
        .unwrap();
    assert_eq!(users["count"], 2);

    let (status, page) = app
        .send(with_cookie(
            Method::GET,
            "/admin/users?page=0&page_size=1",
            &cookie,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page_size"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["username"], "admin");
    assert!(page["items"][0].get("password").is_none());

    let (status, row) = app
        .send(with_cookie(Method::GET, "/admin/roles/1", &cookie, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(row["role_name"], "admin");

    let (status, _) = app
        .send(with_cookie(Method::GET, "/admin/admin_sessions", &cookie, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generic_create_update_delete() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, created) = app
        .send(with_cookie(
            Method::POST,
            "/admin/seat_types",
            &cookie,
            Some(json!({ "name": "Swing" })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["name"], "Swing");
    let uri = format!("/admin/seat_types/{}", created["id"]);

    let (status, updated) = app
        .send(with_cookie(
            Method::PATCH,
            &uri,
            &cookie,
            Some(json!({ "name": "Porch swing" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Porch swing");
    assert_eq!(updated["id"], created["id"]);

    let (status, _) = app
        .send(with_cookie(Method::DELETE, &uri, &cookie, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(with_cookie(Method::GET, &uri, &cookie, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn console_hashes_user_passwords() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, created) = app
        .send(with_cookie(
            Method::POST,
            "/admin/users",
            &cookie,
            Some(json!({
                "username": "console-made",
                "email": "console@example.com",
                "password": "from-console",
                "role_id": 2,
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert!(created.get("password").is_none());

    app.login(("console-made", "from-console")).await;
}

#[tokio::test]
async fn deleting_role_detaches_users() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, _) = app
        .send(with_cookie(Method::DELETE, "/admin/roles/2", &cookie, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let token = app.login(USER).await;
    let (_, me) = app.get("/me", Some(&token)).await;
    assert_eq!(me["role_id"], Value::Null);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let response = app
        .raw(with_cookie(Method::GET, "/admin/logout", &cookie, None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .raw(with_cookie(Method::GET, "/admin", &cookie, None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn console_user_needs_a_password() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, body) = app
        .send(with_cookie(
            Method::POST,
            "/admin/users",
            &cookie,
            Some(json!({ "username": "x", "email": "x@x" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["detail"][0]["field"], "password");
}

#[tokio::test]
async fn console_checks_coordinates() {
    let app = spawn().await;
    let cookie = console_login(&app).await;
    let row = |cord_x: &str| {
        json!({
            "name": "Console bench",
            "description": "Added by hand",
            "address": "2 Park Lane",
            "type_id": 1,
            "status_id": 1,
            "cord_x": cord_x,
            "cord_y": "37.6",
            "author_id": 1,
        })
    };

    let (status, body) = app
        .send(with_cookie(
            Method::POST,
            "/admin/locations",
            &cookie,
            Some(row("200")),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["detail"][0]["field"], "cord_x");

    let (status, created) = app
        .send(with_cookie(
            Method::POST,
            "/admin/locations",
            &cookie,
            Some(row("55.7")),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");

    let (status, body) = app
        .send(with_cookie(
            Method::PATCH,
            &format!("/admin/locations/{}", created["id"]),
            &cookie,
            Some(json!({ "cord_y": "-181" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["detail"][0]["field"], "cord_y");
}

#[tokio::test]
async fn missing_required_column_is_a_client_error() {
    let app = spawn().await;
    let cookie = console_login(&app).await;

    let (status, body) = app
        .send(with_cookie(
            Method::POST,
            "/admin/seat_types",
            &cookie,
            Some(json!({})),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}
