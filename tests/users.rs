mod common;

use axum::http::StatusCode;
use common::{spawn, ADMIN, USER};
use serde_json::{json, Value};

fn new_user(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "secret12",
        "password_confirm": "secret12",
    })
}

#[tokio::test]
async fn only_admins_list_users() {
    let app = spawn().await;
    let user = app.login(USER).await;
    let admin = app.login(ADMIN).await;

    let (status, _) = app.get("/users", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.get("/users", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "user"]);
    assert!(users[0].get("password").is_none());

    let (_, page) = app.get("/users?skip=1&limit=1", Some(&admin)).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["username"], "user");
}

#[tokio::test]
async fn admin_creates_users_with_role() {
    let app = spawn().await;
    let admin = app.login(ADMIN).await;

    let (status, created) = app.post("/users", Some(&admin), new_user("plain")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role_id"], 2);

    let (status, created) = app
        .post("/users?role_id=1", Some(&admin), new_user("boss"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role_id"], 1);
    app.login(("boss", "secret12")).await;

    let (status, _) = app.post("/users", Some(&admin), new_user("plain")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/users?role_id=99", Some(&admin), new_user("ghost"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn change_role() {
    let app = spawn().await;
    let admin = app.login(ADMIN).await;
    let (_, me) = app.get("/me", Some(&app.login(USER).await)).await;

    let (status, updated) = app
        .patch(&format!("/users/{}/role?role_id=1", me["id"]), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role_id"], 1);

    let (status, _) = app
        .patch("/users/4242/role?role_id=1", Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .patch(&format!("/users/{}/role?role_id=99", me["id"]), Some(&admin), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_user_removes_their_content() {
    let app = spawn().await;
    let admin = app.login(ADMIN).await;
    let doomed = app.register("doomed").await;
    let (_, me) = app.get("/me", Some(&doomed)).await;
    let location = app.create_location(&doomed, "55.7", "37.6").await;

    let survivor = app.login(USER).await;
    let other_location = app.create_location(&survivor, "55.8", "37.7").await;
    let review = app
        .create_review(&doomed, other_location["id"].as_i64().unwrap())
        .await;

    let (status, _) = app.delete(&format!("/users/{}", me["id"]), Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .get(&format!("/locations/{}", location["id"]), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/reviews/{}", review["id"]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, kept) = app
        .get(&format!("/locations/{}", other_location["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kept["reviews"], json!([]));

    let (status, _) = app.delete(&format!("/users/{}", me["id"]), Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
