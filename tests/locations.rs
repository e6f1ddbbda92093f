mod common;

use axum::http::StatusCode;
use common::{location_body, review_body, spawn, ADMIN, USER};
use serde_json::{json, Value};

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn create_with_first_review() {
    let app = spawn().await;
    let token = app.login(USER).await;
    let (_, me) = app.get("/me", Some(&token)).await;

    let mut body = location_body("55.7558", "37.6173");
    body["first_review"] = review_body();
    let (status, created) = app.post("/locations", Some(&token), body).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["author_id"], me["id"]);
    assert_eq!(created["type"], 1);
    assert_eq!(created["status"], 1);
    assert_eq!(created["pictures"], json!([]));

    let reviews = created["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rate"], 4);
    assert_eq!(reviews[0]["location_id"], created["id"]);
    assert_eq!(reviews[0]["author_id"], me["id"]);
}

#[tokio::test]
async fn create_requires_token() {
    let app = spawn().await;
    let (status, _) = app
        .post("/locations", None, location_body("55.7558", "37.6173"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_validates_coordinates_and_references() {
    let app = spawn().await;
    let token = app.login(USER).await;

    let (status, body) = app
        .post("/locations", Some(&token), location_body("91", "37.6"))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["field"], "cord_x");

    let mut unknown_type = location_body("55.7", "37.6");
    unknown_type["type"] = json!(999);
    let (status, body) = app.post("/locations", Some(&token), unknown_type).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["field"], "type");

    let mut bad_review = location_body("55.7", "37.6");
    bad_review["first_review"] = review_body();
    bad_review["first_review"]["material_id"] = json!(999);
    let (status, body) = app.post("/locations", Some(&token), bad_review).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["field"], "first_review.material_id");

    let (_, all) = app.get("/locations", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn bounding_box_needs_all_four_bounds() {
    let app = spawn().await;
    let token = app.login(USER).await;
    let moscow = app.create_location(&token, "55.7558", "37.6173").await;
    app.create_location(&token, "59.9343", "30.3351").await;

    let (status, found) = app
        .get(
            "/locations?min_lat=55&max_lat=56&min_lon=37&max_lon=38",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&found), vec![moscow["id"].as_i64().unwrap()]);

    let (_, partial) = app
        .get("/locations?min_lat=55&max_lat=56&min_lon=37", None)
        .await;
    assert_eq!(ids(&partial).len(), 2);
}

#[tokio::test]
async fn filters_by_type_and_status() {
    let app = spawn().await;
    let token = app.login(USER).await;
    let bench = app.create_location(&token, "55.7", "37.6").await;

    let mut gazebo = location_body("55.8", "37.7");
    gazebo["type"] = json!(2);
    gazebo["status"] = json!(2);
    let (_, gazebo) = app.post("/locations", Some(&token), gazebo).await;

    let (_, types) = app.get("/locations?type_id=2", None).await;
    assert_eq!(ids(&types), vec![gazebo["id"].as_i64().unwrap()]);

    let (_, statuses) = app.get("/locations?status_id=1", None).await;
    assert_eq!(ids(&statuses), vec![bench["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn my_locations_only_lists_own() {
    let app = spawn().await;
    let user = app.login(USER).await;
    let other = app.register("neighbour").await;
    let mine = app.create_location(&user, "55.7", "37.6").await;
    app.create_location(&other, "55.8", "37.7").await;

    let (status, found) = app.get("/locations/my", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&found), vec![mine["id"].as_i64().unwrap()]);
}

#[tokio::test]
async fn missing_location_is_not_found() {
    let app = spawn().await;
    let (status, body) = app.get("/locations/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Location not found");
}

#[tokio::test]
async fn only_author_or_admin_may_update() {
    let app = spawn().await;
    let author = app.login(USER).await;
    let stranger = app.register("stranger").await;
    let admin = app.login(ADMIN).await;
    let created = app.create_location(&author, "55.7", "37.6").await;
    let uri = format!("/locations/{}", created["id"]);

    let (status, _) = app
        .patch(&uri, Some(&stranger), json!({ "name": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .patch(&uri, Some(&author), json!({ "name": "Renamed bench" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed bench");
    assert_eq!(updated["address"], "1 Park Lane");

    let (status, updated) = app
        .patch(&uri, Some(&admin), json!({ "status": 3 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], 3);

    let (status, _) = app
        .patch(&uri, Some(&author), json!({ "cord_y": "181" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn empty_update_leaves_row_alone() {
    let app = spawn().await;
    let token = app.login(USER).await;
    let created = app.create_location(&token, "55.7", "37.6").await;

    let (status, same) = app
        .patch(&format!("/locations/{}", created["id"]), Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same["name"], created["name"]);
}

#[tokio::test]
async fn delete_cascades_to_orphaned_reviews() {
    let app = spawn().await;
    let author = app.login(USER).await;
    let stranger = app.register("stranger").await;
    let created = app.create_location(&author, "55.7", "37.6").await;
    let location_id = created["id"].as_i64().unwrap();
    let review = app.create_review(&author, location_id).await;
    let uri = format!("/locations/{location_id}");

    let (status, _) = app.delete(&uri, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&author)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/reviews/{}", review["id"]), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
