use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use super::ensure_reference;
use crate::auth::{ensure_author_or_admin, CurrentUser};
use crate::cascade;
use crate::entity::{condition, location_review, location_seat, material, pollution, review};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{ReviewCreate, ReviewFields, ReviewResponse, ReviewUpdate, ValidJson};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(list_reviews).post(create_review))
        .route(
            "/reviews/{id}",
            get(get_review).patch(update_review).delete(delete_review),
        )
}

#[derive(Debug, Deserialize)]
pub struct ReviewFilter {
    pub location_id: Option<i32>,
}

/// Checks the dictionary ids a review points at.
pub(crate) async fn ensure_review_references<C>(
    db: &C,
    pollution_id: Option<i32>,
    condition_id: Option<i32>,
    material_id: Option<i32>,
    prefix: &str,
) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    if let Some(id) = pollution_id {
        ensure_reference::<pollution::Entity, _>(db, id, &format!("{prefix}pollution_id")).await?;
    }
    if let Some(id) = condition_id {
        ensure_reference::<condition::Entity, _>(db, id, &format!("{prefix}condition_id")).await?;
    }
    if let Some(id) = material_id {
        ensure_reference::<material::Entity, _>(db, id, &format!("{prefix}material_id")).await?;
    }
    Ok(())
}

/// Inserts a review by `author_id` and links it to `location_id`.
pub(crate) async fn insert_review<C>(
    conn: &C,
    fields: ReviewFields,
    author_id: i32,
    location_id: i32,
) -> ApiResult<review::Model>
where
    C: ConnectionTrait,
{
    let created = review::ActiveModel {
        rate: Set(fields.rate),
        pollution_id: Set(fields.pollution_id),
        condition_id: Set(fields.condition_id),
        material_id: Set(fields.material_id),
        seating_positions: Set(fields.seating_positions),
        author_id: Set(author_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    location_review::ActiveModel {
        location_id: Set(location_id),
        review_id: Set(created.id),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(created)
}

/// First location a review is linked to.
async fn linked_location<C>(db: &C, review_id: i32) -> ApiResult<Option<i32>>
where
    C: ConnectionTrait,
{
    Ok(location_review::Entity::find()
        .filter(location_review::Column::ReviewId.eq(review_id))
        .order_by_asc(location_review::Column::Id)
        .one(db)
        .await?
        .map(|link| link.location_id))
}

/// First linked location of every review in `reviews`, in one query.
async fn first_linked_locations<C>(
    db: &C,
    reviews: &[review::Model],
) -> ApiResult<HashMap<i32, i32>>
where
    C: ConnectionTrait,
{
    if reviews.is_empty() {
        return Ok(HashMap::new());
    }
    let links = location_review::Entity::find()
        .filter(location_review::Column::ReviewId.is_in(reviews.iter().map(|r| r.id)))
        .order_by_asc(location_review::Column::Id)
        .all(db)
        .await?;

    let mut first = HashMap::with_capacity(reviews.len());
    for link in links {
        first.entry(link.review_id).or_insert(link.location_id);
    }
    Ok(first)
}

async fn create_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(body): ValidJson<ReviewCreate>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    let (fields, location_id) = body.split();
    let location = location_seat::Entity::find_by_id(location_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("Location with id {location_id} not found"))
        })?;

    ensure_review_references(
        &state.db,
        Some(fields.pollution_id),
        Some(fields.condition_id),
        Some(fields.material_id),
        "",
    )
    .await?;

    let txn = state.db.begin().await?;
    let created = insert_review(&txn, fields, user.id, location.id).await?;
    txn.commit().await?;

    info!(review_id = created.id, location_id = location.id, "review created");
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse::new(created, Some(location.id))),
    ))
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(filter): Query<ReviewFilter>,
) -> ApiResult<Json<Vec<ReviewResponse>>> {
    let Some(location_id) = filter.location_id else {
        let reviews = review::Entity::find()
            .order_by_asc(review::Column::Id)
            .all(&state.db)
            .await?;
        let mut first_links = first_linked_locations(&state.db, &reviews).await?;
        let responses = reviews
            .into_iter()
            .map(|model| {
                let location_id = first_links.remove(&model.id);
                ReviewResponse::new(model, location_id)
            })
            .collect();
        return Ok(Json(responses));
    };

    if location_seat::Entity::find_by_id(location_id)
        .one(&state.db)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Location not found"));
    }

    let rows = review::Entity::find()
        .inner_join(location_review::Entity)
        .filter(location_review::Column::LocationId.eq(location_id))
        .order_by_asc(review::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|model| ReviewResponse::new(model, Some(location_id)))
            .collect(),
    ))
}

async fn find_review(state: &AppState, id: i32) -> ApiResult<review::Model> {
    review::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))
}

async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ReviewResponse>> {
    let model = find_review(&state, id).await?;
    let location_id = linked_location(&state.db, id).await?;
    Ok(Json(ReviewResponse::new(model, location_id)))
}

async fn update_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    ValidJson(body): ValidJson<ReviewUpdate>,
) -> ApiResult<Json<ReviewResponse>> {
    let model = find_review(&state, id).await?;
    ensure_author_or_admin(&user, model.author_id, "review")?;
    ensure_review_references(
        &state.db,
        body.pollution_id,
        body.condition_id,
        body.material_id,
        "",
    )
    .await?;

    let mut active = model.clone().into_active_model();
    if let Some(rate) = body.rate {
        active.rate = Set(rate);
    }
    if let Some(pollution_id) = body.pollution_id {
        active.pollution_id = Set(pollution_id);
    }
    if let Some(condition_id) = body.condition_id {
        active.condition_id = Set(condition_id);
    }
    if let Some(material_id) = body.material_id {
        active.material_id = Set(material_id);
    }
    if let Some(seating_positions) = body.seating_positions {
        active.seating_positions = Set(seating_positions);
    }
    let updated = if active.is_changed() {
        active.update(&state.db).await?
    } else {
        model
    };

    info!(review_id = id, "review updated");
    let location_id = linked_location(&state.db, id).await?;
    Ok(Json(ReviewResponse::new(updated, location_id)))
}

async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let model = find_review(&state, id).await?;
    ensure_author_or_admin(&user, model.author_id, "review")?;

    let txn = state.db.begin().await?;
    cascade::delete_review(&txn, id).await?;
    txn.commit().await?;

    info!(review_id = id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}
