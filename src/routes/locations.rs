use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::{ensure_reference, reviews};
use crate::auth::{ensure_author_or_admin, CurrentUser};
use crate::cascade;
use crate::entity::{location_review, location_seat, picture, review, seat_type, status};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{
    LocationSeatCreate, LocationSeatResponse, LocationSeatUpdate, PictureResponse,
    ReviewResponse, ValidJson,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route("/locations/my", get(my_locations))
        .route(
            "/locations/{id}",
            get(get_location)
                .patch(update_location)
                .delete(delete_location),
        )
}

/// Query of `GET /locations`. The bounding box only applies when all four
/// bounds are present.
#[derive(Debug, Default, Deserialize)]
pub struct LocationFilter {
    pub min_lat: Option<Decimal>,
    pub max_lat: Option<Decimal>,
    pub min_lon: Option<Decimal>,
    pub max_lon: Option<Decimal>,
    pub type_id: Option<i32>,
    pub status_id: Option<i32>,
}

impl LocationFilter {
    fn apply(&self, mut query: Select<location_seat::Entity>) -> Select<location_seat::Entity> {
        if let (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) =
            (self.min_lat, self.max_lat, self.min_lon, self.max_lon)
        {
            query = query
                .filter(location_seat::Column::CordX.between(min_lat, max_lat))
                .filter(location_seat::Column::CordY.between(min_lon, max_lon));
        }
        if let Some(type_id) = self.type_id {
            query = query.filter(location_seat::Column::TypeId.eq(type_id));
        }
        if let Some(status_id) = self.status_id {
            query = query.filter(location_seat::Column::StatusId.eq(status_id));
        }
        query
    }
}

/// Attaches reviews and pictures to each location with three batched
/// queries.
pub(crate) async fn with_details<C>(
    db: &C,
    locations: Vec<location_seat::Model>,
) -> ApiResult<Vec<LocationSeatResponse>>
where
    C: ConnectionTrait,
{
    if locations.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = locations.iter().map(|location| location.id).collect();

    let links = location_review::Entity::find()
        .filter(location_review::Column::LocationId.is_in(ids.clone()))
        .order_by_asc(location_review::Column::Id)
        .all(db)
        .await?;
    let review_ids: Vec<i32> = links.iter().map(|link| link.review_id).collect();
    let reviews_by_id: HashMap<i32, review::Model> = if review_ids.is_empty() {
        HashMap::new()
    } else {
        review::Entity::find()
            .filter(review::Column::Id.is_in(review_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model))
            .collect()
    };

    let mut reviews: HashMap<i32, Vec<ReviewResponse>> = HashMap::new();
    for link in links {
        if let Some(model) = reviews_by_id.get(&link.review_id) {
            reviews
                .entry(link.location_id)
                .or_default()
                .push(ReviewResponse::new(model.clone(), Some(link.location_id)));
        }
    }

    let mut pictures: HashMap<i32, Vec<PictureResponse>> = HashMap::new();
    for model in picture::Entity::find()
        .filter(picture::Column::LocationId.is_in(ids))
        .order_by_asc(picture::Column::Id)
        .all(db)
        .await?
    {
        pictures
            .entry(model.location_id)
            .or_default()
            .push(model.into());
    }

    Ok(locations
        .into_iter()
        .map(|location| {
            let id = location.id;
            LocationSeatResponse::new(
                location,
                reviews.remove(&id).unwrap_or_default(),
                pictures.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

async fn single_with_details<C>(
    db: &C,
    location: location_seat::Model,
) -> ApiResult<LocationSeatResponse>
where
    C: ConnectionTrait,
{
    with_details(db, vec![location])
        .await?
        .pop()
        .ok_or_else(|| ApiError::internal("location vanished while loading details"))
}

async fn find_location(state: &AppState, id: i32) -> ApiResult<location_seat::Model> {
    location_seat::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Location not found"))
}

async fn create_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(body): ValidJson<LocationSeatCreate>,
) -> ApiResult<(StatusCode, Json<LocationSeatResponse>)> {
    ensure_reference::<seat_type::Entity, _>(&state.db, body.type_id, "type").await?;
    ensure_reference::<status::Entity, _>(&state.db, body.status_id, "status").await?;
    if let Some(first) = &body.first_review {
        reviews::ensure_review_references(
            &state.db,
            Some(first.pollution_id),
            Some(first.condition_id),
            Some(first.material_id),
            "first_review.",
        )
        .await?;
    }

    let txn = state.db.begin().await?;
    let location = location_seat::ActiveModel {
        name: Set(body.name),
        description: Set(body.description),
        address: Set(body.address),
        type_id: Set(body.type_id),
        status_id: Set(body.status_id),
        cord_x: Set(body.cord_x),
        cord_y: Set(body.cord_y),
        author_id: Set(user.id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if let Some(first) = body.first_review {
        let created = reviews::insert_review(&txn, first, user.id, location.id).await?;
        debug!(review_id = created.id, "first review attached");
    }
    let response = single_with_details(&txn, location).await?;
    txn.commit().await?;

    info!(location_id = response.id, author_id = user.id, "location created");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_locations(
    State(state): State<AppState>,
    Query(filter): Query<LocationFilter>,
) -> ApiResult<Json<Vec<LocationSeatResponse>>> {
    let locations = filter
        .apply(location_seat::Entity::find())
        .order_by_asc(location_seat::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, locations).await?))
}

async fn my_locations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<LocationSeatResponse>>> {
    let locations = location_seat::Entity::find()
        .filter(location_seat::Column::AuthorId.eq(user.id))
        .order_by_asc(location_seat::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, locations).await?))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<LocationSeatResponse>> {
    let location = find_location(&state, id).await?;
    Ok(Json(single_with_details(&state.db, location).await?))
}

async fn update_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
    ValidJson(body): ValidJson<LocationSeatUpdate>,
) -> ApiResult<Json<LocationSeatResponse>> {
    let location = find_location(&state, id).await?;
    ensure_author_or_admin(&user, location.author_id, "location")?;
    if let Some(type_id) = body.type_id {
        ensure_reference::<seat_type::Entity, _>(&state.db, type_id, "type").await?;
    }
    if let Some(status_id) = body.status_id {
        ensure_reference::<status::Entity, _>(&state.db, status_id, "status").await?;
    }

    let mut active = location.clone().into_active_model();
    if let Some(name) = body.name {
        active.name = Set(name);
    }
    if let Some(description) = body.description {
        active.description = Set(description);
    }
    if let Some(address) = body.address {
        active.address = Set(address);
    }
    if let Some(type_id) = body.type_id {
        active.type_id = Set(type_id);
    }
    if let Some(status_id) = body.status_id {
        active.status_id = Set(status_id);
    }
    if let Some(cord_x) = body.cord_x {
        active.cord_x = Set(cord_x);
    }
    if let Some(cord_y) = body.cord_y {
        active.cord_y = Set(cord_y);
    }
    let updated = if active.is_changed() {
        active.update(&state.db).await?
    } else {
        location
    };

    info!(location_id = id, "location updated");
    Ok(Json(single_with_details(&state.db, updated).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let location = find_location(&state, id).await?;
    ensure_author_or_admin(&user, location.author_id, "location")?;

    let txn = state.db.begin().await?;
    let urls = cascade::delete_location(&txn, id).await?;
    txn.commit().await?;
    cascade::remove_picture_files(&state.settings.upload_dir, &urls).await;

    info!(location_id = id, pictures = urls.len(), "location deleted");
    Ok(StatusCode::NO_CONTENT)
}
