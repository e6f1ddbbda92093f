use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use super::auth::create_account;
use crate::auth::AdminUser;
use crate::cascade;
use crate::entity::{role, user};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{UserCreate, UserResponse, ValidJson};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", delete(delete_user))
        .route("/users/{id}/role", patch(change_role))
}

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    #[serde(default = "default_role")]
    pub role_id: i32,
}

fn default_role() -> i32 {
    role::DEFAULT_USER_ROLE_ID
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role_id: i32,
}

async fn ensure_role(state: &AppState, role_id: i32) -> ApiResult<()> {
    role::Entity::find_by_id(role_id)
        .one(&state.db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Role not found"))
}

async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .offset(page.skip)
        .limit(page.limit)
        .all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<RoleQuery>,
    ValidJson(body): ValidJson<UserCreate>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    ensure_role(&state, query.role_id).await?;
    let created = create_account(&state, body, query.role_id).await?;
    info!(
        user_id = created.id,
        role_id = query.role_id,
        admin_id = admin.id,
        "user created by admin"
    );
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    if user::Entity::find_by_id(id).one(&state.db).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let txn = state.db.begin().await?;
    let urls = cascade::delete_user(&txn, id).await?;
    txn.commit().await?;
    cascade::remove_picture_files(&state.settings.upload_dir, &urls).await;

    info!(user_id = id, admin_id = admin.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Query(query): Query<RoleChange>,
) -> ApiResult<Json<UserResponse>> {
    let found = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ensure_role(&state, query.role_id).await?;

    let mut active = found.into_active_model();
    active.role_id = Set(Some(query.role_id));
    let updated = active.update(&state.db).await?;

    info!(
        user_id = id,
        role_id = query.role_id,
        admin_id = admin.id,
        "user role changed"
    );
    Ok(Json(updated.into()))
}
