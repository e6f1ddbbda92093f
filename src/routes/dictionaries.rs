//! Lookup tables referenced by locations and reviews.
//!
//! The five dictionaries share one shape (`id`, `name`), so the handlers are
//! written once against [`Dictionary`](crate::entity::Dictionary) and dispatched on the `{kind}` path
//! segment.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::info;

use crate::auth::AdminUser;
use crate::entity::{
    condition, location_seat, material, pollution, review, seat_type, status, Dictionary,
};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{DictionaryCreate, DictionaryItem, ValidJson};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dicts/{kind}", get(list_items).post(create_item))
        .route("/dicts/{kind}/{id}", patch(rename_item).delete(delete_item))
}

fn item<D: Dictionary>(model: D::Model) -> DictionaryItem {
    let (id, name) = D::into_parts(model);
    DictionaryItem { id, name }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryKind {
    Types,
    Statuses,
    Materials,
    Conditions,
    Pollutions,
}

impl FromStr for DictionaryKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "types" => Ok(Self::Types),
            "statuses" => Ok(Self::Statuses),
            "materials" => Ok(Self::Materials),
            "conditions" => Ok(Self::Conditions),
            "pollutions" => Ok(Self::Pollutions),
            other => Err(ApiError::BadRequest(format!(
                "Unknown dictionary '{other}'"
            ))),
        }
    }
}

impl DictionaryKind {
    /// Whether any location or review still points at entry `id`.
    async fn in_use(self, db: &DatabaseConnection, id: i32) -> ApiResult<bool> {
        let count = match self {
            Self::Types => {
                location_seat::Entity::find()
                    .filter(location_seat::Column::TypeId.eq(id))
                    .count(db)
                    .await?
            }
            Self::Statuses => {
                location_seat::Entity::find()
                    .filter(location_seat::Column::StatusId.eq(id))
                    .count(db)
                    .await?
            }
            Self::Materials => {
                review::Entity::find()
                    .filter(review::Column::MaterialId.eq(id))
                    .count(db)
                    .await?
            }
            Self::Conditions => {
                review::Entity::find()
                    .filter(review::Column::ConditionId.eq(id))
                    .count(db)
                    .await?
            }
            Self::Pollutions => {
                review::Entity::find()
                    .filter(review::Column::PollutionId.eq(id))
                    .count(db)
                    .await?
            }
        };
        Ok(count > 0)
    }
}

macro_rules! dispatch {
    ($kind:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            DictionaryKind::Types => $func::<seat_type::Entity>($($arg),*).await,
            DictionaryKind::Statuses => $func::<status::Entity>($($arg),*).await,
            DictionaryKind::Materials => $func::<material::Entity>($($arg),*).await,
            DictionaryKind::Conditions => $func::<condition::Entity>($($arg),*).await,
            DictionaryKind::Pollutions => $func::<pollution::Entity>($($arg),*).await,
        }
    };
}

async fn all_items<D>(db: &DatabaseConnection) -> ApiResult<Vec<DictionaryItem>>
where
    D: Dictionary,
{
    Ok(D::find()
        .order_by_asc(D::id_column())
        .all(db)
        .await?
        .into_iter()
        .map(item::<D>)
        .collect())
}

async fn insert_item<D>(db: &DatabaseConnection, name: String) -> ApiResult<DictionaryItem>
where
    D: Dictionary,
    D::Model: IntoActiveModel<D::Active>,
{
    Ok(item::<D>(D::new_row(name).insert(db).await?))
}

async fn update_item<D>(
    db: &DatabaseConnection,
    id: i32,
    name: String,
) -> ApiResult<DictionaryItem>
where
    D: Dictionary,
    D::Model: IntoActiveModel<D::Active>,
{
    let found = D::find()
        .filter(D::id_column().eq(id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Entry not found"))?;
    let mut row = found.into_active_model();
    D::rename(&mut row, name);
    Ok(item::<D>(row.update(db).await?))
}

async fn remove_item<D>(db: &DatabaseConnection, id: i32) -> ApiResult<()>
where
    D: Dictionary,
{
    let deleted = D::delete_many()
        .filter(D::id_column().eq(id))
        .exec(db)
        .await?;
    if deleted.rows_affected == 0 {
        return Err(ApiError::not_found("Entry not found"));
    }
    Ok(())
}

async fn list_items(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Vec<DictionaryItem>>> {
    let kind: DictionaryKind = kind.parse()?;
    Ok(Json(dispatch!(kind, all_items(&state.db))?))
}

async fn create_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(kind): Path<String>,
    ValidJson(body): ValidJson<DictionaryCreate>,
) -> ApiResult<(StatusCode, Json<DictionaryItem>)> {
    let kind: DictionaryKind = kind.parse()?;
    let created = dispatch!(kind, insert_item(&state.db, body.name))?;
    info!(?kind, id = created.id, admin_id = admin.id, "dictionary entry created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn rename_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((kind, id)): Path<(String, i32)>,
    ValidJson(body): ValidJson<DictionaryCreate>,
) -> ApiResult<Json<DictionaryItem>> {
    let kind: DictionaryKind = kind.parse()?;
    let updated = dispatch!(kind, update_item(&state.db, id, body.name))?;
    info!(?kind, id, admin_id = admin.id, "dictionary entry renamed");
    Ok(Json(updated))
}

async fn delete_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((kind, id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let kind: DictionaryKind = kind.parse()?;
    if kind.in_use(&state.db, id).await? {
        return Err(ApiError::Conflict(
            "Entry is still referenced and cannot be deleted".into(),
        ));
    }
    dispatch!(kind, remove_item(&state.db, id))?;
    info!(?kind, id, admin_id = admin.id, "dictionary entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
