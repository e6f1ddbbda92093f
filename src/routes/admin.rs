//! Session-backed admin console.
//!
//! `/admin/login` stores a signed token in a server-side session; every other
//! `/admin` route passes through [`require_admin_session`], which sends the
//! browser back to the login form unless that token still names an
//! administrator. The resource views expose each table as JSON rows.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, Iterable, PaginatorTrait, PrimaryKeyToColumn, PrimaryKeyTrait,
    QueryFilter, QueryOrder, TransactionTrait, TryIntoModel,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tracing::{info, warn};
use validator::ValidationError;

use crate::auth::user_from_token;
use crate::cascade;
use crate::entity::{
    condition, location_review, location_seat, material, picture, pollution, review, role,
    seat_type, status, user,
};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{latitude, longitude, LoginForm};
use crate::security::{authenticate_user, hash_password_async};
use crate::session_store::SeaOrmStore;
use crate::state::AppState;

/// Session key holding the admin's token.
const TOKEN_KEY: &str = "token";

const LOGIN_PATH: &str = "/admin/login";

const MAX_PAGE_SIZE: u64 = 500;

pub fn router(state: &AppState) -> Router<AppState> {
    let session_layer = SessionManagerLayer::new(SeaOrmStore::new(state.db.clone()))
        .with_secure(state.settings.session_secure)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.settings.admin_session_hours,
        )));

    let protected = Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/{resource}", get(list_rows).post(create_row))
        .route(
            "/admin/{resource}/{id}",
            get(get_row).patch(update_row).delete(delete_row),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_session,
        ));

    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/admin/logout", get(logout))
        .merge(protected)
        .layer(session_layer)
}

fn login_form(error: Option<&str>) -> Html<String> {
    let error = error
        .map(|message| format!(r#"<p class="error">{message}</p>"#))
        .unwrap_or_default();
    Html(format!(
        r#"<!doctype html>
<html>
    <head><title>seatmap admin</title></head>
    <body>
        <h1>seatmap admin</h1>
        {error}
        <form method="post" action="{LOGIN_PATH}">
            <label>Username or email <input name="username" autocomplete="username"></label>
            <label>Password <input name="password" type="password" autocomplete="current-password"></label>
            <button type="submit">Sign in</button>
        </form>
    </body>
</html>
"#
    ))
}

async fn login_page() -> Html<String> {
    login_form(None)
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let admin = authenticate_user(&state.db, &form.username, &form.password)
        .await?
        .filter(user::Model::is_admin);
    let Some(admin) = admin else {
        warn!(login = %form.username, "rejected admin console login");
        return Ok((
            StatusCode::BAD_REQUEST,
            login_form(Some("Invalid credentials or insufficient privileges")),
        )
            .into_response());
    };

    let token = state
        .tokens
        .issue(admin.id, Some(&admin.username), None)
        .map_err(ApiError::internal)?;
    session.cycle_id().await?;
    session.insert(TOKEN_KEY, token).await?;

    info!(user_id = admin.id, "admin console login");
    Ok(Redirect::to("/admin").into_response())
}

async fn logout(session: Session) -> ApiResult<Redirect> {
    session.flush().await?;
    Ok(Redirect::to(LOGIN_PATH))
}

/// Lets the request through only when the session token names an existing
/// administrator.
pub async fn require_admin_session(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token: Option<String> = session.get(TOKEN_KEY).await?;
    let admin = match token {
        Some(token) => user_from_token(&state, &token).await?,
        None => None,
    };
    match admin {
        Some(admin) if admin.is_admin() => Ok(next.run(request).await),
        _ => Ok(Redirect::to(LOGIN_PATH).into_response()),
    }
}

/// Tables the console exposes, by their path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminResource {
    Roles,
    Users,
    SeatTypes,
    Statuses,
    Materials,
    Conditions,
    Pollutions,
    Locations,
    Reviews,
    Pictures,
    LocationReviews,
}

impl AdminResource {
    pub const ALL: [AdminResource; 11] = [
        Self::Roles,
        Self::Users,
        Self::SeatTypes,
        Self::Statuses,
        Self::Materials,
        Self::Conditions,
        Self::Pollutions,
        Self::Locations,
        Self::Reviews,
        Self::Pictures,
        Self::LocationReviews,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Roles => "roles",
            Self::Users => "users",
            Self::SeatTypes => "seat_types",
            Self::Statuses => "statuses",
            Self::Materials => "materials",
            Self::Conditions => "conditions",
            Self::Pollutions => "pollutions",
            Self::Locations => "locations",
            Self::Reviews => "reviews",
            Self::Pictures => "pictures",
            Self::LocationReviews => "location_reviews",
        }
    }
}

impl FromStr for AdminResource {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|resource| resource.name() == s)
            .ok_or_else(|| ApiError::not_found(format!("Unknown resource '{s}'")))
    }
}

macro_rules! dispatch {
    ($resource:expr, $func:ident($($arg:expr),* $(,)?)) => {
        match $resource {
            AdminResource::Roles => $func::<role::Entity>($($arg),*).await,
            AdminResource::Users => $func::<user::Entity>($($arg),*).await,
            AdminResource::SeatTypes => $func::<seat_type::Entity>($($arg),*).await,
            AdminResource::Statuses => $func::<status::Entity>($($arg),*).await,
            AdminResource::Materials => $func::<material::Entity>($($arg),*).await,
            AdminResource::Conditions => $func::<condition::Entity>($($arg),*).await,
            AdminResource::Pollutions => $func::<pollution::Entity>($($arg),*).await,
            AdminResource::Locations => $func::<location_seat::Entity>($($arg),*).await,
            AdminResource::Reviews => $func::<review::Entity>($($arg),*).await,
            AdminResource::Pictures => $func::<picture::Entity>($($arg),*).await,
            AdminResource::LocationReviews => {
                $func::<location_review::Entity>($($arg),*).await
            }
        }
    };
}

fn to_json<T: Serialize>(row: &T) -> ApiResult<Value> {
    serde_json::to_value(row).map_err(ApiError::internal)
}

fn bad_payload(err: sea_orm::DbErr) -> ApiError {
    ApiError::BadRequest(format!("Invalid row: {err}"))
}

async fn count_rows<E>(db: &DatabaseConnection) -> ApiResult<u64>
where
    E: EntityTrait,
    E::Model: Sync,
{
    Ok(E::find().count(db).await?)
}

async fn page_rows<E>(
    db: &DatabaseConnection,
    page: u64,
    page_size: u64,
) -> ApiResult<(Vec<Value>, u64)>
where
    E: EntityTrait,
    E::Model: Serialize + Sync,
{
    let mut query = E::find();
    for key in E::PrimaryKey::iter() {
        query = query.order_by_asc(key.into_column());
    }
    let paginator = query.paginate(db, page_size);
    let total = paginator.num_items().await?;
    let rows = paginator
        .fetch_page(page)
        .await?
        .iter()
        .map(to_json)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok((rows, total))
}

async fn fetch_row<E>(db: &DatabaseConnection, id: i32) -> ApiResult<Value>
where
    E: EntityTrait,
    E::Model: Serialize,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    let found = E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Row not found"))?;
    to_json(&found)
}

async fn insert_row<E>(db: &DatabaseConnection, payload: Value) -> ApiResult<Value>
where
    E: EntityTrait,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: TryIntoModel<E::Model> + Send,
{
    let active = E::ActiveModel::from_json(payload).map_err(bad_payload)?;
    let created = active.insert(db).await?;
    to_json(&created)
}

async fn patch_row<E>(db: &DatabaseConnection, id: i32, payload: Value) -> ApiResult<Value>
where
    E: EntityTrait,
    E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: TryIntoModel<E::Model> + Send,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    let found = E::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Row not found"))?;
    let mut active = found.clone().into_active_model();
    active.set_from_json(payload).map_err(bad_payload)?;
    if !active.is_changed() {
        return to_json(&found);
    }
    let updated = active.update(db).await?;
    to_json(&updated)
}

async fn remove_row<E>(db: &impl ConnectionTrait, id: i32) -> ApiResult<()>
where
    E: EntityTrait,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    let deleted = E::delete_by_id(id).exec(db).await?;
    if deleted.rows_affected == 0 {
        return Err(ApiError::not_found("Row not found"));
    }
    Ok(())
}

/// Rejects non-object payloads, applies the field rules the public API
/// enforces, and hashes a plain `password` for user rows.
///
/// `creating` is set for inserts, where a user row must carry a password.
async fn prepare_payload(
    state: &AppState,
    resource: AdminResource,
    mut payload: Value,
    creating: bool,
) -> ApiResult<Value> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest("Expected a JSON object".into()));
    }
    match resource {
        AdminResource::Users => {
            match payload.get("password").and_then(Value::as_str) {
                Some(password) => {
                    let hashed =
                        hash_password_async(password.to_owned(), state.settings.bcrypt_cost)
                            .await?;
                    payload["password"] = Value::String(hashed);
                }
                None if creating => {
                    return Err(ApiError::invalid_field("password", "field required"));
                }
                None => {}
            }
        }
        AdminResource::Locations => {
            check_coordinate(&payload, "cord_x", latitude)?;
            check_coordinate(&payload, "cord_y", longitude)?;
        }
        _ => {}
    }
    Ok(payload)
}

fn check_coordinate(
    payload: &Value,
    field: &str,
    rule: fn(&Decimal) -> Result<(), ValidationError>,
) -> ApiResult<()> {
    let Some(raw) = payload.get(field) else {
        return Ok(());
    };
    let value: Decimal = serde_json::from_value(raw.clone())
        .map_err(|_| ApiError::invalid_field(field, "must be a decimal number"))?;
    rule(&value).map_err(|err| {
        let message = err
            .message
            .map_or_else(|| err.code.to_string(), |m| m.to_string());
        ApiError::invalid_field(field, message)
    })
}

#[derive(Debug, Serialize)]
struct ResourceCount {
    name: &'static str,
    count: u64,
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let mut resources = Vec::with_capacity(AdminResource::ALL.len());
    for resource in AdminResource::ALL {
        let count = dispatch!(resource, count_rows(&state.db))?;
        resources.push(ResourceCount {
            name: resource.name(),
            count,
        });
    }
    Ok(Json(json!({ "resources": resources })))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    50
}

async fn list_rows(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    let (items, total) = dispatch!(resource, page_rows(&state.db, query.page, page_size))?;
    Ok(Json(json!({
        "items": items,
        "total": total,
        "page": query.page,
        "page_size": page_size,
    })))
}

async fn get_row(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, i32)>,
) -> ApiResult<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    Ok(Json(dispatch!(resource, fetch_row(&state.db, id))?))
}

async fn create_row(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let resource: AdminResource = resource.parse()?;
    let payload = prepare_payload(&state, resource, payload, true).await?;
    let created = dispatch!(resource, insert_row(&state.db, payload))?;
    info!(resource = resource.name(), "admin console row created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_row(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, i32)>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    let payload = prepare_payload(&state, resource, payload, false).await?;
    let updated = dispatch!(resource, patch_row(&state.db, id, payload))?;
    info!(resource = resource.name(), id, "admin console row updated");
    Ok(Json(updated))
}

async fn delete_row(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, i32)>,
) -> ApiResult<StatusCode> {
    let resource: AdminResource = resource.parse()?;
    let missing = || ApiError::not_found("Row not found");

    match resource {
        AdminResource::Users => {
            user::Entity::find_by_id(id)
                .one(&state.db)
                .await?
                .ok_or_else(missing)?;
            let txn = state.db.begin().await?;
            let urls = cascade::delete_user(&txn, id).await?;
            txn.commit().await?;
            cascade::remove_picture_files(&state.settings.upload_dir, &urls).await;
        }
        AdminResource::Locations => {
            location_seat::Entity::find_by_id(id)
                .one(&state.db)
                .await?
                .ok_or_else(missing)?;
            let txn = state.db.begin().await?;
            let urls = cascade::delete_location(&txn, id).await?;
            txn.commit().await?;
            cascade::remove_picture_files(&state.settings.upload_dir, &urls).await;
        }
        AdminResource::Reviews => {
            review::Entity::find_by_id(id)
                .one(&state.db)
                .await?
                .ok_or_else(missing)?;
            let txn = state.db.begin().await?;
            cascade::delete_review(&txn, id).await?;
            txn.commit().await?;
        }
        AdminResource::Pictures => {
            let url = cascade::delete_picture(&state.db, id)
                .await?
                .ok_or_else(missing)?;
            cascade::remove_picture_files(&state.settings.upload_dir, &[url]).await;
        }
        AdminResource::Roles => {
            let txn = state.db.begin().await?;
            user::Entity::update_many()
                .col_expr(user::Column::RoleId, Expr::value(Option::<i32>::None))
                .filter(user::Column::RoleId.eq(id))
                .exec(&txn)
                .await?;
            remove_row::<role::Entity>(&txn, id).await?;
            txn.commit().await?;
        }
        other => dispatch!(other, remove_row(&state.db, id))?,
    }

    info!(resource = resource.name(), id, "admin console row deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_names_round_trip() {
        for resource in AdminResource::ALL {
            assert_eq!(resource.name().parse::<AdminResource>().unwrap(), resource);
        }
    }

    #[test]
    fn unknown_resource_is_not_found() {
        assert!(matches!(
            "admin_sessions".parse::<AdminResource>(),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn login_form_shows_error_line() {
        assert!(!login_form(None).0.contains("class=\"error\""));
        assert!(login_form(Some("nope")).0.contains("nope"));
    }
}
