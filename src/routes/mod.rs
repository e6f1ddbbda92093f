//! HTTP surface.
//!
//! Each submodule contributes a `router()` with absolute paths; [`router`]
//! merges them and adds CORS and the static file service for uploads.

use axum::Router;
use sea_orm::{ConnectionTrait, EntityTrait, PrimaryKeyTrait};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod dictionaries;
pub mod locations;
pub mod pictures;
pub mod reviews;
pub mod users;

/// Builds the application router.
///
/// Every route is mounted at an absolute path, the admin console carries its
/// own session layer, and uploads from `settings.upload_dir` are served
/// under `/static`. CORS allows any origin, method and header.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth::router())
        .merge(locations::router())
        .merge(reviews::router())
        .merge(dictionaries::router())
        .merge(pictures::router(state.settings.max_upload_bytes))
        .merge(users::router())
        .merge(admin::router(&state))
        .nest_service("/static", ServeDir::new(&state.settings.upload_dir))
        .layer(cors)
        .with_state(state)
}

/// Fails with 422 on `field` when no `E` row has primary key `id`.
pub(crate) async fn ensure_reference<E, C>(db: &C, id: i32, field: &str) -> ApiResult<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    if E::find_by_id(id).one(db).await?.is_none() {
        return Err(ApiError::invalid_field(field, format!("no entry with id {id}")));
    }
    Ok(())
}
