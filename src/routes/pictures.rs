use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{ensure_author_or_admin, CurrentUser};
use crate::cascade;
use crate::entity::{location_seat, picture};
use crate::error::{ApiError, ApiResult};
use crate::schemas::PictureResponse;
use crate::state::AppState;

const MAX_EXTENSION_LEN: usize = 10;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/pictures/upload",
            post(upload_picture).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/pictures", get(list_pictures))
        .route("/pictures/{id}", delete(delete_picture))
}

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub location_id: i32,
}

/// Extension of an uploaded file name, kept only when it is short and
/// alphanumeric.
fn stored_extension(file_name: Option<&str>) -> Option<String> {
    let (stem, ext) = file_name?.rsplit_once('.')?;
    let valid = !stem.is_empty()
        && (1..=MAX_EXTENSION_LEN).contains(&ext.len())
        && ext.bytes().all(|b| b.is_ascii_alphanumeric());
    valid.then(|| ext.to_string())
}

fn stored_name(file_name: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match stored_extension(file_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

async fn ensure_location(state: &AppState, location_id: i32) -> ApiResult<()> {
    location_seat::Entity::find_by_id(location_id)
        .one(&state.db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Location not found"))
}

async fn upload_picture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LocationQuery>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<PictureResponse>)> {
    ensure_location(&state, query.location_id).await?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = stored_name(field.file_name());
        let bytes = field.bytes().await?;
        upload = Some((name, bytes));
        break;
    }
    let Some((name, bytes)) = upload else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };

    tokio::fs::create_dir_all(&state.settings.upload_dir).await?;
    let path = state.settings.upload_dir.join(&name);
    tokio::fs::write(&path, &bytes).await?;

    let inserted = picture::ActiveModel {
        url: Set(format!("/static/{name}")),
        location_id: Set(query.location_id),
        user_id: Set(user.id),
        ..Default::default()
    }
    .insert(&state.db)
    .await;
    let created = match inserted {
        Ok(created) => created,
        Err(err) => {
            if let Err(io) = tokio::fs::remove_file(&path).await {
                warn!(file = %path.display(), "could not remove orphaned upload: {io}");
            }
            return Err(err.into());
        }
    };

    info!(
        picture_id = created.id,
        location_id = query.location_id,
        size = bytes.len(),
        "picture uploaded"
    );
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_pictures(
    State(state): State<AppState>,
    Query(query): Query<LocationQuery>,
) -> ApiResult<Json<Vec<PictureResponse>>> {
    let pictures = picture::Entity::find()
        .filter(picture::Column::LocationId.eq(query.location_id))
        .order_by_asc(picture::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(pictures.into_iter().map(Into::into).collect()))
}

async fn delete_picture(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    let found = picture::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Picture not found"))?;
    ensure_author_or_admin(&user, found.user_id, "picture")?;

    if let Some(url) = cascade::delete_picture(&state.db, id).await? {
        cascade::remove_picture_files(&state.settings.upload_dir, &[url]).await;
    }

    info!(picture_id = id, "picture deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_short_alphanumeric_extensions() {
        assert_eq!(stored_extension(Some("bench.JPG")), Some("JPG".to_string()));
        assert_eq!(stored_extension(Some("archive.tar.gz")), Some("gz".to_string()));
    }

    #[test]
    fn drops_odd_extensions() {
        assert_eq!(stored_extension(Some("noext")), None);
        assert_eq!(stored_extension(Some(".hidden")), None);
        assert_eq!(stored_extension(Some("x.verylongextension")), None);
        assert_eq!(stored_extension(Some("x.p/ng")), None);
        assert_eq!(stored_extension(None), None);
    }

    #[test]
    fn stored_names_are_unique() {
        let a = stored_name(Some("a.png"));
        let b = stored_name(Some("a.png"));
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
    }
}
