//! Deletes that take dependent rows with them.
//!
//! Callers run these inside a transaction. Functions that drop pictures
//! return the removed picture urls so the files can be unlinked once the
//! transaction commits.

use std::collections::HashSet;
use std::path::Path;

use sea_orm::sea_query::SimpleExpr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use tracing::{debug, warn};

use crate::entity::{location_review, location_seat, picture, review, user};

/// Removes a location with its pictures and review links. Reviews that end up
/// attached to no location are removed as well.
///
/// # Parameters
///
/// * `conn` - A transaction, so a failure part way leaves nothing deleted.
/// * `location_id` - The location to remove. An unknown id deletes nothing.
///
/// # Returns
///
/// The urls of the removed pictures, for [`remove_picture_files`] after the
/// transaction commits.
pub async fn delete_location<C>(conn: &C, location_id: i32) -> Result<Vec<String>, DbErr>
where
    C: ConnectionTrait,
{
    let review_ids: Vec<i32> = location_review::Entity::find()
        .select_only()
        .column(location_review::Column::ReviewId)
        .filter(location_review::Column::LocationId.eq(location_id))
        .into_tuple()
        .all(conn)
        .await?;

    location_review::Entity::delete_many()
        .filter(location_review::Column::LocationId.eq(location_id))
        .exec(conn)
        .await?;

    if !review_ids.is_empty() {
        let still_linked: HashSet<i32> = location_review::Entity::find()
            .select_only()
            .column(location_review::Column::ReviewId)
            .filter(location_review::Column::ReviewId.is_in(review_ids.clone()))
            .into_tuple::<i32>()
            .all(conn)
            .await?
            .into_iter()
            .collect();

        let orphans: Vec<i32> = review_ids
            .into_iter()
            .filter(|id| !still_linked.contains(id))
            .collect();
        if !orphans.is_empty() {
            debug!(location_id, ?orphans, "removing orphaned reviews");
            review::Entity::delete_many()
                .filter(review::Column::Id.is_in(orphans))
                .exec(conn)
                .await?;
        }
    }

    let urls = delete_pictures(conn, picture::Column::LocationId.eq(location_id)).await?;

    location_seat::Entity::delete_by_id(location_id)
        .exec(conn)
        .await?;

    Ok(urls)
}

/// Removes a review and its location links.
pub async fn delete_review<C>(conn: &C, review_id: i32) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    location_review::Entity::delete_many()
        .filter(location_review::Column::ReviewId.eq(review_id))
        .exec(conn)
        .await?;
    review::Entity::delete_by_id(review_id).exec(conn).await?;
    Ok(())
}

/// Removes a user together with everything they authored or uploaded.
///
/// Their locations go through [`delete_location`], their reviews elsewhere
/// through [`delete_review`], and pictures they uploaded to other people's
/// locations are dropped too.
///
/// # Returns
///
/// The urls of every removed picture.
pub async fn delete_user<C>(conn: &C, user_id: i32) -> Result<Vec<String>, DbErr>
where
    C: ConnectionTrait,
{
    let mut urls = delete_pictures(conn, picture::Column::UserId.eq(user_id)).await?;

    let location_ids: Vec<i32> = location_seat::Entity::find()
        .select_only()
        .column(location_seat::Column::Id)
        .filter(location_seat::Column::AuthorId.eq(user_id))
        .into_tuple()
        .all(conn)
        .await?;
    for location_id in location_ids {
        urls.extend(delete_location(conn, location_id).await?);
    }

    let review_ids: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::Id)
        .filter(review::Column::AuthorId.eq(user_id))
        .into_tuple()
        .all(conn)
        .await?;
    for review_id in review_ids {
        delete_review(conn, review_id).await?;
    }

    user::Entity::delete_by_id(user_id).exec(conn).await?;
    Ok(urls)
}

/// Removes a single picture row, returning its url when it existed.
pub async fn delete_picture<C>(conn: &C, picture_id: i32) -> Result<Option<String>, DbErr>
where
    C: ConnectionTrait,
{
    let Some(found) = picture::Entity::find_by_id(picture_id).one(conn).await? else {
        return Ok(None);
    };
    picture::Entity::delete_by_id(picture_id).exec(conn).await?;
    Ok(Some(found.url))
}

async fn delete_pictures<C>(conn: &C, filter: SimpleExpr) -> Result<Vec<String>, DbErr>
where
    C: ConnectionTrait,
{
    let urls: Vec<String> = picture::Entity::find()
        .select_only()
        .column(picture::Column::Url)
        .filter(filter.clone())
        .into_tuple()
        .all(conn)
        .await?;
    picture::Entity::delete_many().filter(filter).exec(conn).await?;
    Ok(urls)
}

/// Unlinks the files behind picture urls. Missing files are only logged.
pub async fn remove_picture_files(upload_dir: &Path, urls: &[String]) {
    for url in urls {
        let Some(name) = file_name_from_url(url) else {
            warn!(url, "picture url does not point into the upload directory");
            continue;
        };
        if let Err(err) = tokio::fs::remove_file(upload_dir.join(name)).await {
            warn!(url, "could not remove picture file: {err}");
        }
    }
}

/// `/static/<name>` to `<name>`, refusing anything that could leave the
/// upload directory.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let name = url.strip_prefix("/static/")?;
    let valid = !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
        && name != "..";
    valid.then_some(name)
}

#[cfg(test)]
mod tests {
    use super::file_name_from_url;

    #[test]
    fn static_urls_map_to_file_names() {
        assert_eq!(file_name_from_url("/static/abc.jpg"), Some("abc.jpg"));
        assert_eq!(file_name_from_url("/static/../etc/passwd"), None);
        assert_eq!(file_name_from_url("/static/"), None);
        assert_eq!(file_name_from_url("/elsewhere/abc.jpg"), None);
    }
}
