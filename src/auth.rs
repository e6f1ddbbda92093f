//! Bearer-token extractors.
//!
//! Handlers ask for [`CurrentUser`] when any signed-in user may call them and
//! for [`AdminUser`] when the caller must hold the administrator role.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::ApiError;
use crate::state::AppState;

/// The user named by a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// A [`CurrentUser`] holding the administrator role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Resolves a token to the user it names, `None` when the token is bad or the
/// user no longer exists.
pub async fn user_from_token(
    state: &AppState,
    token: &str,
) -> Result<Option<user::Model>, ApiError> {
    let Ok(claims) = state.tokens.verify(token) else {
        return Ok(None);
    };
    let Some(user_id) = claims.user_id() else {
        return Ok(None);
    };
    Ok(user::Entity::find_by_id(user_id).one(&state.db).await?)
}

/// Lets a row's author or any administrator through.
pub fn ensure_author_or_admin(
    user: &user::Model,
    author_id: i32,
    what: &str,
) -> Result<(), ApiError> {
    if user.id == author_id || user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "You do not have permission to modify this {what}"
        )))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        user_from_token(state, token)
            .await?
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Administrator privileges required"));
        }
        Ok(AdminUser(user))
    }
}
