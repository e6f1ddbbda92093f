use axum::{
    extract::State,
    routing::{get, post},
    Form, Json, Router,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, SqlErr};
use tracing::info;

use crate::auth::CurrentUser;
use crate::entity::{role, user};
use crate::error::{ApiError, ApiResult};
use crate::schemas::{LoginForm, Token, UserCreate, UserResponse, ValidJson};
use crate::security::{authenticate_user, hash_password_async};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
}

fn issue_access_token(state: &AppState, user: &user::Model) -> ApiResult<Token> {
    let token = state
        .tokens
        .issue(user.id, Some(&user.username), Some(state.access_token_ttl()))
        .map_err(ApiError::internal)?;
    Ok(Token::bearer(token))
}

async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<Token>> {
    let user = authenticate_user(&state.db, &form.username, &form.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;
    info!(user_id = user.id, "user logged in");
    Ok(Json(issue_access_token(&state, &user)?))
}

const ACCOUNT_TAKEN: &str = "A user with this email or username already exists";

/// Inserts a new account with `role_id` after checking that neither the email
/// nor the username is taken. A concurrent insert that wins the race still
/// surfaces as the same 400 through the unique indexes.
pub(crate) async fn create_account(
    state: &AppState,
    body: UserCreate,
    role_id: i32,
) -> ApiResult<user::Model> {
    let taken = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(body.email.as_str()))
                .add(user::Column::Username.eq(body.username.as_str())),
        )
        .one(&state.db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::BadRequest(ACCOUNT_TAKEN.to_string()));
    }

    let password = hash_password_async(body.password, state.settings.bcrypt_cost).await?;
    let created = user::ActiveModel {
        username: Set(body.username),
        email: Set(body.email),
        password: Set(password),
        role_id: Set(Some(role_id)),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::BadRequest(ACCOUNT_TAKEN.to_string())
        }
        _ => ApiError::from(err),
    })?;
    Ok(created)
}

async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<UserCreate>,
) -> ApiResult<Json<Token>> {
    let role_id = role::Entity::find()
        .filter(role::Column::RoleName.eq(role::USER_ROLE_NAME))
        .one(&state.db)
        .await?
        .map_or(role::DEFAULT_USER_ROLE_ID, |role| role.id);

    let created = create_account(&state, body, role_id).await?;
    info!(user_id = created.id, "user registered");
    Ok(Json(issue_access_token(&state, &created)?))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}
