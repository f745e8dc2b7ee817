use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    permissions::ActionType,
    schema::{Id, NewUser, User, UserRole, UserView},
    session::Session,
};

pub async fn create_user(user: &NewUser, pool: &Pool<Postgres>) -> Result<User, ApiError> {
    if user.email.trim().is_empty() {
        return Err(ApiError::validation("email", "this field may not be blank"));
    }
    if user.username.trim().is_empty() {
        return Err(ApiError::validation("username", "this field may not be blank"));
    }

    let created: User = sqlx::query_as(
        "INSERT INTO users (email, username, first_name, last_name) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(user.email.trim())
    .bind(user.username.trim())
    .bind(&user.first_name)
    .bind(&user.last_name)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Created user {} ({})", created.username, created.id);
    Ok(created)
}

pub async fn get_user_by_id(id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(user)
}

pub async fn get_user_by_username(
    username: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(user)
}

pub async fn set_user_role(
    session: &Session,
    id: Id,
    role: UserRole,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    session.authenticate(ActionType::ManageUsers)?;

    let user: Option<User> = sqlx::query_as("UPDATE users SET role = $1 WHERE id = $2 RETURNING *")
        .bind(role)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    user.ok_or_else(|| ApiError::not_found("no user exists with specified id"))
}

/// Anonymous viewers are never subscribed.
pub async fn is_subscribed(
    viewer: Option<&Session>,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return Ok(false),
    };

    let row: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM subscriptions WHERE user_id = $1 AND author_id = $2")
            .bind(viewer.user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row.is_some())
}

pub async fn get_user_view(
    viewer: Option<&Session>,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<UserView, ApiError> {
    let user = get_user_by_id(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("no user exists with specified id"))?;
    let is_subscribed = is_subscribed(viewer, id, pool).await?;

    Ok(UserView::from_user(user, is_subscribed))
}
