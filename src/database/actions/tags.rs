use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    cache::cache::{invalidate_scope, CacheScope, CachedValue},
    error::{ApiError, QueryError},
    permissions::ActionType,
    schema::{Id, NewTag, Tag},
    session::Session,
};

pub async fn create_tag(
    session: &Session,
    tag: &NewTag,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Tag, ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    tag.validate()?;

    let created: Tag =
        sqlx::query_as("INSERT INTO tags (name, slug, color) VALUES ($1, $2, $3) RETURNING *")
            .bind(tag.name.trim())
            .bind(&tag.slug)
            .bind(tag.color.to_uppercase())
            .fetch_one(pool)
            .await
            .map_err(QueryError::from)?;

    invalidate_scope(CacheScope::Tags, cache).await;
    Ok(created)
}

pub async fn update_tag(
    session: &Session,
    id: Id,
    tag: &NewTag,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Tag, ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    tag.validate()?;

    let updated: Option<Tag> = sqlx::query_as(
        "UPDATE tags SET name = $1, slug = $2, color = $3 WHERE id = $4 RETURNING *",
    )
    .bind(tag.name.trim())
    .bind(&tag.slug)
    .bind(tag.color.to_uppercase())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let updated = updated.ok_or_else(|| ApiError::not_found("no tag exists with specified id"))?;

    invalidate_scope(CacheScope::Tags, cache).await;
    Ok(updated)
}

/// Associations with recipes are removed along with the tag.
pub async fn delete_tag(
    session: &Session,
    id: Id,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;

    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("no tag exists with specified id"));
    }

    invalidate_scope(CacheScope::Tags, cache).await;
    Ok(())
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn find_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, ApiError> {
    CachedValue::get_or(CacheScope::Tags.key("all"), cache, || list_tags(pool)).await
}
