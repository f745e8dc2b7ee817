use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    cache::cache::{invalidate_scope, CacheScope, CachedValue},
    constants::INGREDIENT_SEARCH_LIMIT,
    error::{ApiError, QueryError},
    permissions::ActionType,
    schema::{Id, Ingredient, NewIngredient},
    session::Session,
};

// Two binds per row
const IMPORT_CHUNK_SIZE: usize = 65535 / 2;

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, ApiError> {
    let list: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Case-insensitive name prefix search.
pub async fn search_ingredients(
    prefix: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let list: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) ORDER BY name, measurement_unit LIMIT $2",
    )
    .bind(format!("{}%", escape_like(prefix.trim())))
    .bind(INGREDIENT_SEARCH_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn search_ingredients_cached(
    prefix: &str,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, ApiError> {
    let key = CacheScope::Ingredients.key(format!("search:{}", prefix.trim().to_lowercase()));

    CachedValue::get_or(key, cache, || search_ingredients(prefix, pool)).await
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let ingredient: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(ingredient)
}

pub async fn create_ingredient(
    session: &Session,
    ingredient: &NewIngredient,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Ingredient, ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    ingredient.validate()?;

    let created: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(ingredient.name.trim())
    .bind(ingredient.measurement_unit.trim())
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    invalidate_scope(CacheScope::Ingredients, cache).await;
    Ok(created)
}

pub async fn update_ingredient(
    session: &Session,
    id: Id,
    ingredient: &NewIngredient,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Ingredient, ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;
    ingredient.validate()?;

    let updated: Option<Ingredient> = sqlx::query_as(
        "UPDATE ingredients SET name = $1, measurement_unit = $2 WHERE id = $3 RETURNING *",
    )
    .bind(ingredient.name.trim())
    .bind(ingredient.measurement_unit.trim())
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let updated =
        updated.ok_or_else(|| ApiError::not_found("no ingredient exists with specified id"))?;

    invalidate_scope(CacheScope::Ingredients, cache).await;
    Ok(updated)
}

/// Fails with a conflict while any recipe still uses the ingredient.
pub async fn delete_ingredient(
    session: &Session,
    id: Id,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<(), ApiError> {
    session.authenticate(ActionType::ManageCatalogue)?;

    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("no ingredient exists with specified id"));
    }

    invalidate_scope(CacheScope::Ingredients, cache).await;
    Ok(())
}

/// Bulk insert for catalogue imports. Rows already present are skipped; the
/// number of inserted rows is returned.
pub async fn import_ingredients(
    records: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, ApiError> {
    if let Some(invalid) = records.iter().find_map(|record| record.validate().err()) {
        return Err(invalid);
    }

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let mut inserted = 0;
    for chunk in records.chunks(IMPORT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, record| {
            b.push_bind(record.name.trim())
                .push_bind(record.measurement_unit.trim());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;

        inserted += result.rows_affected();
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!(
        "Imported {inserted} ingredients, skipped {}",
        records.len() as u64 - inserted
    );
    Ok(inserted)
}
