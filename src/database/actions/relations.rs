use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SUBSCRIPTION_COUNT_PER_PAGE,
    error::{ApiError, QueryError},
    pagination::PageContext,
    permissions::ActionType,
    schema::{
        AuthorView, Id, RecipeShort, RelationKind, RelationResult, ToggleMethod, User, UserRow,
        UserView,
    },
    session::Session,
};

use super::{get_recipe_short, get_user_by_id, is_subscribed};

#[derive(sqlx::FromRow, Debug)]
struct AuthorRecipeRow {
    author_id: Id,
    #[sqlx(flatten)]
    recipe: RecipeShort,
}

/// Adds or removes one `(owner, target)` pair of the given kind.
pub async fn toggle_relationship(
    session: &Session,
    kind: RelationKind,
    target_id: Id,
    method: ToggleMethod,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<RelationResult, ApiError> {
    session.authenticate(ActionType::ManageOwnRelations)?;

    match method {
        ToggleMethod::Add => add_relation(session, kind, target_id, recipes_limit, pool).await,
        ToggleMethod::Remove => remove_relation(session, kind, target_id, pool)
            .await
            .map(|_| RelationResult::Removed),
    }
}

pub async fn add_relation(
    session: &Session,
    kind: RelationKind,
    target_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<RelationResult, ApiError> {
    kind.check_pair(session.user_id, target_id)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let target: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE id = $1",
        kind.target_table()
    ))
    .bind(target_id)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if target.is_none() {
        return Err(ApiError::not_found(kind.target_missing()));
    }

    // A concurrent duplicate that slipped past the lookup lands here as 0 rows
    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.table(),
        kind.target_column()
    ))
    .bind(session.user_id)
    .bind(target_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict(kind.already_added()));
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::trace!("> {} added {kind:?} {target_id}", session.username);

    match kind {
        RelationKind::Favorite | RelationKind::ShoppingCart => get_recipe_short(target_id, pool)
            .await?
            .map(RelationResult::Recipe)
            .ok_or_else(|| ApiError::not_found(kind.target_missing())),
        RelationKind::Subscription => {
            get_author_view(Some(session), target_id, recipes_limit, pool)
                .await
                .map(RelationResult::Author)
        }
    }
}

pub async fn remove_relation(
    session: &Session,
    kind: RelationKind,
    target_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
        kind.table(),
        kind.target_column()
    ))
    .bind(session.user_id)
    .bind(target_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found(kind.not_added()));
    }

    log::trace!("> {} removed {kind:?} {target_id}", session.username);
    Ok(())
}

fn check_recipes_limit(recipes_limit: Option<i64>) -> Result<(), ApiError> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(ApiError::validation(
            "recipes_limit",
            "ensure this value is greater than or equal to 0",
        )),
        _ => Ok(()),
    }
}

/// Newest recipes first, at most `recipes_limit` per author, plus each author's total.
async fn list_author_recipes(
    author_ids: &[Id],
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<(HashMap<Id, Vec<RecipeShort>>, HashMap<Id, i64>), ApiError> {
    let rows: Vec<AuthorRecipeRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM (
            SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS n
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR n <= $2
        ORDER BY author_id, id DESC
        ",
    )
    .bind(author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let counts: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    rows.into_iter().for_each(|row| {
        recipes.entry(row.author_id).or_default().push(row.recipe);
    });

    Ok((recipes, counts.into_iter().collect()))
}

fn author_view(
    user: User,
    is_subscribed: bool,
    recipes: &mut HashMap<Id, Vec<RecipeShort>>,
    counts: &HashMap<Id, i64>,
) -> AuthorView {
    let id = user.id;
    AuthorView {
        user: UserView::from_user(user, is_subscribed),
        recipes: recipes.remove(&id).unwrap_or_default(),
        recipes_count: counts.get(&id).copied().unwrap_or(0),
    }
}

pub async fn get_author_view(
    viewer: Option<&Session>,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<AuthorView, ApiError> {
    check_recipes_limit(recipes_limit)?;

    let user = get_user_by_id(author_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("no user exists with specified id"))?;
    let is_subscribed = is_subscribed(viewer, author_id, pool).await?;
    let (mut recipes, counts) = list_author_recipes(&[author_id], recipes_limit, pool).await?;

    Ok(author_view(user, is_subscribed, &mut recipes, &counts))
}

/// Authors the session follows, ordered by username.
pub async fn list_subscriptions(
    session: &Session,
    recipes_limit: Option<i64>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<AuthorView>, ApiError> {
    check_recipes_limit(recipes_limit)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
        ",
    )
    .bind(session.user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset.max(0))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let author_ids: Vec<Id> = rows.iter().map(|row| row.user.id).collect();
    let (mut recipes, counts) = list_author_recipes(&author_ids, recipes_limit, pool).await?;

    let views = rows
        .into_iter()
        .map(|row| author_view(row.user, true, &mut recipes, &counts))
        .collect();

    Ok(PageContext::from_rows(
        views,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset.max(0),
    ))
}
