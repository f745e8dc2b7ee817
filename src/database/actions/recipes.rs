use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    constants::{MISSING_RECIPE_INGREDIENT, MISSING_RECIPE_TAG, RECIPE_COUNT_PER_PAGE},
    error::{ApiError, QueryError},
    pagination::PageContext,
    permissions::ActionType,
    schema::{
        Id, Recipe, RecipeFilter, RecipeIngredient, RecipePayload, RecipeRow, RecipeShort,
        RecipeTagRow, RecipeView, RelationKind, Tag, User, UserView,
    },
    session::Session,
};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let recipe: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(recipe)
}

pub async fn get_recipe_short(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeShort>, ApiError> {
    let recipe: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(recipe)
}

/// Fetches a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &Session,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    match get_recipe(id, pool).await? {
        Some(recipe) => {
            session.authenticate_owner(recipe.author_id)?;
            Ok(recipe)
        }
        None => Err(ApiError::not_found("no recipe exists with specified id")),
    }
}

async fn unknown_id(
    table: &str,
    ids: &[Id],
    conn: &mut PgConnection,
) -> Result<Option<Id>, ApiError> {
    let known: Vec<(Id,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    let known: HashSet<Id> = known.into_iter().map(|row| row.0).collect();

    Ok(ids.iter().copied().find(|id| !known.contains(id)))
}

async fn ensure_known_ids(payload: &RecipePayload, conn: &mut PgConnection) -> Result<(), ApiError> {
    let ingredient_ids: Vec<Id> = payload.ingredients.iter().map(|item| item.id).collect();

    if let Some(id) = unknown_id("ingredients", &ingredient_ids, conn).await? {
        return Err(ApiError::validation(
            "ingredients",
            &format!("ingredient {id} does not exist"),
        ));
    }

    if let Some(id) = unknown_id("tags", &payload.tags, conn).await? {
        return Err(ApiError::validation("tags", &format!("tag {id} does not exist")));
    }

    Ok(())
}

/// Replaces the ingredient rows and the tag set of a recipe. Expects a
/// validated, non-empty payload.
async fn replace_recipe_composition(
    recipe_id: Id,
    payload: &RecipePayload,
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(payload.ingredients.iter(), |mut b, item| {
        b.push_bind(recipe_id)
            .push_bind(item.id)
            .push_bind(item.amount);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            QueryError::from(e).or_missing_reference("ingredients", MISSING_RECIPE_INGREDIENT)
        })?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(payload.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| QueryError::from(e).or_missing_reference("tags", MISSING_RECIPE_TAG))?;

    Ok(())
}

/// Creates a recipe authored by the session together with its ingredients and tags.
pub async fn validate_and_persist_recipe(
    session: &Session,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    session.authenticate(ActionType::CreateRecipes)?;
    payload.validate(true)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_known_ids(payload, &mut *tr).await?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (name, author_id, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(payload.name.trim())
    .bind(session.user_id)
    .bind(&payload.text)
    .bind(&payload.image)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_composition(id.0, payload, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("{} created recipe {}", session.username, id.0);
    get_recipe_view(Some(session), id.0, pool).await
}

/// Overwrites every field of the recipe. A missing image keeps the stored one.
pub async fn update_recipe(
    session: &Session,
    id: Id,
    payload: &RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    get_recipe_mut(id, session, pool).await?;
    payload.validate(false)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_known_ids(payload, &mut *tr).await?;

    let result = sqlx::query(
        "
        UPDATE recipes
        SET name = $1, text = $2, image = COALESCE($3, image), cooking_time = $4
        WHERE id = $5
        ",
    )
    .bind(payload.name.trim())
    .bind(&payload.text)
    .bind(&payload.image)
    .bind(payload.cooking_time)
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("no recipe exists with specified id"));
    }

    replace_recipe_composition(id, payload, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    get_recipe_view(Some(session), id, pool).await
}

/// Ingredient rows, tag links, favorites and cart entries go with the recipe.
pub async fn delete_recipe(session: &Session, id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("{} deleted recipe {id}", session.username);
    Ok(())
}

pub async fn get_recipe_view(
    viewer: Option<&Session>,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("no recipe exists with specified id"))?;

    hydrate_recipes(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("no recipe exists with specified id"))
}

/// Newest first. Favorite and cart filters match nothing for anonymous viewers.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<&Session>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, ApiError> {
    if viewer.is_none() && (filter.is_favorited || filter.is_in_shopping_cart) {
        return Ok(PageContext::no_rows());
    }
    let offset = offset.max(0);

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.as_slice())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorite_recipes f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_list s WHERE s.recipe_id = r.id AND s.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
    }

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(RECIPE_COUNT_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let views = hydrate_recipes(recipes, viewer, pool).await?;

    Ok(PageContext::from_rows(
        views,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}

/// Target ids among `ids` the viewer holds a relation of `kind` with.
async fn viewer_relation_ids(
    viewer: Option<&Session>,
    kind: RelationKind,
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    let viewer = match viewer {
        Some(viewer) => viewer,
        None => return Ok(HashSet::new()),
    };

    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT {column} FROM {table} WHERE user_id = $1 AND {column} = ANY($2)",
        column = kind.target_column(),
        table = kind.table()
    ))
    .bind(viewer.user_id)
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Loads authors, ingredients, tags and viewer flags for a page of recipes in
/// a fixed number of queries. Order of `recipes` is kept.
async fn hydrate_recipes(
    recipes: Vec<Recipe>,
    viewer: Option<&Session>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, ApiError> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(&author_ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;
    let authors: HashMap<Id, User> = authors.into_iter().map(|user| (user.id, user)).collect();

    let ingredients: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS id, i.name AS name,
               i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let tags: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
        ",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let favorited = viewer_relation_ids(viewer, RelationKind::Favorite, &ids, pool).await?;
    let in_cart = viewer_relation_ids(viewer, RelationKind::ShoppingCart, &ids, pool).await?;
    let subscribed =
        viewer_relation_ids(viewer, RelationKind::Subscription, &author_ids, pool).await?;

    let mut ingredient_map: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    ingredients.into_iter().for_each(|ingredient| {
        ingredient_map
            .entry(ingredient.recipe_id)
            .or_default()
            .push(ingredient);
    });

    let mut tag_map: HashMap<Id, Vec<Tag>> = HashMap::new();
    tags.into_iter().for_each(|row| {
        tag_map.entry(row.recipe_id).or_default().push(row.tag);
    });

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                ApiError::Storage(format!(
                    "author {} of recipe {} is missing",
                    recipe.author_id, recipe.id
                ))
            })?;

            Ok(RecipeView {
                id: recipe.id,
                author: UserView::from_user(author, subscribed.contains(&recipe.author_id)),
                tags: tag_map.remove(&recipe.id).unwrap_or_default(),
                ingredients: ingredient_map.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}
