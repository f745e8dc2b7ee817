use chrono::Local;
use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, QueryError},
    report::{ShoppingList, ShoppingListFile},
    schema::CartIngredientRow,
    session::Account,
};

/// Sums every ingredient of the recipes in the account's cart into a text file.
pub async fn build_shopping_list<A: Account>(
    account: &A,
    title: &str,
    pool: &Pool<Postgres>,
) -> Result<ShoppingListFile, ApiError> {
    let list = load_shopping_list(account, pool).await?;

    log::trace!(
        "> Rendering {} shopping list lines for {}",
        list.lines.len(),
        account.username()
    );
    Ok(ShoppingListFile::new(account.username(), list.render(title)))
}

/// The aggregated list without rendering. Fails with `EmptyCart` when the cart has no recipes.
pub async fn load_shopping_list<A: Account>(
    account: &A,
    pool: &Pool<Postgres>,
) -> Result<ShoppingList, ApiError> {
    // Every stored recipe has at least one ingredient, so no rows means an empty cart.
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_list s
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = s.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE s.user_id = $1
        ",
    )
    .bind(account.id())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    if rows.is_empty() {
        return Err(ApiError::EmptyCart);
    }

    Ok(ShoppingList::from_rows(
        account.username(),
        Local::now().naive_local(),
        rows,
    ))
}
