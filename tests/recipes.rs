mod common;

use foodgram_sdk::{
    delete_ingredient, delete_recipe,
    error::ApiError,
    fetch_recipes, get_recipe_view,
    schema::{RecipeFilter, RelationKind, ToggleMethod},
    toggle_relationship, update_recipe, validate_and_persist_recipe, DUPLICATE_INGREDIENTS,
};
use sqlx::PgPool;

use common::{admin, count, ingredient, payload, recipe, tag, user};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn duplicate_ingredients_write_nothing(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;

    let result = validate_and_persist_recipe(
        &author,
        &payload("Bread", &[(flour.id, 100), (flour.id, 200)], &[lunch.id]),
        &pool,
    )
    .await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::validation("ingredients", DUPLICATE_INGREDIENTS)
    );
    assert_eq!(count("recipes", &pool).await, 0);
    assert_eq!(count("recipe_ingredients", &pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn unknown_ingredient_rolls_back_the_recipe(pool: PgPool) {
    let admin = admin(&pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;

    let result =
        validate_and_persist_recipe(&author, &payload("Bread", &[(999, 1)], &[lunch.id]), &pool)
            .await;

    assert_eq!(result.unwrap_err().field(), Some("ingredients"));
    assert_eq!(count("recipes", &pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn created_recipe_is_returned_with_its_composition(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let egg = ingredient(&admin, "Egg", "pcs", &pool).await;
    let breakfast = tag(&admin, "breakfast", "#E26C2D", &pool).await;
    let author = user("author", &pool).await;

    let view = recipe(
        &author,
        "Pancakes",
        &[(flour.id, 200), (egg.id, 2)],
        &[breakfast.id],
        &pool,
    )
    .await;

    assert_eq!(view.author.username, "author");
    assert_eq!(view.ingredients.len(), 2);
    assert_eq!(view.ingredients[0].name, "Flour");
    assert_eq!(view.ingredients[0].amount, 200);
    assert_eq!(view.tags[0].slug, "breakfast");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn update_replaces_ingredients_and_tags(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let milk = ingredient(&admin, "Milk", "ml", &pool).await;
    let breakfast = tag(&admin, "breakfast", "#E26C2D", &pool).await;
    let dinner = tag(&admin, "dinner", "#8775D2", &pool).await;
    let author = user("author", &pool).await;
    let created = recipe(&author, "Crepes", &[(flour.id, 100)], &[breakfast.id], &pool).await;

    let mut changes = payload("Crepes", &[(milk.id, 300)], &[dinner.id]);
    changes.image = None;
    let updated = update_recipe(&author, created.id, &changes, &pool).await.unwrap();

    assert_eq!(updated.image, created.image);
    assert_eq!(
        updated.ingredients.iter().map(|i| i.id).collect::<Vec<_>>(),
        vec![milk.id]
    );
    assert_eq!(updated.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![dinner.id]);
    assert_eq!(count("recipe_ingredients", &pool).await, 1);
    assert_eq!(count("recipe_tags", &pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn only_the_author_or_an_admin_may_change_a_recipe(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;
    let stranger = user("stranger", &pool).await;
    let bread = recipe(&author, "Bread", &[(flour.id, 500)], &[lunch.id], &pool).await;

    let result = delete_recipe(&stranger, bread.id, &pool).await;
    assert!(matches!(result, Err(ApiError::Forbidden(_))));

    delete_recipe(&admin, bread.id, &pool).await.unwrap();
    assert_eq!(count("recipes", &pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn deleting_a_recipe_cascades_to_its_rows(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;
    let bread = recipe(&author, "Bread", &[(flour.id, 500)], &[lunch.id], &pool).await;
    for kind in [RelationKind::Favorite, RelationKind::ShoppingCart] {
        toggle_relationship(&author, kind, bread.id, ToggleMethod::Add, None, &pool)
            .await
            .unwrap();
    }

    delete_recipe(&author, bread.id, &pool).await.unwrap();

    for table in ["recipe_ingredients", "recipe_tags", "favorite_recipes", "shopping_list"] {
        assert_eq!(count(table, &pool).await, 0, "{table}");
    }
    assert!(matches!(
        get_recipe_view(None, bread.id, &pool).await,
        Err(ApiError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn ingredient_used_by_a_recipe_cannot_be_deleted(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;
    recipe(&author, "Bread", &[(flour.id, 500)], &[lunch.id], &pool).await;

    let result = delete_ingredient(&admin, flour.id, &pool, None).await;

    assert_eq!(
        result.unwrap_err(),
        ApiError::conflict("the ingredient is used by existing recipes")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn recipes_are_filtered_by_tag_author_and_flags(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let breakfast = tag(&admin, "breakfast", "#E26C2D", &pool).await;
    let dinner = tag(&admin, "dinner", "#8775D2", &pool).await;
    let alice = user("alice", &pool).await;
    let bob = user("bob", &pool).await;
    let pancakes = recipe(&alice, "Pancakes", &[(flour.id, 200)], &[breakfast.id], &pool).await;
    recipe(&bob, "Pie", &[(flour.id, 300)], &[dinner.id], &pool).await;
    toggle_relationship(&bob, RelationKind::Favorite, pancakes.id, ToggleMethod::Add, None, &pool)
        .await
        .unwrap();

    let all = fetch_recipes(&RecipeFilter::default(), None, 0, &pool).await.unwrap();
    assert_eq!(all.total_rows, 2);
    assert_eq!(all.rows[0].name, "Pie");

    let by_tag = RecipeFilter {
        tags: vec!["breakfast".to_string()],
        ..Default::default()
    };
    let page = fetch_recipes(&by_tag, None, 0, &pool).await.unwrap();
    assert_eq!(page.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![pancakes.id]);

    let by_author = RecipeFilter {
        author: Some(bob.user_id),
        ..Default::default()
    };
    let page = fetch_recipes(&by_author, None, 0, &pool).await.unwrap();
    assert_eq!(page.rows[0].name, "Pie");

    let favorites = RecipeFilter {
        is_favorited: true,
        ..Default::default()
    };
    let page = fetch_recipes(&favorites, Some(&bob), 0, &pool).await.unwrap();
    assert_eq!(page.total_rows, 1);
    assert!(page.rows[0].is_favorited);

    let page = fetch_recipes(&favorites, None, 0, &pool).await.unwrap();
    assert!(page.rows.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn failed_update_keeps_the_stored_recipe(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let milk = ingredient(&admin, "Milk", "ml", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;
    let bread = recipe(&author, "Bread", &[(flour.id, 500)], &[lunch.id], &pool).await;
    recipe(&author, "Pie", &[(flour.id, 300)], &[lunch.id], &pool).await;

    let unknown_tag = update_recipe(
        &author,
        bread.id,
        &payload("Milk bread", &[(milk.id, 200)], &[999]),
        &pool,
    )
    .await;
    assert_eq!(unknown_tag.unwrap_err().field(), Some("tags"));

    let taken_name = update_recipe(
        &author,
        bread.id,
        &payload("Pie", &[(milk.id, 200)], &[lunch.id]),
        &pool,
    )
    .await;
    assert!(matches!(taken_name, Err(ApiError::Conflict(_))));

    let stored = get_recipe_view(None, bread.id, &pool).await.unwrap();
    assert_eq!(stored.name, "Bread");
    assert_eq!(
        stored
            .ingredients
            .iter()
            .map(|i| (i.id, i.amount))
            .collect::<Vec<_>>(),
        vec![(flour.id, 500)]
    );
    assert_eq!(stored.tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![lunch.id]);
    assert_eq!(count("recipe_ingredients", &pool).await, 2);
    assert_eq!(count("recipe_tags", &pool).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn stranger_is_forbidden_before_the_payload_is_checked(pool: PgPool) {
    let admin = admin(&pool).await;
    let flour = ingredient(&admin, "Flour", "g", &pool).await;
    let lunch = tag(&admin, "lunch", "#49B64E", &pool).await;
    let author = user("author", &pool).await;
    let stranger = user("stranger", &pool).await;
    let bread = recipe(&author, "Bread", &[(flour.id, 500)], &[lunch.id], &pool).await;

    let result = update_recipe(&stranger, bread.id, &payload("Bread", &[], &[lunch.id]), &pool).await;

    assert!(matches!(result, Err(ApiError::Forbidden(_))));
}
