mod common;

use foodgram_sdk::{
    create_ingredient, create_tag, error::ApiError, find_tag_by_slug, import::parse_ingredient_csv,
    import_ingredients, list_tags, schema::{NewIngredient, NewTag}, search_ingredients,
};
use sqlx::PgPool;

use common::{admin, count, ingredient, user};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn import_skips_rows_already_present(pool: PgPool) {
    let records = parse_ingredient_csv("name,measurement_unit\nмука,г\nмолоко,мл\n").unwrap();

    assert_eq!(import_ingredients(&records, &pool).await.unwrap(), 2);
    assert_eq!(import_ingredients(&records, &pool).await.unwrap(), 0);
    assert_eq!(count("ingredients", &pool).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn search_matches_name_prefix_case_insensitively(pool: PgPool) {
    let admin = admin(&pool).await;
    ingredient(&admin, "Flour", "g", &pool).await;
    ingredient(&admin, "flaxseed", "g", &pool).await;
    ingredient(&admin, "Cauliflower", "g", &pool).await;

    let found = search_ingredients("FL", &pool).await.unwrap();
    let mut names: Vec<&str> = found.iter().map(|i| i.name.as_str()).collect();
    names.sort();

    assert_eq!(names, vec!["Flour", "flaxseed"]);
    assert!(search_ingredients("%", &pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn duplicated_ingredient_is_a_conflict(pool: PgPool) {
    let admin = admin(&pool).await;
    ingredient(&admin, "Salt", "g", &pool).await;

    let result = create_ingredient(
        &admin,
        &NewIngredient {
            name: "Salt".to_string(),
            measurement_unit: "g".to_string(),
        },
        &pool,
        None,
    )
    .await;

    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn only_admins_manage_tags(pool: PgPool) {
    let admin = admin(&pool).await;
    let cook = user("cook", &pool).await;
    let tag = NewTag {
        name: "Breakfast".to_string(),
        slug: "breakfast".to_string(),
        color: "#e26c2d".to_string(),
    };

    assert!(matches!(
        create_tag(&cook, &tag, &pool, None).await,
        Err(ApiError::Forbidden(_))
    ));

    let created = create_tag(&admin, &tag, &pool, None).await.unwrap();
    assert_eq!(created.color, "#E26C2D");
    assert_eq!(find_tag_by_slug("breakfast", &pool).await.unwrap(), Some(created));
    assert_eq!(list_tags(&pool).await.unwrap().len(), 1);
}
