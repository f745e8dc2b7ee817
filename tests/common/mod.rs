#![allow(dead_code)]

use foodgram_sdk::{
    create_ingredient, create_tag, create_user, validate_and_persist_recipe,
    schema::{Id, Ingredient, IngredientAmount, NewIngredient, NewTag, NewUser, RecipePayload, RecipeView, Tag, UserRole},
    session::Session,
};
use sqlx::PgPool;

pub async fn user(username: &str, pool: &PgPool) -> Session {
    let user = create_user(
        &NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
        },
        pool,
    )
    .await
    .unwrap();

    Session::from(&user)
}

pub async fn admin(pool: &PgPool) -> Session {
    let session = user("admin", pool).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await
        .unwrap();

    Session::new(session.user_id, &session.username, UserRole::Admin)
}

pub async fn ingredient(admin: &Session, name: &str, unit: &str, pool: &PgPool) -> Ingredient {
    create_ingredient(
        admin,
        &NewIngredient {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        },
        pool,
        None,
    )
    .await
    .unwrap()
}

pub async fn tag(admin: &Session, slug: &str, color: &str, pool: &PgPool) -> Tag {
    create_tag(
        admin,
        &NewTag {
            name: slug.to_string(),
            slug: slug.to_string(),
            color: color.to_string(),
        },
        pool,
        None,
    )
    .await
    .unwrap()
}

pub fn payload(name: &str, ingredients: &[(Id, i32)], tags: &[Id]) -> RecipePayload {
    RecipePayload {
        name: name.to_string(),
        text: format!("How to make {name}"),
        image: Some(format!("recipes/images/{name}.png")),
        cooking_time: 20,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientAmount {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
    }
}

pub async fn recipe(
    author: &Session,
    name: &str,
    ingredients: &[(Id, i32)],
    tags: &[Id],
    pool: &PgPool,
) -> RecipeView {
    validate_and_persist_recipe(author, &payload(name, ingredients, tags), pool)
        .await
        .unwrap()
}

pub async fn count(table: &str, pool: &PgPool) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}
