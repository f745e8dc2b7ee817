use std::collections::HashSet;

use crate::{
    constants::{
        DUPLICATE_INGREDIENTS, DUPLICATE_TAGS, EMPTY_INGREDIENTS, EMPTY_TAGS,
        MAX_INGREDIENT_NAME_LENGTH, MAX_MEASUREMENT_UNIT_LENGTH, MAX_RECIPE_NAME_LENGTH,
        MAX_TAG_NAME_LENGTH, MAX_TAG_SLUG_LENGTH, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
    },
    error::ApiError,
    schema::{Id, IngredientAmount, NewIngredient, NewTag, RecipePayload},
};

/// A recipe needs at least one ingredient and may list each ingredient only once.
pub fn validate_ingredients(ingredients: &[IngredientAmount]) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Err(ApiError::validation("ingredients", EMPTY_INGREDIENTS));
    }

    let mut seen = HashSet::with_capacity(ingredients.len());
    if !ingredients.iter().all(|item| seen.insert(item.id)) {
        return Err(ApiError::validation("ingredients", DUPLICATE_INGREDIENTS));
    }

    if let Some(item) = ingredients
        .iter()
        .find(|item| item.amount < MIN_INGREDIENT_AMOUNT)
    {
        return Err(ApiError::validation(
            "amount",
            &format!(
                "amount of ingredient {} must be at least {MIN_INGREDIENT_AMOUNT}",
                item.id
            ),
        ));
    }

    Ok(())
}

pub fn validate_tags(tags: &[Id]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(ApiError::validation("tags", EMPTY_TAGS));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    if !tags.iter().all(|tag| seen.insert(*tag)) {
        return Err(ApiError::validation("tags", DUPLICATE_TAGS));
    }

    Ok(())
}

fn validate_text(field: &str, value: &str, max_length: Option<usize>) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(field, "this field may not be blank"));
    }

    match max_length {
        Some(max) if value.chars().count() > max => Err(ApiError::validation(
            field,
            &format!("ensure this field has no more than {max} characters"),
        )),
        _ => Ok(()),
    }
}

impl RecipePayload {
    /// Runs every check of a recipe write. Nothing is persisted unless this passes.
    pub fn validate(&self, require_image: bool) -> Result<(), ApiError> {
        validate_text("name", &self.name, Some(MAX_RECIPE_NAME_LENGTH))?;
        validate_text("text", &self.text, None)?;

        match &self.image {
            Some(image) => validate_text("image", image, None)?,
            None if require_image => {
                return Err(ApiError::validation("image", "this field is required"))
            }
            None => {}
        }

        if self.cooking_time < MIN_COOKING_TIME {
            return Err(ApiError::validation(
                "cooking_time",
                &format!("cooking time must be at least {MIN_COOKING_TIME}"),
            ));
        }

        validate_ingredients(&self.ingredients)?;
        validate_tags(&self.tags)
    }
}

impl NewIngredient {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_text("name", &self.name, Some(MAX_INGREDIENT_NAME_LENGTH))?;
        validate_text(
            "measurement_unit",
            &self.measurement_unit,
            Some(MAX_MEASUREMENT_UNIT_LENGTH),
        )
    }
}

/// `#RGB` or `#RRGGBB`.
pub fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(digits) => {
            (digits.len() == 3 || digits.len() == 6)
                && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

pub fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl NewTag {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_text("name", &self.name, Some(MAX_TAG_NAME_LENGTH))?;
        validate_text("slug", &self.slug, Some(MAX_TAG_SLUG_LENGTH))?;

        if !is_slug(&self.slug) {
            return Err(ApiError::validation(
                "slug",
                "slug may contain only letters, numbers, underscores or hyphens",
            ));
        }
        if !is_hex_color(&self.color) {
            return Err(ApiError::validation(
                "color",
                "color must be a HEX code like #49B64E",
            ));
        }

        Ok(())
    }
}
