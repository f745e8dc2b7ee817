pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const INGREDIENT_SEARCH_LIMIT: i64 = 50;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;
pub const MAX_INGREDIENT_NAME_LENGTH: usize = 200;
pub const MAX_MEASUREMENT_UNIT_LENGTH: usize = 50;
pub const MAX_TAG_NAME_LENGTH: usize = 70;
pub const MAX_TAG_SLUG_LENGTH: usize = 50;

pub const SHOPPING_LIST_SUFFIX: &str = "_shopping_list.txt";
pub const SHOPPING_LIST_CONTENT_TYPE: &str = "text/plain";
pub const DEFAULT_SHOPPING_LIST_TITLE: &str = "Foodgram";
pub const DEFAULT_INGREDIENTS_PATH: &str = "data/ingredients.csv";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub const EMPTY_INGREDIENTS: &str = "a recipe needs at least one ingredient";
pub const DUPLICATE_INGREDIENTS: &str = "ingredients must not be duplicated";
pub const EMPTY_TAGS: &str = "at least one tag required";
pub const DUPLICATE_TAGS: &str = "tags must not be duplicated";
pub const SELF_SUBSCRIPTION: &str = "you cannot subscribe to yourself";
pub const MISSING_RECIPE_INGREDIENT: &str = "an ingredient of the recipe does not exist";
pub const MISSING_RECIPE_TAG: &str = "a tag of the recipe does not exist";

/// Storage constraint name, offending field, message shown to the caller.
pub const CONSTRAINT_MESSAGES: &[(&str, &str, &str)] = &[
    ("unique_user_email", "email", "a user with this email already exists"),
    ("unique_user_username", "username", "a user with this username already exists"),
    (
        "unique_ingredient",
        "name",
        "an ingredient with this name and measurement unit already exists",
    ),
    ("unique_tag_name", "name", "a tag with this name already exists"),
    ("unique_tag_slug", "slug", "a tag with this slug already exists"),
    ("unique_tag_color", "color", "a tag with this color already exists"),
    ("tag_color_hex", "color", "color must be a HEX code like #49B64E"),
    ("unique_recipe_name", "name", "a recipe with this name already exists"),
    ("recipe_cooking_time_positive", "cooking_time", "cooking time must be at least 1"),
    ("unique_recipe_ingredient", "ingredients", DUPLICATE_INGREDIENTS),
    ("recipe_ingredient_amount_positive", "amount", "amount must be at least 1"),
    (
        "recipe_ingredient_ingredient_fk",
        "ingredient",
        "the ingredient is used by existing recipes",
    ),
    ("unique_favorite", "recipe", "the recipe is already in favorites"),
    ("unique_shopping_list_entry", "recipe", "the recipe is already in the shopping cart"),
    ("unique_subscription", "author", "you are already subscribed to this author"),
    ("self_subscription", "author", SELF_SUBSCRIPTION),
];

pub fn describe_constraint(constraint: &str) -> Option<(&'static str, &'static str)> {
    CONSTRAINT_MESSAGES
        .iter()
        .find(|(name, _, _)| *name == constraint)
        .map(|(_, field, message)| (*field, *message))
}
