pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Ingredient lines a single recipe may carry. Keeps the bulk insert under the bind limit.
pub const MAX_RECIPE_INGREDIENTS: usize = 100;

pub const TOKEN_PREFIX: &str = "Token ";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const TAG_CACHE_BIND: &str = "tag-cache-key";
pub const INGREDIENT_CACHE_BIND: &str = "ingredient-cache-key";

pub const MAX_BODY_SIZE: u64 = 1024 * 1024 * 16;
