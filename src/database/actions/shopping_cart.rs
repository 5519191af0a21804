use crate::{
    error::{FoodgramError, QueryError},
    schema::{RecipeShort, ShoppingListItem, Uuid},
    shopping_list::aggregate_shopping_list,
};

use sqlx::{Pool, Postgres};

use super::require_recipe;

pub async fn add_to_shopping_cart(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    let recipe = require_recipe(recipe_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::AlreadyInShoppingCart.into());
    }

    Ok(recipe.into())
}

pub async fn remove_from_shopping_cart(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    require_recipe(recipe_id, pool).await?;

    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("shopping cart entry").into());
    }

    Ok(())
}

/// Every ingredient line of every recipe in the user's cart, in the order the recipes were
/// added and the lines were written.
pub async fn list_shopping_cart_lines(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, potion::Error> {
    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        "
        SELECT i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit,
            ri.amount AS amount
        FROM shopping_cart s
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = s.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE s.user_id = $1
        ORDER BY s.id, ri.id
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Renders the user's shopping cart as the plain-text shopping list.
pub async fn export_shopping_list(user_id: Uuid, pool: &Pool<Postgres>) -> Result<String, potion::Error> {
    let lines = list_shopping_cart_lines(user_id, pool).await?;
    log::debug!("Exporting {} cart lines for user {user_id}", lines.len());

    Ok(aggregate_shopping_list(lines).collect())
}
