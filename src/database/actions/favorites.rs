use crate::{
    error::{FoodgramError, QueryError},
    schema::{RecipeShort, Uuid},
};

use sqlx::{Pool, Postgres};

use super::require_recipe;

/// Marks a recipe as favorite. Adding the same recipe twice is rejected.
pub async fn add_favorite(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, potion::Error> {
    let recipe = require_recipe(recipe_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::AlreadyInFavorites.into());
    }

    Ok(recipe.into())
}

pub async fn remove_favorite(
    user_id: Uuid,
    recipe_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    require_recipe(recipe_id, pool).await?;

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("favorite").into());
    }

    Ok(())
}
