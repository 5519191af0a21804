use std::collections::HashMap;

use crate::{
    error::{FoodgramError, QueryError},
    schema::{Ingredient, IngredientAmount, RecipeIngredientLine, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Escapes LIKE wildcards in `value` and turns it into a starts-with pattern.
pub fn like_prefix(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 1);
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Keeps the ingredients whose name starts with `name`, ignoring case, in their listed order.
pub fn filter_by_prefix(ingredients: Vec<Ingredient>, name: &str) -> Vec<Ingredient> {
    let prefix = name.to_lowercase();
    ingredients
        .into_iter()
        .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
        .collect()
}

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Uuid>, potion::Error> {
    let id: Option<(Uuid,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(id.map(|r| r.0))
}

/// Ingredients whose name starts with `name`, ignoring case. `None` lists everything.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = match name {
        Some(name) => sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY id")
            .bind(like_prefix(name))
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, potion::Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| FoodgramError::NotFound(format!("ingredient {id}")).into())
}

pub async fn find_ingredient(name: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, potion::Error> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM ingredients WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row.map(|r| r.0))
}

pub async fn get_ingredients_by_ids(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Ingredient>, potion::Error> {
    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

/// Ingredient lines of every recipe in `recipe_ids`, grouped by recipe.
pub async fn list_recipe_ingredients(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipeIngredientLine>>, potion::Error> {
    let rows: Vec<RecipeIngredientLine> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<RecipeIngredientLine>> = HashMap::new();
    rows.into_iter()
        .for_each(|x| hashmap.entry(x.recipe_id).or_default().push(x));

    Ok(hashmap)
}

/// Makes `ingredients` the complete ingredient set of a recipe. Every prior line of the
/// recipe is deleted before the new set is written.
pub async fn replace_recipe_ingredients(
    recipe_id: Uuid,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(ingredients, |mut b, line| {
            b.push_bind(recipe_id).push_bind(line.id).push_bind(line.amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{filter_by_prefix, like_prefix};
    use crate::schema::Ingredient;

    fn ingredient(id: i32, name: &str) -> Ingredient {
        Ingredient {
            id,
            name: name.to_owned(),
            measurement_unit: "g".to_owned(),
        }
    }

    #[test]
    fn prefix_pattern_escapes_wildcards() {
        assert_eq!(like_prefix("sal"), "sal%");
        assert_eq!(like_prefix("50%_"), "50\\%\\_%");
        assert_eq!(like_prefix("a\\b"), "a\\\\b%");
        assert_eq!(like_prefix(""), "%");
    }

    #[test]
    fn prefix_filter_ignores_case_and_keeps_order() {
        let all = vec![
            ingredient(1, "Salt"),
            ingredient(2, "sugar"),
            ingredient(3, "Sea salt"),
            ingredient(4, "Соль"),
        ];

        let found: Vec<i32> = filter_by_prefix(all.clone(), "S").iter().map(|i| i.id).collect();
        assert_eq!(found, vec![1, 2, 3]);

        let found: Vec<i32> = filter_by_prefix(all.clone(), "sAl").iter().map(|i| i.id).collect();
        assert_eq!(found, vec![1]);

        let found: Vec<i32> = filter_by_prefix(all.clone(), "со").iter().map(|i| i.id).collect();
        assert_eq!(found, vec![4]);

        assert_eq!(filter_by_prefix(all.clone(), "").len(), all.len());
        assert!(filter_by_prefix(all, "%").is_empty());
    }
}
