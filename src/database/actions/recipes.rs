use std::collections::HashMap;

use crate::{
    authentication::permissions::ActionType,
    error::{FoodgramError, QueryError},
    jwt::SessionData,
    pagination::{PageContext, PageQuery},
    schema::{Recipe, RecipeForm, RecipeRow, RecipeView, UserProfile, UserProfileRow, Uuid},
    validation::validate_recipe_form,
};

use super::{
    get_ingredients_by_ids, get_tags_by_ids, list_recipe_ingredients, list_recipe_tags,
    replace_recipe_ingredients, replace_recipe_tags,
};

use sqlx::{Pool, Postgres, QueryBuilder};

/// Narrowing of the recipe listing. Membership filters only apply to signed-in viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    query: PageQuery,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, potion::Error> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.*, COUNT(*) OVER() AS count, EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(
        ") AS is_favorited, EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ",
    );
    query_builder.push_bind(viewer);
    query_builder.push(") AS is_in_shopping_cart FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(" AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(query.limit)
        .push(" OFFSET ")
        .push_bind(query.offset());

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let views = assemble_recipes(rows, viewer, pool).await?;

    Ok(PageContext::from_rows(views, total_count, query, "/api/recipes/")?)
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Like [`get_recipe`], but an absent recipe is an error.
pub async fn require_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Recipe, potion::Error> {
    get_recipe(id, pool)
        .await?
        .ok_or_else(|| FoodgramError::NotFound(format!("recipe {id}")).into())
}

pub async fn get_recipe_view(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let row: Option<RecipeRow> = sqlx::query_as(
        "
        SELECT r.*, 1::BIGINT AS count,
            EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS(SELECT 1 FROM shopping_cart s WHERE s.recipe_id = r.id AND s.user_id = $2) AS is_in_shopping_cart
        FROM recipes r
        WHERE r.id = $1
    ",
    )
    .bind(id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    let row = row.ok_or_else(|| FoodgramError::NotFound(format!("recipe {id}")))?;

    assemble_recipes(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| FoodgramError::NotFound(format!("recipe {id}")).into())
}

/// Attaches tags, author profile and ingredient lines to each row, keeping row order.
async fn assemble_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Uuid> = rows.iter().map(|row| row.recipe.id).collect();
    let author_ids: Vec<Uuid> = rows.iter().map(|row| row.recipe.author_id).collect();

    let mut tags = list_recipe_tags(&recipe_ids, pool).await?;
    let mut ingredients = list_recipe_ingredients(&recipe_ids, pool).await?;

    let authors: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id) AS is_subscribed,
            0::BIGINT AS count
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(&author_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;
    let authors: HashMap<Uuid, UserProfile> = authors
        .into_iter()
        .map(|row| (row.profile.id, row.profile))
        .collect();

    rows.into_iter()
        .map(|row| -> Result<RecipeView, FoodgramError> {
            let recipe = row.recipe;
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| FoodgramError::NotFound(format!("user {}", recipe.author_id)))?;

            Ok(RecipeView {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Into::into)
                    .collect(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect::<Result<Vec<RecipeView>, FoodgramError>>()
        .map_err(Into::into)
}

/// Loads the referenced ingredients and tags and validates the form against them.
async fn check_recipe_form(
    form: &RecipeForm,
    is_create: bool,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let ingredient_ids: Vec<Uuid> = form.ingredients.iter().map(|i| i.id).collect();
    let ingredients = get_ingredients_by_ids(&ingredient_ids, pool).await?;
    let tags = get_tags_by_ids(&form.tags, pool).await?;

    validate_recipe_form(form, is_create, &ingredients, &tags).map_err(|e| {
        log::warn!("Rejected recipe '{}': {e}", form.name);
        e.into()
    })
}

/// Creates a recipe with its tag and ingredient sets in one transaction.
pub async fn create_recipe(
    author_id: Uuid,
    form: &RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<Uuid, potion::Error> {
    check_recipe_form(form, true, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Uuid,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&form.name)
    .bind(form.image.as_deref().unwrap_or_default())
    .bind(&form.text)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(id.0, &form.tags, &mut tr).await?;
    replace_recipe_ingredients(id.0, &form.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {} created by user {author_id}", id.0);
    Ok(id.0)
}

/// Updates a recipe. The submitted tag and ingredient sets replace the stored ones entirely;
/// an omitted image keeps the current one.
pub async fn update_recipe(id: Uuid, form: &RecipeForm, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    check_recipe_form(form, false, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image) WHERE id = $5",
    )
    .bind(&form.name)
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(form.image.as_deref().filter(|image| !image.is_empty()))
    .bind(id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::NotFound(format!("recipe {id}")).into());
    }

    replace_recipe_tags(id, &form.tags, &mut tr).await?;
    replace_recipe_ingredients(id, &form.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("Recipe {id} updated");
    Ok(())
}

/// Deletes a recipe. Its tag links, ingredient lines, favorites and cart entries go with it.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::NotFound(format!("recipe {id}")).into());
    }

    log::info!("Recipe {id} deleted");
    Ok(())
}

/// Fetches a recipe the session is allowed to modify: its own, or any for admins.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let recipe = require_recipe(id, pool).await?;

    match session.authenticate(ActionType::ManageAllRecipes) {
        Ok(_) => Ok(recipe),
        Err(_) => {
            if recipe.author_id != session.user_id {
                log::warn!("User {} tried to modify recipe {id}", session.username);
                Err(FoodgramError::Forbidden.into())
            } else {
                Ok(recipe)
            }
        }
    }
}
