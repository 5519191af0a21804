use std::collections::HashMap;

use crate::{
    error::{FoodgramError, QueryError},
    pagination::{PageContext, PageQuery},
    schema::{Recipe, RecipeShort, SubscriptionView, UserProfile, UserProfileRow, Uuid},
    validation::validate_subscription,
};

use sqlx::{Pool, Postgres};

use super::get_user_profile;

/// Subscribes `user_id` to `author_id` and returns the author with their latest recipes.
pub async fn subscribe(
    user_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionView, potion::Error> {
    // Existence first so an unknown author is a 404 rather than a validation error
    let author = get_user_profile(author_id, Some(user_id), pool).await?;
    validate_subscription(user_id, author_id, author.is_subscribed)?;

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    // Lost a race against a concurrent subscribe
    if result.rows_affected() == 0 {
        return Err(FoodgramError::DuplicateSubscription.into());
    }

    log::info!("User {user_id} subscribed to {author_id}");

    let author = UserProfile {
        is_subscribed: true,
        ..author
    };
    let mut views = attach_recipes(vec![author], recipes_limit, pool).await?;
    views
        .pop()
        .ok_or_else(|| FoodgramError::NotFound(format!("user {author_id}")).into())
}

pub async fn unsubscribe(user_id: Uuid, author_id: Uuid, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    get_user_profile(author_id, Some(user_id), pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(FoodgramError::not_found("subscription").into());
    }

    Ok(())
}

/// Authors `user_id` follows, in subscription order, each with up to `recipes_limit` of
/// their newest recipes. `None` includes every recipe.
pub async fn list_subscriptions(
    user_id: Uuid,
    query: PageQuery,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<SubscriptionView>, potion::Error> {
    let rows: Vec<UserProfileRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(query.limit)
    .bind(query.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);
    let authors = rows.into_iter().map(|row| row.profile).collect();
    let views = attach_recipes(authors, recipes_limit, pool).await?;

    Ok(PageContext::from_rows(views, total_count, query, "/api/users/subscriptions/")?)
}

async fn attach_recipes(
    authors: Vec<UserProfile>,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionView>, potion::Error> {
    if authors.is_empty() {
        return Ok(vec![]);
    }
    let author_ids: Vec<Uuid> = authors.iter().map(|a| a.id).collect();

    let recipes: Vec<Recipe> = sqlx::query_as(
        "
        SELECT id, author_id, name, image, text, cooking_time
        FROM (
            SELECT r.*, ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY id DESC
    ",
    )
    .bind(&author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let counts: Vec<(Uuid, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(&author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;
    let counts: HashMap<Uuid, i64> = counts.into_iter().collect();

    let mut by_author: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    recipes
        .into_iter()
        .for_each(|r| by_author.entry(r.author_id).or_default().push(r.into()));

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionView {
            recipes: by_author.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author,
        })
        .collect())
}
