use std::collections::HashMap;

use crate::{
    error::{FoodgramError, QueryError},
    schema::{LinkedTag, Tag, Uuid},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

/// Inserts a tag. Returns `None` when a tag with the same slug already exists.
pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Uuid>, potion::Error> {
    let id: Option<(Uuid,)> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(name)
    .bind(color)
    .bind(slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(id.map(|tag| tag.0))
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| FoodgramError::NotFound(format!("tag {id}")).into())
}

pub async fn find_tag(name: &str, pool: &Pool<Postgres>) -> Result<Option<Uuid>, potion::Error> {
    let tag: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag.map(|tag| tag.0))
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_tags_by_ids(
    ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list.into_iter().map(|tag| (tag.id, tag)).collect())
}

/// Tags of every recipe in `recipe_ids`, grouped by recipe.
pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<Tag>>, potion::Error> {
    let list: Vec<LinkedTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let mut hashmap: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    list.into_iter()
        .for_each(|x| hashmap.entry(x.recipe_id).or_default().push(x.tag));

    Ok(hashmap)
}

/// Replaces the tag links of a recipe with `tag_ids`.
pub async fn replace_recipe_tags(
    recipe_id: Uuid,
    tag_ids: &[Uuid],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if !tag_ids.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(tag_ids, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
