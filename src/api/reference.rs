use std::convert::Infallible;

use warp::{http::StatusCode, reply::Response};

use crate::{
    actions,
    schema::{Ingredient, Tag, Uuid},
    CacheKeyType, RedisValue,
};

use super::{query::IngredientQuery, reply::json_reply, state::AppState};

async fn cached_tags(state: &AppState) -> Result<Vec<Tag>, potion::Error> {
    if let Some(mut cache) = state.cache.clone() {
        let pool = state.pool.clone();
        let key = CacheKeyType::Tags.new("all".to_owned());

        match RedisValue::get_or(key, &mut cache, move || async move {
            actions::list_tags(&pool).await
        })
        .await
        {
            Ok(tags) => return Ok(tags.value),
            Err(e) => log::warn!("Tag cache unavailable: {}", e.info.unwrap_or_default()),
        }
    }

    actions::list_tags(&state.pool).await
}

/// The full ingredient list is cached once and narrowed by `name` in process, so searches
/// never add keys to the cache.
async fn cached_ingredients(
    name: Option<String>,
    state: &AppState,
) -> Result<Vec<Ingredient>, potion::Error> {
    let name = name.filter(|name| !name.is_empty());

    if let Some(mut cache) = state.cache.clone() {
        let pool = state.pool.clone();
        let key = CacheKeyType::Ingredients.new("all".to_owned());

        match RedisValue::get_or(key, &mut cache, move || async move {
            actions::list_ingredients(None, &pool).await
        })
        .await
        {
            Ok(ingredients) => {
                return Ok(match name {
                    Some(name) => actions::filter_by_prefix(ingredients.value, &name),
                    None => ingredients.value,
                })
            }
            Err(e) => log::warn!("Ingredient cache unavailable: {}", e.info.unwrap_or_default()),
        }
    }

    actions::list_ingredients(name.as_deref(), &state.pool).await
}

pub async fn list_tags(state: AppState) -> Result<Response, Infallible> {
    json_reply(cached_tags(&state).await, StatusCode::OK)
}

pub async fn get_tag(id: Uuid, state: AppState) -> Result<Response, Infallible> {
    json_reply(actions::get_tag(id, &state.pool).await, StatusCode::OK)
}

pub async fn list_ingredients(query: IngredientQuery, state: AppState) -> Result<Response, Infallible> {
    json_reply(cached_ingredients(query.name, &state).await, StatusCode::OK)
}

pub async fn get_ingredient(id: Uuid, state: AppState) -> Result<Response, Infallible> {
    json_reply(actions::get_ingredient(id, &state.pool).await, StatusCode::OK)
}
