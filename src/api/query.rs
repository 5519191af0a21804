use serde::Deserialize;

use crate::{actions::RecipeFilter, error::FoodgramError, pagination::PageQuery, schema::Uuid};

/// Raw query string pairs. Repeated keys (`?tags=a&tags=b`) are kept.
pub type QueryPairs = Vec<(String, String)>;

fn values<'a>(pairs: &'a QueryPairs, key: &'a str) -> impl Iterator<Item = &'a str> {
    pairs
        .iter()
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn last_value<'a>(pairs: &'a QueryPairs, key: &'a str) -> Option<&'a str> {
    values(pairs, key).last()
}

fn parse_int<T: std::str::FromStr>(pairs: &QueryPairs, key: &str) -> Result<Option<T>, FoodgramError> {
    last_value(pairs, key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| FoodgramError::InvalidQuery(format!("{key}={value}")))
        })
        .transpose()
}

fn parse_flag(pairs: &QueryPairs, key: &str) -> Result<bool, FoodgramError> {
    match last_value(pairs, key) {
        None => Ok(false),
        Some("1" | "true" | "True") => Ok(true),
        Some("0" | "false" | "False" | "") => Ok(false),
        Some(value) => Err(FoodgramError::InvalidQuery(format!("{key}={value}"))),
    }
}

pub fn parse_page(pairs: &QueryPairs) -> Result<PageQuery, FoodgramError> {
    Ok(PageQuery::new(
        parse_int(pairs, "page")?,
        parse_int(pairs, "limit")?,
    ))
}

pub fn parse_recipe_query(pairs: &QueryPairs) -> Result<(PageQuery, RecipeFilter), FoodgramError> {
    let filter = RecipeFilter {
        tags: values(pairs, "tags")
            .filter(|slug| !slug.is_empty())
            .map(str::to_owned)
            .collect(),
        author: parse_int::<Uuid>(pairs, "author")?,
        is_favorited: parse_flag(pairs, "is_favorited")?,
        is_in_shopping_cart: parse_flag(pairs, "is_in_shopping_cart")?,
    };

    Ok((parse_page(pairs)?, filter))
}

/// `recipes_limit` of the subscription endpoints. Absent means every recipe.
pub fn parse_recipes_limit(pairs: &QueryPairs) -> Result<Option<i64>, FoodgramError> {
    match parse_int::<i64>(pairs, "recipes_limit")? {
        Some(limit) if limit < 0 => Err(FoodgramError::InvalidQuery(format!(
            "recipes_limit={limit}"
        ))),
        limit => Ok(limit),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}
