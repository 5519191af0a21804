use std::collections::{HashMap, HashSet};

use crate::{
    error::FoodgramError,
    schema::{Ingredient, IngredientAmount, RecipeForm, Tag, Uuid},
    MAX_RECIPE_INGREDIENTS,
};

pub fn validate_cooking_time(cooking_time: i32) -> Result<(), FoodgramError> {
    if cooking_time < 1 {
        return Err(FoodgramError::InvalidCookingTime(cooking_time));
    }
    Ok(())
}

/// Returns the first ingredient id that occurs a second time, scanning in submission order.
pub fn find_duplicate_ingredient(ingredients: &[IngredientAmount]) -> Option<Uuid> {
    let mut seen = HashSet::with_capacity(ingredients.len());
    ingredients
        .iter()
        .find(|ingredient| !seen.insert(ingredient.id))
        .map(|ingredient| ingredient.id)
}

/// Checks a recipe's ingredient list against the ingredients that exist.
///
/// `known` must hold every existing ingredient referenced by `ingredients`. Repeats are
/// reported before missing ingredients or bad amounts.
pub fn validate_ingredients(
    ingredients: &[IngredientAmount],
    known: &HashMap<Uuid, Ingredient>,
) -> Result<(), FoodgramError> {
    if let Some(id) = find_duplicate_ingredient(ingredients) {
        let name = known
            .get(&id)
            .map(|ingredient| ingredient.name.to_owned())
            .unwrap_or_else(|| format!("#{id}"));
        return Err(FoodgramError::DuplicateIngredient { id, name });
    }

    for ingredient in ingredients {
        if !known.contains_key(&ingredient.id) {
            return Err(FoodgramError::NotFound(format!("ingredient {}", ingredient.id)));
        }
        if ingredient.amount < 1 {
            return Err(FoodgramError::InvalidAmount {
                id: ingredient.id,
                amount: ingredient.amount,
            });
        }
    }

    Ok(())
}

pub fn validate_tags(tags: &[Uuid], known: &HashMap<Uuid, Tag>) -> Result<(), FoodgramError> {
    match tags.iter().find(|id| !known.contains_key(id)) {
        Some(id) => Err(FoodgramError::NotFound(format!("tag {id}"))),
        None => Ok(()),
    }
}

/// Full validation of a recipe payload. `is_create` requires an image to be present.
pub fn validate_recipe_form(
    form: &RecipeForm,
    is_create: bool,
    ingredients: &HashMap<Uuid, Ingredient>,
    tags: &HashMap<Uuid, Tag>,
) -> Result<(), FoodgramError> {
    if is_create && form.image.as_deref().map_or(true, str::is_empty) {
        return Err(FoodgramError::MissingField("image"));
    }
    if form.ingredients.is_empty() {
        return Err(FoodgramError::MissingField("ingredients"));
    }
    if form.ingredients.len() > MAX_RECIPE_INGREDIENTS {
        return Err(FoodgramError::TooManyIngredients {
            count: form.ingredients.len(),
            max: MAX_RECIPE_INGREDIENTS,
        });
    }
    validate_ingredients(&form.ingredients, ingredients)?;
    validate_tags(&form.tags, tags)?;
    validate_cooking_time(form.cooking_time)
}

pub fn validate_subscription(
    user_id: Uuid,
    author_id: Uuid,
    already_subscribed: bool,
) -> Result<(), FoodgramError> {
    if user_id == author_id {
        return Err(FoodgramError::SelfSubscription);
    }
    if already_subscribed {
        return Err(FoodgramError::DuplicateSubscription);
    }
    Ok(())
}

/// Usernames may only contain word characters and `.@+-`.
pub fn validate_username(username: &str) -> Result<(), FoodgramError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));

    if !valid {
        return Err(FoodgramError::InvalidUsername(username.to_owned()));
    }
    Ok(())
}

pub fn validate_password_change(
    current_password_valid: bool,
    current_password: &str,
    new_password: &str,
) -> Result<(), FoodgramError> {
    if current_password == new_password {
        return Err(FoodgramError::SamePassword);
    }
    if !current_password_valid {
        return Err(FoodgramError::InvalidCredentials);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredients(list: &[(Uuid, &str)]) -> HashMap<Uuid, Ingredient> {
        list.iter()
            .map(|(id, name)| {
                (
                    *id,
                    Ingredient {
                        id: *id,
                        name: name.to_string(),
                        measurement_unit: "g".to_owned(),
                    },
                )
            })
            .collect()
    }

    fn amount(id: Uuid, amount: i32) -> IngredientAmount {
        IngredientAmount { id, amount }
    }

    fn form(items: Vec<IngredientAmount>, cooking_time: i32) -> RecipeForm {
        RecipeForm {
            ingredients: items,
            tags: vec![],
            image: Some("recipes/images/soup.png".to_owned()),
            name: "Soup".to_owned(),
            text: "Boil".to_owned(),
            cooking_time,
        }
    }

    #[test]
    fn repeated_ingredient_is_rejected_by_name() {
        let known = ingredients(&[(1, "Salt")]);
        let result = validate_ingredients(&[amount(1, 5), amount(1, 2)], &known);

        assert_eq!(
            result,
            Err(FoodgramError::DuplicateIngredient {
                id: 1,
                name: "Salt".to_owned()
            })
        );
    }

    #[test]
    fn first_repeat_is_the_one_reported() {
        let list = [amount(3, 1), amount(2, 1), amount(2, 1), amount(3, 1)];
        assert_eq!(find_duplicate_ingredient(&list), Some(2));
        assert_eq!(find_duplicate_ingredient(&list[..2]), None);
    }

    #[test]
    fn unknown_ingredient_and_bad_amount_are_rejected() {
        let known = ingredients(&[(1, "Salt")]);

        assert_eq!(
            validate_ingredients(&[amount(2, 1)], &known),
            Err(FoodgramError::NotFound("ingredient 2".to_owned()))
        );
        assert_eq!(
            validate_ingredients(&[amount(1, 0)], &known),
            Err(FoodgramError::InvalidAmount { id: 1, amount: 0 })
        );
        assert_eq!(validate_ingredients(&[amount(1, 1)], &known), Ok(()));
    }

    #[test]
    fn cooking_time_must_be_positive() {
        assert_eq!(validate_cooking_time(0), Err(FoodgramError::InvalidCookingTime(0)));
        assert_eq!(validate_cooking_time(-5), Err(FoodgramError::InvalidCookingTime(-5)));
        assert_eq!(validate_cooking_time(1), Ok(()));
    }

    #[test]
    fn recipe_form_checks_cooking_time() {
        let known = ingredients(&[(1, "Salt")]);
        let result = validate_recipe_form(&form(vec![amount(1, 1)], 0), true, &known, &HashMap::new());

        assert_eq!(result, Err(FoodgramError::InvalidCookingTime(0)));
    }

    #[test]
    fn recipe_form_requires_image_only_on_create() {
        let known = ingredients(&[(1, "Salt")]);
        let mut payload = form(vec![amount(1, 1)], 10);
        payload.image = None;

        assert_eq!(
            validate_recipe_form(&payload, true, &known, &HashMap::new()),
            Err(FoodgramError::MissingField("image"))
        );
        assert_eq!(validate_recipe_form(&payload, false, &known, &HashMap::new()), Ok(()));
    }

    #[test]
    fn recipe_form_caps_ingredient_count() {
        let ids: Vec<Uuid> = (1..=MAX_RECIPE_INGREDIENTS as Uuid + 1).collect();
        let names: Vec<String> = ids.iter().map(|id| format!("Spice {id}")).collect();
        let known = ingredients(
            &ids.iter()
                .zip(&names)
                .map(|(id, name)| (*id, name.as_str()))
                .collect::<Vec<_>>(),
        );

        let full = form(ids.iter().map(|&id| amount(id, 1)).collect(), 10);
        assert_eq!(
            validate_recipe_form(&full, true, &known, &HashMap::new()),
            Err(FoodgramError::TooManyIngredients {
                count: MAX_RECIPE_INGREDIENTS + 1,
                max: MAX_RECIPE_INGREDIENTS
            })
        );

        let capped = form(full.ingredients[..MAX_RECIPE_INGREDIENTS].to_vec(), 10);
        assert_eq!(validate_recipe_form(&capped, true, &known, &HashMap::new()), Ok(()));
    }

    #[test]
    fn recipe_form_rejects_unknown_tags() {
        let known = ingredients(&[(1, "Salt")]);
        let mut payload = form(vec![amount(1, 1)], 10);
        payload.tags = vec![4];

        assert_eq!(
            validate_recipe_form(&payload, true, &known, &HashMap::new()),
            Err(FoodgramError::NotFound("tag 4".to_owned()))
        );
    }

    #[test]
    fn subscriptions_reject_self_and_repeats() {
        assert_eq!(validate_subscription(1, 1, false), Err(FoodgramError::SelfSubscription));
        assert_eq!(
            validate_subscription(1, 2, true),
            Err(FoodgramError::DuplicateSubscription)
        );
        assert_eq!(validate_subscription(1, 2, false), Ok(()));
    }

    #[test]
    fn usernames_allow_word_characters_and_punctuation() {
        assert!(validate_username("chef.anna+test@home-1").is_ok());
        assert!(validate_username("повар_1").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn password_change_requires_new_and_valid_password() {
        assert_eq!(
            validate_password_change(true, "same", "same"),
            Err(FoodgramError::SamePassword)
        );
        assert_eq!(
            validate_password_change(false, "old", "new"),
            Err(FoodgramError::InvalidCredentials)
        );
        assert_eq!(validate_password_change(true, "old", "new"), Ok(()));
    }
}
