//! Storage-backed tests. They need a PostgreSQL server in `DATABASE_URL`; run them with
//! `cargo test -- --ignored`.

use foodgram::{
    actions::{self, RecipeFilter},
    pagination::PageQuery,
    schema::{IngredientAmount, RecipeForm, UserForm, Uuid},
};
use sqlx::PgPool;

async fn user(pool: &PgPool, username: &str) -> Uuid {
    let form = UserForm {
        email: format!("{username}@example.com"),
        username: username.to_owned(),
        first_name: "Test".to_owned(),
        last_name: "User".to_owned(),
        password: "correct-horse".to_owned(),
    };

    actions::register_user(&form, pool)
        .await
        .unwrap_or_else(|_| panic!("failed to register {username}"))
        .id
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Uuid {
    actions::create_ingredient(name, unit, pool)
        .await
        .unwrap_or_else(|_| panic!("failed to create {name}"))
        .unwrap_or_else(|| panic!("{name} already exists"))
}

async fn tag(pool: &PgPool, slug: &str) -> Uuid {
    actions::create_tag(slug, "#E26C2D", slug, pool)
        .await
        .unwrap_or_else(|_| panic!("failed to create tag {slug}"))
        .unwrap_or_else(|| panic!("{slug} already exists"))
}

fn form(ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> RecipeForm {
    RecipeForm {
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: tags.to_vec(),
        image: Some("recipes/images/soup.png".to_owned()),
        name: "Soup".to_owned(),
        text: "Boil everything".to_owned(),
        cooking_time: 30,
    }
}

async fn recipe(pool: &PgPool, author: Uuid, ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> Uuid {
    actions::create_recipe(author, &form(ingredients, tags), pool)
        .await
        .unwrap_or_else(|_| panic!("failed to create recipe"))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn update_replaces_ingredient_set(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let a = ingredient(&pool, "flour", "g").await;
    let b = ingredient(&pool, "milk", "ml").await;
    let id = recipe(&pool, author, &[(a, 2), (b, 3)], &[]).await;

    let update = RecipeForm {
        image: None,
        ..form(&[(b, 5)], &[])
    };
    actions::update_recipe(id, &update, &pool)
        .await
        .unwrap_or_else(|_| panic!("update failed"));

    let view = actions::get_recipe_view(id, None, &pool)
        .await
        .unwrap_or_else(|_| panic!("recipe missing"));
    assert_eq!(view.ingredients.len(), 1);
    assert_eq!(view.ingredients[0].id, b);
    assert_eq!(view.ingredients[0].amount, 5);
    assert_eq!(view.image, "recipes/images/soup.png");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn invalid_recipe_is_not_written(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let a = ingredient(&pool, "salt", "g").await;

    let duplicate = form(&[(a, 1), (a, 2)], &[]);
    let error = actions::create_recipe(author, &duplicate, &pool).await.err();
    assert_eq!(error.map(|e| e.code as u16), Some(400));

    let zero_time = RecipeForm {
        cooking_time: 0,
        ..form(&[(a, 1)], &[])
    };
    assert!(actions::create_recipe(author, &zero_time, &pool).await.is_err());

    let listing = actions::fetch_recipes(&RecipeFilter::default(), PageQuery::default(), None, &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_recipe_cascades(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let eater = user(&pool, "eater").await;
    let a = ingredient(&pool, "rice", "g").await;
    let lunch = tag(&pool, "lunch").await;
    let id = recipe(&pool, author, &[(a, 100)], &[lunch]).await;

    actions::add_favorite(eater, id, &pool)
        .await
        .unwrap_or_else(|_| panic!("favorite failed"));
    actions::add_to_shopping_cart(eater, id, &pool)
        .await
        .unwrap_or_else(|_| panic!("cart failed"));

    actions::delete_recipe(id, &pool)
        .await
        .unwrap_or_else(|_| panic!("delete failed"));

    for table in ["recipe_ingredients", "recipe_tags", "favorites", "shopping_cart"] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(count.0, 0, "{table}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn favorites_and_cart_reject_duplicates(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let a = ingredient(&pool, "egg", "pcs").await;
    let id = recipe(&pool, author, &[(a, 2)], &[]).await;

    assert!(actions::add_favorite(author, id, &pool).await.is_ok());
    assert!(actions::add_favorite(author, id, &pool).await.is_err());
    assert!(actions::add_to_shopping_cart(author, id, &pool).await.is_ok());
    assert!(actions::add_to_shopping_cart(author, id, &pool).await.is_err());

    assert!(actions::remove_favorite(author, id, &pool).await.is_ok());
    let error = actions::remove_favorite(author, id, &pool).await.err();
    assert_eq!(error.map(|e| e.code as u16), Some(404));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscriptions_reject_self_and_repeats(pool: PgPool) {
    let follower = user(&pool, "follower").await;
    let author = user(&pool, "author").await;
    let a = ingredient(&pool, "tea", "g").await;
    recipe(&pool, author, &[(a, 5)], &[]).await;
    recipe(&pool, author, &[(a, 7)], &[]).await;

    assert!(actions::subscribe(follower, follower, None, &pool).await.is_err());

    let view = actions::subscribe(follower, author, Some(1), &pool)
        .await
        .unwrap_or_else(|_| panic!("subscribe failed"));
    assert!(view.author.is_subscribed);
    assert_eq!(view.recipes.len(), 1);
    assert_eq!(view.recipes_count, 2);

    assert!(actions::subscribe(follower, author, None, &pool).await.is_err());
    assert!(actions::unsubscribe(follower, author, &pool).await.is_ok());
    assert!(actions::unsubscribe(follower, author, &pool).await.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn shopping_list_sums_across_cart(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let flour = ingredient(&pool, "wheat flour", "g").await;
    let eggs = ingredient(&pool, "eggs", "pcs").await;
    let bread = recipe(&pool, author, &[(flour, 500), (eggs, 1)], &[]).await;
    let cake = recipe(&pool, author, &[(eggs, 3), (flour, 200)], &[]).await;

    actions::add_to_shopping_cart(author, bread, &pool)
        .await
        .unwrap_or_else(|_| panic!("cart failed"));
    actions::add_to_shopping_cart(author, cake, &pool)
        .await
        .unwrap_or_else(|_| panic!("cart failed"));

    let list = actions::export_shopping_list(author, &pool)
        .await
        .unwrap_or_else(|_| panic!("export failed"));
    assert_eq!(list, "Wheat Flour (g) -- 700\nEggs (pcs) -- 4\n");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_filters_by_tag_and_cart(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let a = ingredient(&pool, "oats", "g").await;
    let breakfast = tag(&pool, "breakfast").await;
    let dinner = tag(&pool, "dinner").await;
    let porridge = recipe(&pool, author, &[(a, 50)], &[breakfast]).await;
    recipe(&pool, author, &[(a, 80)], &[dinner]).await;

    let filter = RecipeFilter {
        tags: vec!["breakfast".to_owned()],
        ..RecipeFilter::default()
    };
    let listing = actions::fetch_recipes(&filter, PageQuery::default(), None, &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 1);
    assert_eq!(listing.results[0].id, porridge);

    actions::add_to_shopping_cart(author, porridge, &pool)
        .await
        .unwrap_or_else(|_| panic!("cart failed"));
    let filter = RecipeFilter {
        is_in_shopping_cart: true,
        ..RecipeFilter::default()
    };

    let listing = actions::fetch_recipes(&filter, PageQuery::default(), Some(author), &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 1);
    assert!(listing.results[0].is_in_shopping_cart);

    // Anonymous viewers are not narrowed by membership filters
    let listing = actions::fetch_recipes(&filter, PageQuery::default(), None, &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn page_past_the_end_is_not_found(pool: PgPool) {
    let author = user(&pool, "cook").await;
    let a = ingredient(&pool, "beans", "g").await;
    recipe(&pool, author, &[(a, 10)], &[]).await;
    recipe(&pool, author, &[(a, 20)], &[]).await;

    let last = PageQuery::new(Some(1), Some(6));
    let listing = actions::fetch_recipes(&RecipeFilter::default(), last, None, &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 2);
    assert_eq!(listing.next, None);

    let beyond = PageQuery::new(Some(5), Some(6));
    let error = actions::fetch_recipes(&RecipeFilter::default(), beyond, None, &pool)
        .await
        .err();
    assert_eq!(error.map(|e| e.code as u16), Some(404));

    let error = actions::list_users(author, beyond, &pool).await.err();
    assert_eq!(error.map(|e| e.code as u16), Some(404));

    let error = actions::list_subscriptions(author, beyond, None, &pool).await.err();
    assert_eq!(error.map(|e| e.code as u16), Some(404));

    // An empty first page is still a listing
    let listing = actions::list_subscriptions(author, PageQuery::default(), None, &pool)
        .await
        .unwrap_or_else(|_| panic!("listing failed"));
    assert_eq!(listing.count, 0);
}
