use std::{error::Error, fs, path::Path};

use foodgram::{
    actions,
    config::Config,
    schema::{IngredientAmount, RecipeForm, UserForm},
    CacheLifetime,
};
use serde::{de::DeserializeOwned, Deserialize};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
struct IngredientFixture {
    name: String,
    measurement_unit: String,
}

#[derive(Deserialize)]
struct TagFixture {
    name: String,
    color: String,
    slug: String,
}

#[derive(Deserialize)]
struct NamedFixture {
    name: String,
}

#[derive(Deserialize)]
struct AuthorFixture {
    username: String,
}

#[derive(Deserialize)]
struct RecipeIngredientFixture {
    name: String,
    amount: i32,
}

#[derive(Deserialize)]
struct RecipeFixture {
    author: AuthorFixture,
    tags: Vec<NamedFixture>,
    ingredients: Vec<RecipeIngredientFixture>,
    name: String,
    image: String,
    text: String,
    cooking_time: i32,
}

fn read_fixture<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, Box<dyn Error>> {
    let path = dir.join(file);
    if !path.exists() {
        log::warn!("{} not found, skipping", path.display());
        return Ok(vec![]);
    }

    let raw = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn load_ingredients(dir: &Path, pool: &Pool<Postgres>) -> Result<usize, Box<dyn Error>> {
    let mut created = 0;
    for item in read_fixture::<IngredientFixture>(dir, "ingredients.json")? {
        match actions::create_ingredient(&item.name, &item.measurement_unit, pool).await {
            Ok(Some(_)) => created += 1,
            Ok(None) => log::debug!("Ingredient {} already exists", item.name),
            Err(e) => log::warn!("Skipped ingredient {}: {}", item.name, e.info.unwrap_or_default()),
        }
    }
    Ok(created)
}

async fn load_tags(dir: &Path, pool: &Pool<Postgres>) -> Result<usize, Box<dyn Error>> {
    let mut created = 0;
    for item in read_fixture::<TagFixture>(dir, "tags.json")? {
        match actions::create_tag(&item.name, &item.color, &item.slug, pool).await {
            Ok(Some(_)) => created += 1,
            Ok(None) => log::debug!("Tag {} already exists", item.slug),
            Err(e) => log::warn!("Skipped tag {}: {}", item.slug, e.info.unwrap_or_default()),
        }
    }
    Ok(created)
}

async fn load_users(dir: &Path, pool: &Pool<Postgres>) -> Result<usize, Box<dyn Error>> {
    let mut created = 0;
    for form in read_fixture::<UserForm>(dir, "users.json")? {
        match actions::register_user(&form, pool).await {
            Ok(_) => created += 1,
            Err(e) => log::warn!("Skipped user {}: {}", form.username, e.info.unwrap_or_default()),
        }
    }
    Ok(created)
}

/// Resolves the fixture's names to ids. `None` when any of them is unknown.
async fn resolve_recipe(
    item: &RecipeFixture,
    pool: &Pool<Postgres>,
) -> Result<Option<(i32, RecipeForm)>, potion::Error> {
    let Some(author) = actions::find_user(pool, &item.author.username).await? else {
        log::warn!("Unknown author {} of recipe {}", item.author.username, item.name);
        return Ok(None);
    };

    let mut tags = Vec::with_capacity(item.tags.len());
    for tag in &item.tags {
        match actions::find_tag(&tag.name, pool).await? {
            Some(id) => tags.push(id),
            None => {
                log::warn!("Unknown tag {} of recipe {}", tag.name, item.name);
                return Ok(None);
            }
        }
    }

    let mut ingredients = Vec::with_capacity(item.ingredients.len());
    for line in &item.ingredients {
        match actions::find_ingredient(&line.name, pool).await? {
            Some(id) => ingredients.push(IngredientAmount {
                id,
                amount: line.amount,
            }),
            None => {
                log::warn!("Unknown ingredient {} of recipe {}", line.name, item.name);
                return Ok(None);
            }
        }
    }

    Ok(Some((
        author,
        RecipeForm {
            ingredients,
            tags,
            image: Some(item.image.to_owned()),
            name: item.name.to_owned(),
            text: item.text.to_owned(),
            cooking_time: item.cooking_time,
        },
    )))
}

async fn load_recipes(dir: &Path, pool: &Pool<Postgres>) -> Result<usize, Box<dyn Error>> {
    let mut created = 0;
    for item in read_fixture::<RecipeFixture>(dir, "recipes.json")? {
        let resolved = match resolve_recipe(&item, pool).await {
            Ok(resolved) => resolved,
            Err(e) => {
                log::warn!("Skipped recipe {}: {}", item.name, e.info.unwrap_or_default());
                continue;
            }
        };
        let Some((author, form)) = resolved else {
            continue;
        };

        match actions::create_recipe(author, &form, pool).await {
            Ok(_) => created += 1,
            Err(e) => log::warn!("Skipped recipe {}: {}", item.name, e.info.unwrap_or_default()),
        }
    }
    Ok(created)
}

async fn invalidate_caches(url: &str) {
    let connection = match redis::Client::open(url) {
        Ok(client) => client.get_multiplexed_tokio_connection().await,
        Err(e) => Err(e),
    };

    match connection {
        Ok(mut cache) => {
            for lifetime in [CacheLifetime::BindTagCache, CacheLifetime::BindIngredientCache] {
                if let Err(e) = lifetime.invalidate(&mut cache).await {
                    log::warn!("Failed to invalidate cache: {}", e.info.unwrap_or_default());
                }
            }
        }
        Err(e) => log::warn!("Redis unavailable, cached reference data may be stale: {e}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_owned());
    let dir = Path::new(&dir);
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    log::info!("Loading fixtures from {}", dir.display());
    log::info!("Ingredients created: {}", load_ingredients(dir, &pool).await?);
    log::info!("Tags created: {}", load_tags(dir, &pool).await?);
    log::info!("Users created: {}", load_users(dir, &pool).await?);
    log::info!("Recipes created: {}", load_recipes(dir, &pool).await?);

    invalidate_caches(&config.redis_url).await;
    log::info!("Data loaded");
    Ok(())
}
