use std::error::Error;

use foodgram::{config::Config, jwt::SessionKeys, routes, AppState};
use redis::aio::MultiplexedConnection;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

async fn connect_cache(url: &str) -> Option<MultiplexedConnection> {
    let client = redis::Client::open(url)
        .map_err(|e| log::warn!("Invalid REDIS_URL, caching disabled: {e}"))
        .ok()?;

    client
        .get_multiplexed_tokio_connection()
        .await
        .map_err(|e| log::warn!("Redis unavailable, caching disabled: {e}"))
        .ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    log::info!("Loading configuration...");
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    log::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let state = AppState {
        pool,
        cache: connect_cache(&config.redis_url).await,
        keys: SessionKeys::new(config.secret_key.as_bytes(), config.token_ttl),
    };

    let (address, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(
        config.bind_addr,
        async {
            tokio::signal::ctrl_c().await.ok();
        },
    )?;
    log::info!("Server running on {address}");
    server.await;

    log::info!("Server shutting down...");
    Ok(())
}
