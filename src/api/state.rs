use std::convert::Infallible;

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::jwt::SessionKeys;

/// Shared handles every handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    /// `None` when Redis was unreachable at startup; reads then go straight to the database.
    pub cache: Option<MultiplexedConnection>,
    pub keys: SessionKeys,
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
