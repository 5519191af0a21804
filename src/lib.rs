mod database {
    pub mod actions;
    pub mod error;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
    pub mod validation;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

pub mod api {
    pub mod query;
    pub mod recipes;
    pub mod reference;
    pub mod reply;
    pub mod routes;
    pub mod state;
    pub mod users;
}
pub mod config;

pub use api::{routes::routes, state::AppState};
pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
