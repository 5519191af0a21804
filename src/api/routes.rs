use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{
    filters::BoxedFilter,
    path,
    reply::{Reply, Response},
    Filter, Rejection,
};

use crate::{
    middleware::{with_possible_session, with_session},
    schema::Uuid,
    MAX_BODY_SIZE,
};

use super::{
    query::{IngredientQuery, QueryPairs},
    recipes, reference,
    reply::handle_rejection,
    state::{with_state, AppState},
    users,
};

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn query_pairs() -> impl Filter<Extract = (QueryPairs,), Error = Rejection> + Clone {
    warp::query::<QueryPairs>()
}

fn user_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let session = with_session(state.keys.clone());

    let register = path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(users::register);

    let list = path!("users")
        .and(warp::get())
        .and(session.clone())
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(users::list);

    let me = path!("users" / "me")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(users::me);

    let set_password = path!("users" / "set_password")
        .and(warp::post())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(users::set_password);

    let subscriptions = path!("users" / "subscriptions")
        .and(warp::get())
        .and(session.clone())
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(users::subscriptions);

    let subscribe = path!("users" / Uuid / "subscribe")
        .and(warp::post())
        .and(session.clone())
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(users::subscribe);

    let unsubscribe = path!("users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(users::unsubscribe);

    let profile = path!("users" / Uuid)
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(users::profile);

    let login = path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(users::login);

    let logout = path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(session)
        .and_then(users::logout);

    register
        .or(list)
        .unify()
        .or(me)
        .unify()
        .or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(profile)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .boxed()
}

fn reference_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let tags = path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(reference::list_tags);

    let tag = path!("tags" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(reference::get_tag);

    let ingredients = path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_state(state.clone()))
        .and_then(reference::list_ingredients);

    let ingredient = path!("ingredients" / Uuid)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(reference::get_ingredient);

    tags.or(tag)
        .unify()
        .or(ingredients)
        .unify()
        .or(ingredient)
        .unify()
        .boxed()
}

fn recipe_routes(state: &AppState) -> BoxedFilter<(Response,)> {
    let session = with_session(state.keys.clone());
    let possible_session = with_possible_session(state.keys.clone());

    let list = path!("recipes")
        .and(warp::get())
        .and(possible_session.clone())
        .and(query_pairs())
        .and(with_state(state.clone()))
        .and_then(recipes::list);

    let download = path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes::download_shopping_cart);

    let detail = path!("recipes" / Uuid)
        .and(warp::get())
        .and(possible_session)
        .and(with_state(state.clone()))
        .and_then(recipes::detail);

    let create = path!("recipes")
        .and(warp::post())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(recipes::create);

    let update = path!("recipes" / Uuid)
        .and(warp::patch())
        .and(session.clone())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(recipes::update);

    let delete = path!("recipes" / Uuid)
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes::delete);

    let add_favorite = path!("recipes" / Uuid / "favorite")
        .and(warp::post())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes::add_favorite);

    let remove_favorite = path!("recipes" / Uuid / "favorite")
        .and(warp::delete())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes::remove_favorite);

    let add_to_cart = path!("recipes" / Uuid / "shopping_cart")
        .and(warp::post())
        .and(session.clone())
        .and(with_state(state.clone()))
        .and_then(recipes::add_to_cart);

    let remove_from_cart = path!("recipes" / Uuid / "shopping_cart")
        .and(warp::delete())
        .and(session)
        .and(with_state(state.clone()))
        .and_then(recipes::remove_from_cart);

    list.or(download)
        .unify()
        .or(detail)
        .unify()
        .or(create)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(add_favorite)
        .unify()
        .or(remove_favorite)
        .unify()
        .or(add_to_cart)
        .unify()
        .or(remove_from_cart)
        .unify()
        .boxed()
}

/// The complete `/api` surface. Every rejection is answered with a JSON error body.
pub fn routes(state: AppState) -> impl Filter<Extract = (Response,), Error = Infallible> + Clone {
    path("api")
        .and(
            user_routes(&state)
                .or(reference_routes(&state))
                .unify()
                .or(recipe_routes(&state))
                .unify(),
        )
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
        .map(Reply::into_response)
}
